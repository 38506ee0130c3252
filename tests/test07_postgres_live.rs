#![cfg(feature = "postgres")]

use std::time::Duration;

use futures_util::StreamExt;
use sql_connector::error::ErrorKind;
use sql_connector::prelude::*;

/// Reads `SQL_CONNECTOR_PG_{HOST,PORT,DB,USER}`; the password comes from
/// `SQL_CONNECTOR_PG_PASSWORD` at connect time. `None` when no host is configured.
fn live_config() -> Option<BackendConfig> {
    let host = std::env::var("SQL_CONNECTOR_PG_HOST").ok()?;
    let port = std::env::var("SQL_CONNECTOR_PG_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5432);
    let db = std::env::var("SQL_CONNECTOR_PG_DB").unwrap_or_else(|_| "testing".into());
    let user = std::env::var("SQL_CONNECTOR_PG_USER").unwrap_or_else(|_| "testuser".into());
    BackendConfig::postgres(host, port, db)
        .credentials(Credentials::user(user).with_password_env("SQL_CONNECTOR_PG_PASSWORD"))
        .pool_size(1, 4)
        .acquire_timeout(Duration::from_secs(5))
        .finish()
        .ok()
}

fn unique_table(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{prefix}_{}_{nanos}", std::process::id())
}

#[tokio::test]
async fn postgres_users_scenario() -> Result<(), ConnectorError> {
    let Some(config) = live_config() else {
        eprintln!("SQL_CONNECTOR_PG_HOST not set; skipping live postgres test");
        return Ok(());
    };
    let connector = Connector::new(config).await?;
    let table = unique_table("users");

    connector
        .execute_ddl(
            &CreateTable::new(table.as_str())
                .column(ColumnDef::new("id", ColumnType::BigInt).primary_key())
                .column(ColumnDef::new("name", ColumnType::Varchar(64)).not_null())
                .column(ColumnDef::new("active", ColumnType::Boolean).default_value(true))
                .column(ColumnDef::new("meta", ColumnType::Json))
                .into(),
        )
        .await?;

    let inserted = connector
        .execute_dml(
            &Insert::new(table.as_str())
                .columns(["id", "name", "meta"])
                .row(vec![1.into(), "alice".into(), serde_json::json!({"k": 1}).into()])
                .row(vec![2.into(), "bob".into(), RowValues::Null])
                .into(),
        )
        .await?;
    assert_eq!(inserted.count(), Some(2));

    let rows = connector
        .execute_dml(
            &Select::new(table.as_str())
                .filter(Predicate::begins_with("name", "al"))
                .into(),
        )
        .await?
        .into_rows()
        .unwrap();
    assert_eq!(rows.len(), 1);
    let alice = &rows.rows()[0];
    assert_eq!(alice.get("id"), Some(&RowValues::Int(1)));
    assert_eq!(alice.get("active"), Some(&RowValues::Bool(true)));
    assert_eq!(alice.get("meta"), Some(&RowValues::JSON(serde_json::json!({"k": 1}))));

    let err = connector
        .run_transaction(&[
            Insert::new(table.as_str()).value("id", 3).value("name", "carol").into(),
            Insert::new(table.as_str()).value("id", 1).value("name", "dup").into(),
        ])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert_eq!(err.native_code(), Some("23505"));

    let mut stream = connector
        .stream_select(&Select::new(table.as_str()).order_by("id", Order::Asc).into())
        .await?;
    let mut ids = Vec::new();
    while let Some(row) = stream.next().await {
        ids.extend(row?.get("id").cloned());
    }
    assert_eq!(ids, vec![RowValues::Int(1), RowValues::Int(2)]);

    let err = connector
        .execute_dml(&Select::new("missing_table_for_sure").into())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);

    connector
        .execute_ddl(&DropTable::new(table.as_str()).into())
        .await?;
    connector.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn postgres_numeric_columns_and_aggregates() -> Result<(), ConnectorError> {
    let Some(config) = live_config() else {
        eprintln!("SQL_CONNECTOR_PG_HOST not set; skipping live postgres test");
        return Ok(());
    };
    let connector = Connector::new(config).await?;
    let table = unique_table("prices");

    connector
        .execute_ddl(
            &CreateTable::new(table.as_str())
                .column(ColumnDef::new("id", ColumnType::BigInt).primary_key())
                .column(ColumnDef::new(
                    "amount",
                    ColumnType::Numeric {
                        precision: Some(10),
                        scale: Some(2),
                    },
                ))
                .into(),
        )
        .await?;
    connector
        .execute_dml(
            &Insert::new(table.as_str())
                .columns(["id", "amount"])
                .row(vec![1.into(), RowValues::Float(1.5)])
                .row(vec![2.into(), RowValues::Text("-12.25".into())])
                .row(vec![3.into(), RowValues::Int(7)])
                .into(),
        )
        .await?;

    let rows = connector
        .execute_dml(&Select::new(table.as_str()).order_by("id", Order::Asc).into())
        .await?
        .into_rows()
        .unwrap();
    let amounts: Vec<_> = rows.rows().iter().filter_map(|r| r.get("amount").cloned()).collect();
    assert_eq!(
        amounts,
        vec![RowValues::Float(1.5), RowValues::Float(-12.25), RowValues::Float(7.0)]
    );

    let filtered = connector
        .execute_dml(
            &Select::new(table.as_str())
                .filter(Predicate::gt("amount", 1.25))
                .into(),
        )
        .await?;
    assert_eq!(filtered.rows().map(ResultSet::len), Some(2));

    let totals = connector
        .execute_dml(
            &Select::new(table.as_str())
                .aggregate(Aggregate::Avg, Some("id"), Some("avg_id"))
                .aggregate(Aggregate::Sum, Some("id"), Some("sum_id"))
                .into(),
        )
        .await?
        .into_rows()
        .unwrap();
    let totals = &totals.rows()[0];
    assert_eq!(totals.get("avg_id"), Some(&RowValues::Float(2.0)));
    assert_eq!(totals.get("sum_id"), Some(&RowValues::Float(6.0)));

    connector
        .execute_ddl(&DropTable::new(table.as_str()).into())
        .await?;
    connector.shutdown().await;
    Ok(())
}
