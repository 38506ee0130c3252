mod common;

use std::time::{Duration, Instant};

use sql_connector::error::ErrorKind;
use sql_connector::prelude::*;

use common::{MockState, eventually, mock_driver};

fn config_with_deadline(deadline: Duration) -> BackendConfig {
    BackendConfig::sqlite("mock")
        .pool_size(0, 1)
        .acquire_timeout(Duration::from_millis(500))
        .statement_timeout(deadline)
        .finish()
        .unwrap()
}

#[tokio::test]
async fn slow_statement_times_out_and_connection_is_dropped() -> Result<(), ConnectorError> {
    let (driver, state) = mock_driver();
    let connector = Connector::with_driver(config_with_deadline(Duration::from_millis(40)), driver).await?;
    state.set_delay(Some(Duration::from_secs(5)));

    let started = Instant::now();
    let err = connector
        .execute_dml(&Select::new("t").into())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(1));

    assert!(eventually(|| MockState::count(&state.closed) == 1).await);
    state.set_delay(None);
    connector.execute_dml(&Select::new("t").into()).await?;
    assert_eq!(MockState::count(&state.opened), 2);
    Ok(())
}

#[tokio::test]
async fn per_call_deadline_overrides_config() -> Result<(), ConnectorError> {
    let (driver, state) = mock_driver();
    let connector = Connector::with_driver(config_with_deadline(Duration::from_millis(20)), driver).await?;
    state.set_delay(Some(Duration::from_millis(60)));

    let outcome = connector
        .execute_dml_with(
            &Insert::new("t").value("a", 1).into(),
            CallOptions::default().deadline(Duration::from_secs(2)),
        )
        .await?;
    assert_eq!(outcome.count(), Some(1));

    let err = connector
        .execute_ddl(
            &CreateTable::new("t")
                .column(ColumnDef::new("a", ColumnType::Integer))
                .into(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    Ok(())
}

#[tokio::test]
async fn stream_deadline_covers_statement_start() -> Result<(), ConnectorError> {
    let (driver, state) = mock_driver();
    let connector = Connector::with_driver(config_with_deadline(Duration::from_millis(30)), driver).await?;

    state.set_delay(Some(Duration::from_millis(200)));
    let err = connector
        .stream_select(&Select::new("t").into())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    state.set_delay(None);
    let rows = connector
        .stream_select(&Select::new("t").into())
        .await?
        .collect()
        .await?;
    assert_eq!(rows.len(), 3);
    assert_eq!(connector.status().leased, 0);
    Ok(())
}

#[tokio::test]
async fn no_deadline_waits_for_the_engine() -> Result<(), ConnectorError> {
    let (driver, state) = mock_driver();
    let config = BackendConfig::sqlite("mock").pool_size(0, 1).finish()?;
    let connector = Connector::with_driver(config, driver).await?;
    state.set_delay(Some(Duration::from_millis(80)));

    let outcome = connector
        .execute_dml(&Update::new("t").set("a", 1).into())
        .await?;
    assert_eq!(outcome.count(), Some(1));
    assert_eq!(MockState::count(&state.closed), 0);
    Ok(())
}

#[tokio::test]
async fn transaction_deadline_does_not_wait_for_rollback() -> Result<(), ConnectorError> {
    let (driver, state) = mock_driver();
    let connector = Connector::with_driver(config_with_deadline(Duration::from_secs(10)), driver).await?;
    state.set_delay(Some(Duration::from_secs(5)));
    // A rollback sent after a stuck statement would queue behind it.
    state.set_end_delay(Some(Duration::from_secs(5)));

    let started = Instant::now();
    let err = connector
        .run_transaction_with(
            &[Insert::new("t").value("a", 1).into()],
            CallOptions::default().deadline(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(connector.status().leased, 0);
    assert_eq!(MockState::count(&state.rollbacks), 0);
    assert!(eventually(|| MockState::count(&state.closed) == 1).await);
    Ok(())
}

#[cfg(feature = "sqlite")]
mod sqlite_backend {
    use super::*;
    use crate::common::temp_db;

    fn insert(id: i64) -> StatementSpec {
        Insert::new("ledger").value("id", id).into()
    }

    #[tokio::test]
    async fn deadline_holds_while_another_writer_has_the_lock() -> Result<(), ConnectorError> {
        let (_dir, path) = temp_db();
        let blocker = Connector::new(BackendConfig::sqlite(path.as_str()).pool_size(0, 1).finish()?).await?;
        let connector = Connector::new(BackendConfig::sqlite(path.as_str()).pool_size(0, 1).finish()?).await?;
        blocker
            .execute_ddl(
                &CreateTable::new("ledger")
                    .column(ColumnDef::new("id", ColumnType::Integer).primary_key())
                    .into(),
            )
            .await?;

        let mut holding = blocker.transaction().await?;
        holding.execute(&insert(1)).await?;

        let started = Instant::now();
        let err = connector
            .run_transaction_with(&[insert(2)], CallOptions::default().deadline(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(connector.status().leased, 0);

        holding.rollback().await?;
        connector.run_transaction(&[insert(3)]).await?;
        let rows = connector
            .execute_dml(&Select::new("ledger").into())
            .await?
            .into_rows()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.rows()[0].get("id"), Some(&RowValues::Int(3)));
        Ok(())
    }
}
