//! `PostgreSQL` adapter built on `tokio-postgres`.

mod connection;
mod errors;
mod numeric;
mod params;
mod query;

use async_trait::async_trait;
use tokio_postgres::NoTls;
use tracing::{debug, warn};

use crate::classify::ErrorMapping;
use crate::config::BackendConfig;
use crate::dialect::{Dialect, PostgresDialect};
use crate::driver::{Driver, DriverConnection};
use crate::error::NativeError;
use crate::types::EngineKind;

use connection::PostgresConnection;
use errors::{ERROR_MAP, native};

static DIALECT: PostgresDialect = PostgresDialect;

/// Adapter for `EngineKind::Postgres`. Connections are plain TCP (`NoTls`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

#[async_trait]
impl Driver for PostgresDriver {
    fn engine(&self) -> EngineKind {
        EngineKind::Postgres
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &DIALECT
    }

    fn error_map(&self) -> &'static [ErrorMapping] {
        ERROR_MAP
    }

    async fn connect(&self, config: &BackendConfig) -> Result<Box<dyn DriverConnection>, NativeError> {
        let (client, connection) = pg_config(config)
            .connect(NoTls)
            .await
            .map_err(native)?;
        let task = tokio::spawn(async move {
            if let Err(error) = connection.await {
                warn!(%error, "postgres connection task ended with an error");
            }
        });
        debug!(host = %config.host, port = config.port, database = %config.database, "postgres connection opened");
        Ok(Box::new(PostgresConnection::new(client, task)))
    }
}

fn pg_config(config: &BackendConfig) -> tokio_postgres::Config {
    let mut pg = tokio_postgres::Config::new();
    pg.host(&config.host)
        .port(config.port)
        .dbname(&config.database)
        .connect_timeout(config.connect_timeout)
        .application_name("sql-connector");
    if let Some(user) = &config.credentials.user {
        pg.user(user);
    }
    if let Some(password) = config.credentials.resolve_password() {
        pg.password(password);
    }
    pg
}
