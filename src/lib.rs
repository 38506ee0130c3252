//! Issue DDL and DML against `SQLite` or `PostgreSQL` through one interface.
//!
//! Statements are described as [`StatementSpec`] values, compiled per engine by the
//! [`query_builder`], and executed on pooled connections through a [`Connector`]. Backend
//! failures come back as a [`ConnectorError`] with an engine-independent [`ErrorKind`].

pub mod classify;
pub mod config;
pub mod connector;
pub mod dialect;
pub mod driver;
pub mod error;
mod executor;
pub mod pool;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod statement;
pub mod transaction;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{BackendConfig, BackendConfigBuilder, Credentials};
pub use connector::{CallOptions, Connector};
pub use error::{ConnectorError, ErrorKind, NativeError};
pub use results::{DbRow, ResultSet, RowStream, RowsOrCount};
pub use statement::StatementSpec;
pub use transaction::{Transaction, TxState};
pub use types::{ColumnType, EngineKind, RowValues};
