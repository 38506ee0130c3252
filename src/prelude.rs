//! Convenient imports for common functionality.

pub use crate::config::{BackendConfig, BackendConfigBuilder, Credentials};
pub use crate::connector::{CallOptions, Connector};
pub use crate::error::{ConnectorError, ErrorKind};
pub use crate::pool::{ConnectionPool, PoolStatus, PooledConnection};
pub use crate::results::{DbRow, ResultSet, RowStream, RowsOrCount};
pub use crate::statement::{
    Aggregate, AlterAction, AlterTable, ColumnDef, CompareOp, CompiledStatement, CreateTable,
    Delete, DropTable, Insert, Order, Predicate, Select, StatementSpec, TableRef, Update,
};
pub use crate::transaction::{Transaction, TxState};
pub use crate::types::{ColumnType, EngineKind, RowValues};
