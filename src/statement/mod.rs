//! Logical statement descriptions consumed by the statement builder.
//!
//! A [`StatementSpec`] names *what* to do; [`crate::query_builder::build`] turns it into dialect
//! specific text plus bound values.
//! ```rust
//! use sql_connector::prelude::*;
//!
//! let create: StatementSpec = CreateTable::new("users")
//!     .column(ColumnDef::new("id", ColumnType::Integer).primary_key())
//!     .column(ColumnDef::new("name", ColumnType::Text).not_null())
//!     .into();
//! let insert: StatementSpec = Insert::new("users")
//!     .value("id", 1)
//!     .value("name", "a")
//!     .into();
//! # let _ = (create, insert);
//! ```

mod compiled;
mod predicate;

pub use compiled::{CompiledStatement, StatementOutput};
pub use predicate::{CompareOp, Predicate};

use crate::types::{ColumnType, RowValues};

/// A possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn in_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

/// `"users"` names a table; `"app.users"` names a table inside schema `app`.
impl From<&str> for TableRef {
    fn from(value: &str) -> Self {
        match value.split_once('.') {
            Some((schema, name)) => Self::in_schema(schema, name),
            None => Self::new(value),
        }
    }
}

impl From<String> for TableRef {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

/// Column default rendered into DDL.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Literal(RowValues),
    CurrentTimestamp,
}

/// Column definition for CREATE TABLE and ALTER TABLE ... ADD COLUMN.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub primary_key: bool,
    pub unique: bool,
}

impl ColumnDef {
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            primary_key: false,
            unique: false,
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Primary key columns are implicitly NOT NULL.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<RowValues>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    #[must_use]
    pub fn default_current_timestamp(mut self) -> Self {
        self.default = Some(DefaultValue::CurrentTimestamp);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub table: TableRef,
    pub columns: Vec<ColumnDef>,
    pub if_not_exists: bool,
}

impl CreateTable {
    #[must_use]
    pub fn new(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            if_not_exists: false,
        }
    }

    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    pub table: TableRef,
    pub if_exists: bool,
}

impl DropTable {
    #[must_use]
    pub fn new(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            if_exists: false,
        }
    }

    #[must_use]
    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    DropColumn(String),
    RenameColumn { from: String, to: String },
    RenameTable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub table: TableRef,
    pub action: AlterAction,
}

impl AlterTable {
    #[must_use]
    pub fn new(table: impl Into<TableRef>, action: AlterAction) -> Self {
        Self {
            table: table.into(),
            action,
        }
    }
}

/// INSERT of one or more rows sharing the same column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: TableRef,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RowValues>>,
}

impl Insert {
    #[must_use]
    pub fn new(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Add a column/value pair to the first row.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.columns.push(column.into());
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        self.rows[0].push(value.into());
        self
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn row(mut self, values: Vec<RowValues>) -> Self {
        self.rows.push(values);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: TableRef,
    pub assignments: Vec<(String, RowValues)>,
    pub filter: Option<Predicate>,
}

impl Update {
    #[must_use]
    pub fn new(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            filter: None,
        }
    }

    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: TableRef,
    pub filter: Option<Predicate>,
}

impl Delete {
    #[must_use]
    pub fn new(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Avg,
    Count,
    Sum,
    Max,
    Min,
}

impl Aggregate {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Aggregate::Avg => "AVG",
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Max => "MAX",
            Aggregate::Min => "MIN",
        }
    }
}

/// One item of a SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Column(String),
    /// `column: None` means `*` and is only valid for COUNT.
    Aggregate {
        func: Aggregate,
        column: Option<String>,
        alias: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub order: Order,
}

/// Single-table SELECT. An empty projection selects every column.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: TableRef,
    pub projection: Vec<Projection>,
    pub distinct: bool,
    pub filter: Option<Predicate>,
    pub group_by: Vec<String>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    #[must_use]
    pub fn new(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            projection: Vec::new(),
            distinct: false,
            filter: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// `SELECT COUNT(*) AS count FROM table`
    #[must_use]
    pub fn count(table: impl Into<TableRef>) -> Self {
        Self::new(table).aggregate(Aggregate::Count, None, Some("count"))
    }

    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.projection.push(Projection::Column(column.into()));
        self
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection
            .extend(columns.into_iter().map(|c| Projection::Column(c.into())));
        self
    }

    #[must_use]
    pub fn aggregate(mut self, func: Aggregate, column: Option<&str>, alias: Option<&str>) -> Self {
        self.projection.push(Projection::Aggregate {
            func,
            column: column.map(str::to_owned),
            alias: alias.map(str::to_owned),
        });
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    #[must_use]
    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            order,
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Logical DDL or DML operation.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementSpec {
    CreateTable(CreateTable),
    DropTable(DropTable),
    AlterTable(AlterTable),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Select(Select),
}

impl StatementSpec {
    /// Schema-changing statements.
    #[must_use]
    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            StatementSpec::CreateTable(_) | StatementSpec::DropTable(_) | StatementSpec::AlterTable(_)
        )
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            StatementSpec::CreateTable(_) => "create table",
            StatementSpec::DropTable(_) => "drop table",
            StatementSpec::AlterTable(_) => "alter table",
            StatementSpec::Insert(_) => "insert",
            StatementSpec::Update(_) => "update",
            StatementSpec::Delete(_) => "delete",
            StatementSpec::Select(_) => "select",
        }
    }
}

macro_rules! impl_into_spec {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for StatementSpec {
                fn from(value: $variant) -> Self {
                    StatementSpec::$variant(value)
                }
            }
        )*
    };
}

impl_into_spec!(CreateTable, DropTable, AlterTable, Insert, Update, Delete, Select);
