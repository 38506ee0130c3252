use crate::types::RowValues;

/// Comparison operators usable in a filter.
///
/// The pattern operators (`BeginsWith` ... `NotContains`) compile to `LIKE` with the
/// wildcards added to the bound value and any `%`, `_` or `\` in it escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    BeginsWith,
    NotBeginsWith,
    EndsWith,
    NotEndsWith,
    Contains,
    NotContains,
}

impl CompareOp {
    #[must_use]
    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            CompareOp::BeginsWith
                | CompareOp::NotBeginsWith
                | CompareOp::EndsWith
                | CompareOp::NotEndsWith
                | CompareOp::Contains
                | CompareOp::NotContains
        )
    }

    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::BeginsWith | CompareOp::EndsWith | CompareOp::Contains => "LIKE",
            CompareOp::NotBeginsWith | CompareOp::NotEndsWith | CompareOp::NotContains => {
                "NOT LIKE"
            }
        }
    }

    /// Wrap an already escaped pattern with the wildcards this operator needs.
    pub(crate) fn wrap_pattern(self, escaped: &str) -> String {
        match self {
            CompareOp::BeginsWith | CompareOp::NotBeginsWith => format!("{escaped}%"),
            CompareOp::EndsWith | CompareOp::NotEndsWith => format!("%{escaped}"),
            CompareOp::Contains | CompareOp::NotContains => format!("%{escaped}%"),
            _ => escaped.to_owned(),
        }
    }
}

/// Boolean filter for UPDATE, DELETE and SELECT.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: RowValues,
    },
    InList {
        column: String,
        values: Vec<RowValues>,
        negated: bool,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    #[must_use]
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<RowValues>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Self::compare(column, CompareOp::NotEq, value)
    }

    #[must_use]
    pub fn gt(column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    #[must_use]
    pub fn ge(column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Self::compare(column, CompareOp::GtEq, value)
    }

    #[must_use]
    pub fn lt(column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    #[must_use]
    pub fn le(column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Self::compare(column, CompareOp::LtEq, value)
    }

    #[must_use]
    pub fn begins_with(column: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::BeginsWith, prefix.into())
    }

    #[must_use]
    pub fn ends_with(column: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::EndsWith, suffix.into())
    }

    #[must_use]
    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::Contains, needle.into())
    }

    #[must_use]
    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        Predicate::InList {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    #[must_use]
    pub fn not_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        Predicate::InList {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    #[must_use]
    pub fn is_null(column: impl Into<String>) -> Self {
        Predicate::IsNull {
            column: column.into(),
            negated: false,
        }
    }

    #[must_use]
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Predicate::IsNull {
            column: column.into(),
            negated: true,
        }
    }

    /// Conjunction; flattens nested `And`s.
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut items) => {
                items.push(other);
                Predicate::And(items)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    /// Disjunction; flattens nested `Or`s.
    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut items) => {
                items.push(other);
                Predicate::Or(items)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }
}
