use std::fmt;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Normalized failure categories shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No connection became available before the acquire timeout.
    PoolExhausted,
    /// The statement description cannot be compiled.
    InvalidSpec,
    /// Transaction or pool used in the wrong state.
    InvalidState,
    /// The backend is unreachable or the connection was lost.
    Connectivity,
    /// A deadline expired or the engine gave up waiting on a lock.
    Timeout,
    /// Primary key, unique, foreign key, not-null or check failure.
    ConstraintViolation,
    /// The engine rejected the statement text or a referenced object.
    Syntax,
    /// Anything the backend mapping table does not cover.
    Unknown,
}

impl ErrorKind {
    /// Only connectivity and timeout failures are worth retrying.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Connectivity | Self::Timeout)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::PoolExhausted => "pool exhausted",
            ErrorKind::InvalidSpec => "invalid spec",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::Connectivity => "connectivity error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConstraintViolation => "constraint violation",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::Unknown => "unknown error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every public operation of the connector.
///
/// Backend failures reach this type only through [`crate::classify::classify`]; the
/// remaining kinds come from local validation in the pool, builder and transaction code.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ConnectorError {
    kind: ErrorKind,
    native_code: Option<String>,
    message: String,
    retryable: bool,
    #[source]
    source: Option<BoxError>,
}

impl ConnectorError {
    pub(crate) fn new(
        kind: ErrorKind,
        native_code: Option<String>,
        message: impl Into<String>,
        source: Option<BoxError>,
    ) -> Self {
        Self {
            kind,
            native_code,
            message: message.into(),
            retryable: kind.is_retryable(),
            source,
        }
    }

    pub(crate) fn pool_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PoolExhausted, None, message, None)
    }

    pub(crate) fn invalid_spec(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSpec, None, message, None)
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, None, message, None)
    }

    /// A statement deadline measured by the connector itself, not by the engine.
    pub(crate) fn deadline_elapsed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, None, message, None)
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Backend code the failure was classified from (SQLSTATE, `SQLite` result code).
    #[must_use]
    pub fn native_code(&self) -> Option<&str> {
        self.native_code.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Untranslated failure reported by an adapter.
///
/// `code` carries the engine's own error code and `category` a coarse engine-specific label
/// (for example a driver error variant). Neither is interpreted by the adapter.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct NativeError {
    pub code: Option<String>,
    pub category: Option<String>,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            category: None,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}
