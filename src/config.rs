use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;
use crate::types::EngineKind;

const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_VALIDATE_AFTER: Duration = Duration::from_secs(30);

/// Credentials reference handed to the adapter at connect time.
///
/// The password is either inline or read from an environment variable when a connection is
/// opened, so configs can be checked in without secrets.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn user(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_password_env(mut self, var: impl Into<String>) -> Self {
        self.password_env = Some(var.into());
        self
    }

    /// Inline password first, then the referenced environment variable.
    #[must_use]
    pub fn resolve_password(&self) -> Option<String> {
        self.password.clone().or_else(|| {
            self.password_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_env", &self.password_env)
            .finish()
    }
}

/// Immutable description of one backend and the pool in front of it.
///
/// Durations are written as integer milliseconds in the JSON form:
/// ```rust
/// use sql_connector::prelude::*;
///
/// let cfg = BackendConfig::from_json(
///     r#"{"engine": "sqlite", "database": "app.db", "max_size": 4, "acquire_timeout_ms": 250}"#,
/// )?;
/// assert_eq!(cfg.max_size, 4);
/// # Ok::<(), ConnectorError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub engine: EngineKind,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub credentials: Credentials,
    /// Database name, or the file path for `SQLite`.
    pub database: String,
    #[serde(default)]
    pub min_size: usize,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(
        rename = "acquire_timeout_ms",
        with = "duration_ms",
        default = "default_acquire_timeout"
    )]
    pub acquire_timeout: Duration,
    #[serde(
        rename = "max_lifetime_ms",
        with = "duration_ms",
        default = "default_max_lifetime"
    )]
    pub max_lifetime: Duration,
    #[serde(
        rename = "idle_timeout_ms",
        with = "duration_ms",
        default = "default_idle_timeout"
    )]
    pub idle_timeout: Duration,
    #[serde(
        rename = "connect_timeout_ms",
        with = "duration_ms",
        default = "default_connect_timeout"
    )]
    pub connect_timeout: Duration,
    /// Per-statement deadline; `None` waits for the engine indefinitely.
    #[serde(rename = "statement_timeout_ms", with = "opt_duration_ms", default)]
    pub statement_timeout: Option<Duration>,
    /// Idle connections older than this are pinged before reuse; `None` never pings.
    #[serde(
        rename = "validate_after_ms",
        with = "opt_duration_ms",
        default = "default_validate_after"
    )]
    pub validate_after: Option<Duration>,
}

fn default_max_size() -> usize {
    10
}

fn default_acquire_timeout() -> Duration {
    DEFAULT_ACQUIRE_TIMEOUT
}

fn default_max_lifetime() -> Duration {
    DEFAULT_MAX_LIFETIME
}

fn default_idle_timeout() -> Duration {
    DEFAULT_IDLE_TIMEOUT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

#[allow(clippy::unnecessary_wraps)]
fn default_validate_after() -> Option<Duration> {
    Some(DEFAULT_VALIDATE_AFTER)
}

impl BackendConfig {
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> BackendConfigBuilder {
        BackendConfigBuilder::new(EngineKind::Sqlite, path)
    }

    #[must_use]
    pub fn postgres(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> BackendConfigBuilder {
        let mut builder = BackendConfigBuilder::new(EngineKind::Postgres, database);
        builder.cfg.host = host.into();
        builder.cfg.port = port;
        builder
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    /// Returns `InvalidSpec` if the JSON is malformed or the pool bounds are inconsistent.
    pub fn from_json(json: &str) -> Result<Self, ConnectorError> {
        let cfg: BackendConfig = serde_json::from_str(json)
            .map_err(|e| ConnectorError::invalid_spec(format!("invalid backend config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the pool bounds.
    ///
    /// # Errors
    /// Returns `InvalidSpec` when `max_size` is zero or smaller than `min_size`.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.max_size == 0 {
            return Err(ConnectorError::invalid_spec("pool max_size must be at least 1"));
        }
        if self.min_size > self.max_size {
            return Err(ConnectorError::invalid_spec(format!(
                "pool min_size {} exceeds max_size {}",
                self.min_size, self.max_size
            )));
        }
        if self.database.is_empty() {
            return Err(ConnectorError::invalid_spec("database must not be empty"));
        }
        Ok(())
    }
}

/// Fluent builder for [`BackendConfig`].
#[derive(Debug, Clone)]
pub struct BackendConfigBuilder {
    cfg: BackendConfig,
}

impl BackendConfigBuilder {
    #[must_use]
    pub fn new(engine: EngineKind, database: impl Into<String>) -> Self {
        Self {
            cfg: BackendConfig {
                engine,
                host: String::new(),
                port: 0,
                credentials: Credentials::default(),
                database: database.into(),
                min_size: 0,
                max_size: default_max_size(),
                acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
                max_lifetime: DEFAULT_MAX_LIFETIME,
                idle_timeout: DEFAULT_IDLE_TIMEOUT,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
                statement_timeout: None,
                validate_after: default_validate_after(),
            },
        }
    }

    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.cfg.credentials = credentials;
        self
    }

    #[must_use]
    pub fn pool_size(mut self, min_size: usize, max_size: usize) -> Self {
        self.cfg.min_size = min_size;
        self.cfg.max_size = max_size;
        self
    }

    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.acquire_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.cfg.max_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.statement_timeout = Some(timeout);
        self
    }

    /// Ping idle connections that sat unused for at least `after` before leasing them;
    /// `None` disables the check.
    #[must_use]
    pub fn validate_after(mut self, after: Option<Duration>) -> Self {
        self.cfg.validate_after = after;
        self
    }

    /// Validate and return the config.
    ///
    /// # Errors
    /// Returns `InvalidSpec` if [`BackendConfig::validate`] fails.
    pub fn finish(self) -> Result<BackendConfig, ConnectorError> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod opt_duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => super::duration_ms::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn json_defaults_fill_missing_fields() {
        let cfg = BackendConfig::from_json(r#"{"engine": "postgres", "database": "app"}"#)
            .expect("valid config");
        assert_eq!(cfg.engine, EngineKind::Postgres);
        assert_eq!(cfg.max_size, 10);
        assert_eq!(cfg.acquire_timeout, DEFAULT_ACQUIRE_TIMEOUT);
        assert!(cfg.statement_timeout.is_none());
        assert_eq!(cfg.validate_after, Some(DEFAULT_VALIDATE_AFTER));
    }

    #[test]
    fn json_durations_are_milliseconds() {
        let cfg = BackendConfig::from_json(
            r#"{"engine": "sqlite", "database": "x.db", "acquire_timeout_ms": 50,
                "statement_timeout_ms": 1500, "validate_after_ms": null}"#,
        )
        .expect("valid config");
        assert_eq!(cfg.acquire_timeout, Duration::from_millis(50));
        assert_eq!(cfg.statement_timeout, Some(Duration::from_millis(1500)));
        assert!(cfg.validate_after.is_none());
    }

    #[test]
    fn inconsistent_pool_bounds_rejected() {
        let err = BackendConfig::sqlite("x.db")
            .pool_size(3, 2)
            .finish()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSpec);

        let err = BackendConfig::sqlite("x.db").pool_size(0, 0).finish().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSpec);
    }

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::user("app").with_password("hunter2");
        let shown = format!("{creds:?}");
        assert!(shown.contains("<redacted>"));
        assert!(!shown.contains("hunter2"));
    }
}
