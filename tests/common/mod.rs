#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use sql_connector::classify::ErrorMapping;
use sql_connector::config::BackendConfig;
use sql_connector::dialect::{Dialect, SqliteDialect};
use sql_connector::driver::{Driver, DriverConnection, Execution, RawRows};
use sql_connector::error::{ErrorKind, NativeError};
use sql_connector::statement::{CompiledStatement, StatementOutput};
use sql_connector::types::{EngineKind, RowValues};

static DIALECT: SqliteDialect = SqliteDialect;

pub static MOCK_ERRORS: &[ErrorMapping] = &[
    ErrorMapping::code("dup", ErrorKind::ConstraintViolation),
    ErrorMapping::code("busy", ErrorKind::Timeout),
    ErrorMapping::category("gone", ErrorKind::Connectivity),
];

/// Counters and knobs shared by every connection a [`MockDriver`] opens.
#[derive(Default)]
pub struct MockState {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub begins: AtomicUsize,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub pings: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_commit: AtomicBool,
    pub fail_ping: AtomicBool,
    /// (connection number, SQL) in execution order.
    pub executed: Mutex<Vec<(usize, String)>>,
    failure: Mutex<Option<Failure>>,
    delay: Mutex<Option<Duration>>,
    connect_delay: Mutex<Option<Duration>>,
    end_delay: Mutex<Option<Duration>>,
}

#[derive(Clone)]
struct Failure {
    needle: String,
    code: Option<String>,
    category: Option<String>,
}

impl MockState {
    /// Fail every statement whose SQL contains `needle`.
    pub fn fail_statements(&self, needle: &str, code: Option<&str>, category: Option<&str>) {
        *self.failure.lock().unwrap() = Some(Failure {
            needle: needle.to_owned(),
            code: code.map(str::to_owned),
            category: category.map(str::to_owned),
        });
    }

    pub fn clear_failures(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Make every statement take `delay` before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Make every connect take `delay`.
    pub fn set_connect_delay(&self, delay: Option<Duration>) {
        *self.connect_delay.lock().unwrap() = delay;
    }

    /// Make COMMIT and ROLLBACK take `delay`.
    pub fn set_end_delay(&self, delay: Option<Duration>) {
        *self.end_delay.lock().unwrap() = delay;
    }

    async fn pause(slot: &Mutex<Option<Duration>>) {
        let delay = *slot.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, sql)| sql.clone())
            .collect()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct MockDriver {
    pub state: Arc<MockState>,
}

/// A fresh mock adapter plus a handle on its counters.
pub fn mock_driver() -> (Arc<dyn Driver>, Arc<MockState>) {
    let driver = MockDriver::default();
    let state = Arc::clone(&driver.state);
    (Arc::new(driver), state)
}

#[async_trait]
impl Driver for MockDriver {
    fn engine(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &DIALECT
    }

    fn error_map(&self) -> &'static [ErrorMapping] {
        MOCK_ERRORS
    }

    async fn connect(&self, _config: &BackendConfig) -> Result<Box<dyn DriverConnection>, NativeError> {
        MockState::pause(&self.state.connect_delay).await;
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(NativeError::new("refused").with_category("gone"));
        }
        let number = self.state.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockConnection {
            number,
            state: Arc::clone(&self.state),
        }))
    }
}

pub struct MockConnection {
    number: usize,
    state: Arc<MockState>,
}

#[async_trait]
impl DriverConnection for MockConnection {
    async fn execute(&mut self, stmt: &CompiledStatement) -> Result<Execution, NativeError> {
        self.state
            .executed
            .lock()
            .unwrap()
            .push((self.number, stmt.sql.clone()));

        MockState::pause(&self.state.delay).await;

        let failure = self.state.failure.lock().unwrap().clone();
        if let Some(failure) = failure.filter(|f| stmt.sql.contains(&f.needle)) {
            let mut err = NativeError::new(format!("injected failure for {}", failure.needle));
            if let Some(code) = failure.code {
                err = err.with_code(code);
            }
            if let Some(category) = failure.category {
                err = err.with_category(category);
            }
            return Err(err);
        }

        Ok(match stmt.output {
            StatementOutput::Ack => Execution::Ack,
            StatementOutput::Affected => Execution::Affected(1),
            StatementOutput::Rows => {
                let rows = (1..=3).map(|n| Ok::<_, NativeError>(vec![RowValues::Int(n)]));
                Execution::Rows(RawRows {
                    columns: Arc::new(vec!["n".to_owned()]),
                    rows: Box::pin(stream::iter(rows.collect::<Vec<_>>())),
                })
            }
        })
    }

    async fn begin(&mut self) -> Result<(), NativeError> {
        self.state.begins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), NativeError> {
        MockState::pause(&self.state.end_delay).await;
        if self.state.fail_commit.load(Ordering::SeqCst) {
            return Err(NativeError::new("commit refused").with_code("busy"));
        }
        self.state.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), NativeError> {
        MockState::pause(&self.state.end_delay).await;
        self.state.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), NativeError> {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_ping.load(Ordering::SeqCst) {
            return Err(NativeError::new("connection reset").with_category("gone"));
        }
        Ok(())
    }

    async fn disconnect(self: Box<Self>) -> Result<(), NativeError> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Config for the mock backend.
pub fn mock_config(max_size: usize) -> BackendConfig {
    BackendConfig::sqlite("mock")
        .pool_size(0, max_size)
        .acquire_timeout(Duration::from_millis(50))
        .finish()
        .unwrap()
}

/// Poll `check` until it holds or a second has passed.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Unique database path inside a temp directory that is removed on drop.
pub fn temp_db() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db").to_string_lossy().into_owned();
    (dir, path)
}
