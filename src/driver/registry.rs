//! Process-wide table of built-in adapters, filled once on first use.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::error::ConnectorError;
use crate::types::EngineKind;

use super::Driver;

lazy_static! {
    static ref DRIVERS: HashMap<EngineKind, Arc<dyn Driver>> = {
        #[allow(unused_mut)]
        let mut drivers: HashMap<EngineKind, Arc<dyn Driver>> = HashMap::new();
        #[cfg(feature = "sqlite")]
        drivers.insert(EngineKind::Sqlite, Arc::new(crate::sqlite::SqliteDriver));
        #[cfg(feature = "postgres")]
        drivers.insert(EngineKind::Postgres, Arc::new(crate::postgres::PostgresDriver));
        drivers
    };
}

/// Adapter registered for `engine`.
///
/// # Errors
/// Returns `InvalidSpec` when the crate was built without that engine's feature.
pub fn lookup(engine: EngineKind) -> Result<Arc<dyn Driver>, ConnectorError> {
    DRIVERS.get(&engine).cloned().ok_or_else(|| {
        ConnectorError::invalid_spec(format!("no adapter built in for engine {engine}"))
    })
}

#[must_use]
pub fn registered_engines() -> Vec<EngineKind> {
    let mut engines: Vec<EngineKind> = DRIVERS.keys().copied().collect();
    engines.sort_by_key(|e| e.as_str());
    engines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(all(feature = "sqlite", feature = "postgres"))]
    fn both_builtin_engines_are_registered() {
        assert_eq!(
            registered_engines(),
            vec![EngineKind::Postgres, EngineKind::Sqlite]
        );
        assert_eq!(lookup(EngineKind::Sqlite).unwrap().engine(), EngineKind::Sqlite);
    }
}
