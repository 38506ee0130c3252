use lazy_static::lazy_static;
use regex::Regex;

use crate::dialect::Dialect;
use crate::error::ConnectorError;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .unwrap_or_else(|e| unreachable!("identifier pattern is a literal: {e}"));
}

/// Check a table, column or alias name against the allowed character set and the dialect's
/// length limit.
///
/// # Errors
/// Returns `InvalidSpec` when the name is empty, too long or contains other characters.
pub fn validate_identifier(name: &str, dialect: &dyn Dialect) -> Result<(), ConnectorError> {
    if name.is_empty() {
        return Err(ConnectorError::invalid_spec("identifier must not be empty"));
    }
    if name.len() > dialect.max_identifier_len() {
        return Err(ConnectorError::invalid_spec(format!(
            "identifier '{name}' is longer than {} characters",
            dialect.max_identifier_len()
        )));
    }
    if !IDENTIFIER.is_match(name) {
        return Err(ConnectorError::invalid_spec(format!(
            "identifier '{name}' must match [A-Za-z_][A-Za-z0-9_]*"
        )));
    }
    Ok(())
}
