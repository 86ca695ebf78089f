//! Backend configuration, validated eagerly at construction.

use crate::{BackendError, Result};

/// Configuration for [`SqlBackend::open`](crate::SqlBackend::open).
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Name of the schedule table. Must be a plain identifier because it
    /// is interpolated into SQL text.
    pub table: String,
}

impl BackendConfig {
    pub fn new(path: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            table: table.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(BackendError::Config(
                "path option is required for the sql backend".into(),
            ));
        }
        validate_table(&self.table)
    }
}

pub(crate) fn validate_table(table: &str) -> Result<()> {
    if table.is_empty() {
        return Err(BackendError::Config(
            "table option is required for the sql backend".into(),
        ));
    }
    let mut chars = table.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !head_ok || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(BackendError::Config(format!(
            "table name {table:?} is not a valid identifier"
        )));
    }
    Ok(())
}
