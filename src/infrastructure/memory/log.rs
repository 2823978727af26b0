//! Record of executed statements

use std::sync::Mutex;

/// Counts and keeps the statements that actually reached the data store
#[derive(Debug, Default)]
pub struct QueryLog {
    statements: Mutex<Vec<String>>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, statement: impl Into<String>) {
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(statement.into());
    }

    /// Number of statements executed since the last reset
    pub fn count(&self) -> usize {
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn reset(&self) {
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}
