//! In-memory table with lifecycle events

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::debug;

use crate::domain::model::{LifecycleEvent, Model, ModelDescriptor, ModelEvents};
use crate::domain::DomainError;

use super::log::QueryLog;
use super::query::MemoryQuery;

#[derive(Debug, Clone)]
pub(super) struct StoredRow<M> {
    pub(super) record: M,
    pub(super) deleted: bool,
}

/// Rows of one entity type held in process memory.
///
/// Every write fires the matching lifecycle event after the row is stored,
/// and every read executed through [`MemoryQuery`] is recorded in the query log.
#[derive(Debug)]
pub struct MemoryTable<M: Model> {
    model: Arc<ModelDescriptor>,
    rows: RwLock<Vec<StoredRow<M>>>,
    events: Arc<ModelEvents>,
    log: Arc<QueryLog>,
    soft_deletes: bool,
}

impl<M: Model> MemoryTable<M> {
    pub fn new(model: ModelDescriptor, events: Arc<ModelEvents>) -> Self {
        Self {
            model: Arc::new(model),
            rows: RwLock::new(Vec::new()),
            events,
            log: Arc::new(QueryLog::new()),
            soft_deletes: false,
        }
    }

    /// Marks rows as deleted instead of removing them, so they can be restored
    pub fn with_soft_deletes(mut self) -> Self {
        self.soft_deletes = true;
        self
    }

    /// Shares a query log with other tables
    pub fn with_log(mut self, log: Arc<QueryLog>) -> Self {
        self.log = log;
        self
    }

    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    pub fn log(&self) -> &QueryLog {
        &self.log
    }

    pub fn soft_deletes(&self) -> bool {
        self.soft_deletes
    }

    /// Starts a query against this table
    pub fn query(self: &Arc<Self>) -> MemoryQuery<M> {
        MemoryQuery::new(Arc::clone(self))
    }

    pub(super) fn read_rows(&self) -> RwLockReadGuard<'_, Vec<StoredRow<M>>> {
        self.rows.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_rows(&self) -> RwLockWriteGuard<'_, Vec<StoredRow<M>>> {
        self.rows.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn insert(&self, record: M) -> Result<M, DomainError> {
        let key = record.key();

        {
            let mut rows = self.write_rows();
            if rows.iter().any(|row| row.record.key() == key) {
                return Err(DomainError::validation(format!(
                    "Duplicate key {} in table '{}'",
                    key, self.model.table
                )));
            }
            rows.push(StoredRow {
                record: record.clone(),
                deleted: false,
            });
        }

        self.fire(LifecycleEvent::Created, &key).await;
        Ok(record)
    }

    /// Replaces the live row with the same key
    pub async fn update(&self, record: M) -> Result<M, DomainError> {
        let key = record.key();

        {
            let mut rows = self.write_rows();
            let row = rows
                .iter_mut()
                .find(|row| !row.deleted && row.record.key() == key)
                .ok_or_else(|| self.missing(&key))?;
            row.record = record.clone();
        }

        self.fire(LifecycleEvent::Updated, &key).await;
        Ok(record)
    }

    /// Deletes a live row; returns false when there is none
    pub async fn delete(&self, key: &Value) -> Result<bool, DomainError> {
        let removed = {
            let mut rows = self.write_rows();
            match rows
                .iter()
                .position(|row| !row.deleted && &row.record.key() == key)
            {
                Some(index) if self.soft_deletes => {
                    rows[index].deleted = true;
                    true
                }
                Some(index) => {
                    rows.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            self.fire(LifecycleEvent::Deleted, key).await;
        }

        Ok(removed)
    }

    /// Brings back a soft-deleted row; returns false when there is none
    pub async fn restore(&self, key: &Value) -> Result<bool, DomainError> {
        if !self.soft_deletes {
            return Err(DomainError::validation(format!(
                "Table '{}' does not use soft deletes",
                self.model.table
            )));
        }

        let restored = {
            let mut rows = self.write_rows();
            match rows
                .iter_mut()
                .find(|row| row.deleted && &row.record.key() == key)
            {
                Some(row) => {
                    row.deleted = false;
                    true
                }
                None => false,
            }
        };

        if restored {
            self.fire(LifecycleEvent::Restored, key).await;
        }

        Ok(restored)
    }

    fn missing(&self, key: &Value) -> DomainError {
        DomainError::not_found(format!(
            "No row with key {} in table '{}'",
            key, self.model.table
        ))
    }

    async fn fire(&self, event: LifecycleEvent, key: &Value) {
        debug!(table = %self.model.table, key = %key, event = %event, "Row written");
        self.events.dispatch(event, &self.model, key).await;
    }
}
