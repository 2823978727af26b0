//! Query builder surface consumed by the cache layer

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

use super::descriptor::ModelDescriptor;
use super::eager::EagerLoads;
use super::entity::Model;

/// Length-aware page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<M> {
    pub items: Vec<M>,
    pub total: u64,
    pub per_page: u32,
    pub current_page: u32,
}

impl<M> Page<M> {
    pub fn new(items: Vec<M>, total: u64, per_page: u32, current_page: u32) -> Self {
        Self {
            items,
            total,
            per_page,
            current_page,
        }
    }

    /// Number of the last page (at least 1, saturating at `u32::MAX`)
    pub fn last_page(&self) -> u32 {
        if self.per_page == 0 {
            return 1;
        }

        let pages = self.total.div_ceil(u64::from(self.per_page));
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }
}

/// Page of results that only knows whether a next page exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplePage<M> {
    pub items: Vec<M>,
    pub per_page: u32,
    pub current_page: u32,
    pub has_more: bool,
}

/// A pending query against one entity type.
///
/// Implemented by the data-access layer. The cache layer only needs the
/// generated query text, its bindings and eager loads before execution, plus
/// the ability to run each read shape.
#[async_trait]
pub trait QueryBuilder<M: Model>: Send + Sync {
    /// Descriptor of the queried entity type
    fn model(&self) -> &ModelDescriptor;

    /// Generated query text, without bound values
    fn to_sql(&self) -> String;

    /// Bound parameter values in placeholder order
    fn bindings(&self) -> Vec<Value>;

    /// Relations to load alongside the results
    fn eager_loads(&self) -> &EagerLoads;

    async fn get(&self, columns: &[String]) -> Result<Vec<M>, DomainError>;

    async fn first(&self, columns: &[String]) -> Result<Option<M>, DomainError>;

    async fn find(&self, id: &Value, columns: &[String]) -> Result<Option<M>, DomainError>;

    async fn find_many(&self, ids: &[Value], columns: &[String]) -> Result<Vec<M>, DomainError>;

    async fn paginate(
        &self,
        per_page: u32,
        page: u32,
        columns: &[String],
    ) -> Result<Page<M>, DomainError>;

    async fn simple_paginate(
        &self,
        per_page: u32,
        page: u32,
        columns: &[String],
    ) -> Result<SimplePage<M>, DomainError>;

    async fn count(&self) -> Result<u64, DomainError>;

    async fn exists(&self) -> Result<bool, DomainError>;
}
