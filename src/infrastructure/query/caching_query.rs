//! Read-through wrapper around a query builder

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::cache::{CachePolicy, CallKind, QueryFingerprint};
use crate::domain::model::{Model, ModelDescriptor, Page, QueryBuilder, SimplePage};
use crate::domain::DomainError;
use crate::infrastructure::services::ModelCaching;

const ALL_COLUMNS: &str = "*";

/// A query builder whose reads are served from the cache when possible.
///
/// Each instance carries its own [`CachePolicy`]; policy changes are fluent
/// and never leak to other queries.
pub struct CachingQuery<M: Model, Q: QueryBuilder<M>> {
    caching: Arc<ModelCaching>,
    query: Q,
    policy: CachePolicy,
    columns: Vec<String>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model, Q: QueryBuilder<M>> CachingQuery<M, Q> {
    pub fn new(caching: Arc<ModelCaching>, query: Q) -> Self {
        Self {
            caching,
            query,
            policy: CachePolicy::default(),
            columns: vec![ALL_COLUMNS.to_string()],
            _model: PhantomData,
        }
    }

    pub fn model(&self) -> &ModelDescriptor {
        self.query.model()
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn inner(&self) -> &Q {
        &self.query
    }

    pub fn into_inner(self) -> Q {
        self.query
    }

    /// Applies further constraints to the wrapped builder
    pub fn query(mut self, f: impl FnOnce(Q) -> Q) -> Self {
        self.query = f(self.query);
        self
    }

    /// Projects the listed columns for row-returning reads
    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    /// Bypasses the cache for this query; `enable_cache` does not undo it
    pub fn disable_cache(mut self) -> Self {
        self.policy.disable();
        self
    }

    pub fn without_cache(self) -> Self {
        self.disable_cache()
    }

    pub fn enable_cache(mut self) -> Self {
        self.policy.enable();
        self
    }

    /// Overrides the TTL for this query; zero runs it without storing the result
    pub fn cache_for(mut self, seconds: u64) -> Self {
        self.policy.ttl_override = Some(seconds);
        self
    }

    /// Sets the cooldown period; `None` falls back to the model default
    pub fn with_cache_cooldown_seconds(mut self, seconds: Option<u64>) -> Self {
        self.policy.cooldown_seconds = seconds.or(self.query.model().cache_cooldown_seconds);
        self
    }

    pub fn should_cache(&self) -> bool {
        self.policy.should_cache(self.caching.is_enabled())
    }

    pub async fn get(&self) -> Result<Vec<M>, DomainError> {
        let columns = self.columns.clone();
        self.cached(CallKind::All, &columns, || self.query.get(&columns))
            .await
    }

    pub async fn first(&self) -> Result<Option<M>, DomainError> {
        let columns = self.columns.clone();
        self.cached(CallKind::First, &columns, || self.query.first(&columns))
            .await
    }

    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<M>, DomainError> {
        let id = id.into();
        let columns = self.columns.clone();
        self.cached(CallKind::Find(id.clone()), &columns, || {
            self.query.find(&id, &columns)
        })
        .await
    }

    pub async fn find_many<I, V>(&self, ids: I) -> Result<Vec<M>, DomainError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        let columns = self.columns.clone();
        self.cached(CallKind::FindMany(ids.clone()), &columns, || {
            self.query.find_many(&ids, &columns)
        })
        .await
    }

    /// Length-aware page; page size defaults to the model's, page to 1
    pub async fn paginate(
        &self,
        per_page: Option<u32>,
        page: Option<u32>,
    ) -> Result<Page<M>, DomainError> {
        let per_page = per_page.unwrap_or(self.query.model().per_page);
        let page = page.unwrap_or(1);
        let columns = self.columns.clone();

        self.cached(CallKind::Paginate { page, per_page }, &columns, || {
            self.query.paginate(per_page, page, &columns)
        })
        .await
    }

    pub async fn simple_paginate(
        &self,
        per_page: Option<u32>,
        page: Option<u32>,
    ) -> Result<SimplePage<M>, DomainError> {
        let per_page = per_page.unwrap_or(self.query.model().per_page);
        let page = page.unwrap_or(1);
        let columns = self.columns.clone();

        self.cached(CallKind::SimplePaginate { page, per_page }, &columns, || {
            self.query.simple_paginate(per_page, page, &columns)
        })
        .await
    }

    pub async fn count(&self) -> Result<u64, DomainError> {
        let columns = vec![ALL_COLUMNS.to_string()];
        self.cached(CallKind::Count, &columns, || self.query.count())
            .await
    }

    pub async fn exists(&self) -> Result<bool, DomainError> {
        let columns = vec![ALL_COLUMNS.to_string()];
        self.cached(CallKind::Exists, &columns, || self.query.exists())
            .await
    }

    async fn cached<T, F, Fut>(
        &self,
        call_kind: CallKind,
        columns: &[String],
        compute: F,
    ) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, DomainError>> + Send,
    {
        let model = self.query.model();

        if !self.should_cache() {
            debug!(model = %model.name, operation = %call_kind, "Cache bypassed");
            return compute().await;
        }

        let eager_loads = self.query.eager_loads();
        let key = self.caching.key_generator().make(&QueryFingerprint {
            model,
            sql: self.query.to_sql(),
            bindings: self.query.bindings(),
            columns: columns.to_vec(),
            eager_loads,
            call_kind,
        })?;
        let tags = self.caching.tag_resolver().make_tags(model, eager_loads);
        let ttl = self
            .policy
            .resolve_ttl(model, self.caching.config().default_ttl());

        self.caching
            .gateway()
            .read_through(model.cache_store.as_deref(), &key, &tags, ttl, compute)
            .await
    }
}
