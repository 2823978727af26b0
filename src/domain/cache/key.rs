//! Query fingerprinting and cache key generation

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::model::{EagerLoads, ModelDescriptor};
use crate::domain::DomainError;

/// Prefix and database-keying settings shared by keys and tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: String,
    database_keying: bool,
}

impl KeyNamespace {
    pub fn new(prefix: impl Into<String>, database_keying: bool) -> Self {
        Self {
            prefix: prefix.into(),
            database_keying,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn database_keying(&self) -> bool {
        self.database_keying
    }

    /// Namespace for one entity type: `prefix[:connection:database]`.
    ///
    /// A model-level prefix replaces the configured one.
    pub fn for_model(&self, model: &ModelDescriptor) -> String {
        let prefix = model.cache_prefix.as_deref().unwrap_or(&self.prefix);

        if self.database_keying {
            format!("{}:{}:{}", prefix, model.connection, model.database)
        } else {
            prefix.to_string()
        }
    }
}

/// The read shape a key is generated for
#[derive(Debug, Clone, PartialEq)]
pub enum CallKind {
    All,
    First,
    Find(Value),
    FindMany(Vec<Value>),
    Paginate { page: u32, per_page: u32 },
    SimplePaginate { page: u32, per_page: u32 },
    Count,
    Exists,
}

impl CallKind {
    /// Key suffix for this read shape; `All` has none
    pub fn suffix(&self) -> Option<String> {
        match self {
            CallKind::All => None,
            CallKind::First => Some("first".to_string()),
            CallKind::Find(id) => Some(format!("find:{}", render_id(id))),
            CallKind::FindMany(ids) => {
                let ids: Vec<String> = ids.iter().map(render_id).collect();
                Some(format!("findMany:{}", ids.join(",")))
            }
            CallKind::Paginate { page, per_page } => {
                Some(format!("paginate:{}:{}", page, per_page))
            }
            CallKind::SimplePaginate { page, per_page } => {
                Some(format!("simplePaginate:{}:{}", page, per_page))
            }
            CallKind::Count => Some("count".to_string()),
            CallKind::Exists => Some("exists".to_string()),
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::All => write!(f, "get"),
            CallKind::First => write!(f, "first"),
            CallKind::Find(_) => write!(f, "find"),
            CallKind::FindMany(_) => write!(f, "find_many"),
            CallKind::Paginate { .. } => write!(f, "paginate"),
            CallKind::SimplePaginate { .. } => write!(f, "simple_paginate"),
            CallKind::Count => write!(f, "count"),
            CallKind::Exists => write!(f, "exists"),
        }
    }
}

fn render_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Everything that identifies one query execution
#[derive(Debug, Clone)]
pub struct QueryFingerprint<'a> {
    pub model: &'a ModelDescriptor,
    pub sql: String,
    pub bindings: Vec<Value>,
    pub columns: Vec<String>,
    pub eager_loads: &'a EagerLoads,
    pub call_kind: CallKind,
}

/// Canonical form hashed into the key
#[derive(Serialize)]
struct CanonicalQuery<'a> {
    model: &'a str,
    connection: &'a str,
    sql: &'a str,
    bindings: &'a [Value],
    columns: &'a [String],
    eager_loads: BTreeMap<String, Option<Value>>,
}

/// Generates deterministic cache keys for queries
#[derive(Debug, Clone)]
pub struct QueryKeyGenerator {
    namespace: KeyNamespace,
}

impl QueryKeyGenerator {
    pub fn new(namespace: KeyNamespace) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    /// Builds `namespace:sha256[:suffix]` for the given query
    pub fn make(&self, fingerprint: &QueryFingerprint<'_>) -> Result<String, DomainError> {
        let canonical = CanonicalQuery {
            model: &fingerprint.model.name,
            connection: &fingerprint.model.connection,
            sql: &fingerprint.sql,
            bindings: &fingerprint.bindings,
            columns: &fingerprint.columns,
            eager_loads: fingerprint.eager_loads.normalized(),
        };

        let payload = serde_json::to_vec(&canonical)?;
        let hash = hex::encode(Sha256::digest(&payload));

        let mut key = format!("{}:{}", self.namespace.for_model(fingerprint.model), hash);

        if let Some(suffix) = fingerprint.call_kind.suffix() {
            key.push(':');
            key.push_str(&suffix);
        }

        Ok(key)
    }
}
