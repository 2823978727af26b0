//! Eager-load specification

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Constraint applied to an eagerly loaded relation.
///
/// `Value` constraints are plain data and take part in cache fingerprints.
/// `Closure` constraints are programmatic callbacks owned by the data layer;
/// they cannot be fingerprinted and collapse to the bare relation name.
#[derive(Clone)]
pub enum RelationConstraint {
    Value(Value),
    Closure(Arc<dyn Any + Send + Sync>),
}

impl RelationConstraint {
    /// Returns the fingerprintable form of the constraint, if any
    pub fn fingerprint(&self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value.clone()),
            Self::Closure(_) => None,
        }
    }
}

impl fmt::Debug for RelationConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Closure(_) => f.write_str("Closure(<callback>)"),
        }
    }
}

/// Relation paths to load alongside the primary query, keyed by dotted path.
///
/// Keys are kept sorted so iteration and serialization are deterministic.
#[derive(Debug, Clone, Default)]
pub struct EagerLoads {
    relations: BTreeMap<String, Option<RelationConstraint>>,
}

impl EagerLoads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unconstrained relation path.
    ///
    /// Nested paths register their parents too, so `"author.publisher"` also
    /// loads `"author"`.
    pub fn with(mut self, path: impl Into<String>) -> Self {
        self.insert(path.into(), None);
        self
    }

    /// Adds a relation path with a constraint
    pub fn with_constraint(mut self, path: impl Into<String>, constraint: RelationConstraint) -> Self {
        self.insert(path.into(), Some(constraint));
        self
    }

    /// Adds a relation path in place
    pub fn insert(&mut self, path: String, constraint: Option<RelationConstraint>) {
        let segments: Vec<&str> = path.split('.').collect();

        for depth in 1..segments.len() {
            let parent = segments[..depth].join(".");
            self.relations.entry(parent).or_insert(None);
        }

        self.relations.insert(path, constraint);
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Iterates relation paths in lexicographic order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    pub fn get(&self, path: &str) -> Option<&Option<RelationConstraint>> {
        self.relations.get(path)
    }

    /// Sorted path → fingerprintable constraint map
    pub fn normalized(&self) -> BTreeMap<String, Option<Value>> {
        self.relations
            .iter()
            .map(|(path, constraint)| {
                (
                    path.clone(),
                    constraint.as_ref().and_then(RelationConstraint::fingerprint),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_path_registers_parents() {
        let eager = EagerLoads::new().with("author.publisher.country");

        let paths: Vec<&str> = eager.paths().collect();
        assert_eq!(
            paths,
            vec!["author", "author.publisher", "author.publisher.country"]
        );
    }

    #[test]
    fn test_paths_are_sorted() {
        let eager = EagerLoads::new().with("reviews").with("author").with("category");

        let paths: Vec<&str> = eager.paths().collect();
        assert_eq!(paths, vec!["author", "category", "reviews"]);
    }

    #[test]
    fn test_parent_constraint_is_preserved() {
        let eager = EagerLoads::new()
            .with_constraint("author", RelationConstraint::Value(Value::from("active")))
            .with("author.publisher");

        let normalized = eager.normalized();
        assert_eq!(normalized.get("author"), Some(&Some(Value::from("active"))));
        assert_eq!(normalized.get("author.publisher"), Some(&None));
    }

    #[test]
    fn test_closure_constraint_collapses() {
        let eager = EagerLoads::new()
            .with_constraint("author", RelationConstraint::Closure(Arc::new(42u8)));

        assert_eq!(eager.normalized().get("author"), Some(&None));
        assert!(format!("{:?}", eager).contains("Closure(<callback>)"));
    }
}
