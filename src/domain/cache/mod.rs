//! Cache domain - Query fingerprints, tag derivation and the backend abstraction

mod key;
mod policy;
mod repository;
mod tagged;
mod tags;

pub use key::{CallKind, KeyNamespace, QueryFingerprint, QueryKeyGenerator};
pub use policy::CachePolicy;
pub use repository::{Cache, TaggableCache};
pub use tagged::TaggedCache;
pub use tags::{TagResolver, TagSet};

#[cfg(test)]
pub use repository::mock::MockCache;
