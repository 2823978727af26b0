//! Query interception

mod caching_query;

pub use caching_query::CachingQuery;
