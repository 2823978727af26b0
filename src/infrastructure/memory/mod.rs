//! In-memory data source
//!
//! A small relational stand-in used by the CLI and tests: tables of serde
//! records, a query builder that renders SQL-like text for fingerprinting,
//! and a log of every statement that actually executed.

mod log;
mod query;
mod table;

pub use log::QueryLog;
pub use query::{Direction, MemoryQuery, Operator};
pub use table::MemoryTable;
