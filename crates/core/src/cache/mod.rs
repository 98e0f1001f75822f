//! SQLite-backed store for named cache partitions.
//!
//! A partition is a durable key-value store of captured responses. This
//! module provides:
//!
//! - Partition lifecycle (open, enumerate, delete)
//! - Whole-entry put/match/delete keyed by hashed request identifiers
//! - Freshness timestamps kept in a parallel `-meta` partition
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod freshness;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedResponse, EntrySummary};
pub use hash::CacheKey;
