//! Core types and shared functionality for folio-sw.
//!
//! This crate provides:
//! - Versioned cache partitions with a SQLite backend
//! - Freshness bookkeeping for cache-first partitions
//! - Version epoch and partition naming
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod epoch;
pub mod error;

pub use cache::{CacheDb, CacheKey, CachedResponse, EntrySummary};
pub use config::{AppConfig, ConfigError};
pub use epoch::{Epoch, PartitionNames, PartitionRole};
pub use error::Error;
