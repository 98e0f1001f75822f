//! Client code for folio-sw.
//!
//! This crate provides the HTTP fetch pipeline and the caching proxy that
//! sits between portfolio pages and the network.

pub mod fetch;
pub mod proxy;

#[cfg(test)]
mod testing;

pub use fetch::{Destination, FetchClient, FetchConfig, Fetcher, ProxyRequest, RequestMode};
pub use proxy::{CacheProxy, ControlMessage, Handled, Outcome, ProxyOptions, WorkerEvent, WorkerState};
