//! The offline caching proxy.
//!
//! A [`CacheProxy`] owns its partition store, fetcher and event bus. Every
//! intercepted request is classified by the [`router`], resolved by one of
//! the [`strategy`] implementations and answered with a tagged [`Outcome`].
//! Until the worker is activated every request passes straight through.

pub mod events;
pub mod lifecycle;
pub mod message;
pub mod notify;
pub mod outcome;
pub mod router;
pub mod strategy;

use std::sync::Arc;

use folio_core::{AppConfig, CacheDb, CacheKey, Epoch, Error, PartitionNames, PartitionRole};
use tokio::sync::{RwLock, broadcast};
use url::Url;

pub use events::{EventBus, WorkerEvent};
pub use lifecycle::{ActivationReport, InstallReport, PopulationReport, PrecacheFailure, WorkerState};
pub use message::{ControlMessage, VersionReply};
pub use notify::{Notification, PushPayload, WindowAction};
pub use outcome::{FallbackKind, Outcome};
pub use router::{BypassReason, Route, RouterRules, Strategy};

use self::lifecycle::LifecycleState;
use self::strategy::{CacheFirst, NetworkFirst, StaleWhileRevalidate, StrategyContext};
use crate::fetch::url::resolve;
use crate::fetch::{Fetcher, ProxyRequest};

/// Settings the proxy runs with, resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    pub origin: Url,
    pub epoch: Epoch,
    pub cache_prefix: String,
    pub site_name: String,
    pub max_age: chrono::Duration,
    pub precache: Vec<Url>,
    pub runtime_precache: Vec<Url>,
    pub shell_urls: Vec<Url>,
    pub bypass_hosts: Vec<String>,
    pub bypass_paths: Vec<String>,
    pub vary_headers: Vec<String>,
    pub install_concurrency: usize,
}

impl ProxyOptions {
    /// Resolve manifests against the origin and fix the epoch for this run.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let resolve_all = |entries: &[String]| -> Result<Vec<Url>, Error> {
            entries
                .iter()
                .map(|entry| resolve(&origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}"))))
                .collect()
        };

        Ok(Self {
            precache: resolve_all(&config.precache)?,
            runtime_precache: resolve_all(&config.runtime_precache)?,
            shell_urls: resolve_all(&config.shell_urls)?,
            epoch: config.epoch(),
            cache_prefix: config.cache_prefix.clone(),
            site_name: config.site_name.clone(),
            max_age: config.max_age(),
            bypass_hosts: config.bypass_hosts.clone(),
            bypass_paths: config.bypass_paths.clone(),
            vary_headers: config.vary_headers.clone(),
            install_concurrency: config.install_concurrency,
            origin,
        })
    }
}

/// Result of one intercepted request.
#[derive(Debug)]
pub struct Handled {
    pub route: Route,
    pub outcome: Outcome,
}

pub struct CacheProxy {
    ctx: StrategyContext,
    options: ProxyOptions,
    names: PartitionNames,
    rules: RouterRules,
    shell_keys: Vec<CacheKey>,
    lifecycle: RwLock<LifecycleState>,
}

impl CacheProxy {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, options: ProxyOptions) -> Self {
        let names = PartitionNames::new(options.cache_prefix.clone(), options.epoch.clone());
        let rules = RouterRules {
            origin: options.origin.clone(),
            bypass_hosts: options.bypass_hosts.clone(),
            bypass_paths: options.bypass_paths.clone(),
        };
        let shell_keys = options
            .shell_urls
            .iter()
            .map(|url| {
                let vary = ProxyRequest::navigate(url.as_str()).vary_string(&options.vary_headers);
                CacheKey::new(url.as_str(), &vary)
            })
            .collect();

        Self {
            ctx: StrategyContext { db, fetcher, events: EventBus::new() },
            options,
            names,
            rules,
            shell_keys,
            lifecycle: RwLock::new(LifecycleState::default()),
        }
    }

    pub fn version(&self) -> &Epoch {
        self.names.epoch()
    }

    pub fn names(&self) -> &PartitionNames {
        &self.names
    }

    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    pub fn db(&self) -> &CacheDb {
        &self.ctx.db
    }

    /// Receive every event emitted from now on. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.ctx.events.subscribe()
    }

    /// Intercept one request.
    pub async fn handle(&self, request: &ProxyRequest) -> Handled {
        let route = if self.is_controlling().await {
            self.rules.classify(request)
        } else {
            Route::Bypass(BypassReason::NotControlling)
        };

        let outcome = match &route {
            Route::Bypass(reason) => {
                tracing::debug!(url = %request.url, ?reason, "bypassing caches");
                self.passthrough(request).await
            }
            Route::Cache { role, strategy, url } => {
                let key = CacheKey::new(url.as_str(), &request.vary_string(&self.options.vary_headers));
                tracing::debug!(url = %url, %role, ?strategy, "routing request");
                self.dispatch(*role, *strategy, request, &key).await
            }
        };

        tracing::debug!(url = %request.url, outcome = outcome.tag(), "request handled");
        Handled { route, outcome }
    }

    async fn dispatch(&self, role: PartitionRole, strategy: Strategy, request: &ProxyRequest, key: &CacheKey) -> Outcome {
        let partition = self.names.partition(role);
        match strategy {
            Strategy::CacheFirst => {
                CacheFirst { partition, meta_partition: self.names.meta(role), max_age: self.options.max_age }
                    .respond(&self.ctx, request, key)
                    .await
            }
            Strategy::NetworkFirst => {
                NetworkFirst { partition, shell_keys: self.shell_keys.clone() }
                    .respond(&self.ctx, request, key)
                    .await
            }
            Strategy::StaleWhileRevalidate => {
                StaleWhileRevalidate { partition }.respond(&self.ctx, request, key).await
            }
        }
    }

    async fn passthrough(&self, request: &ProxyRequest) -> Outcome {
        match self.ctx.fetcher.fetch(request).await {
            Ok(response) => Outcome::ServedFromNetwork(response),
            Err(err) => Outcome::Failed(err),
        }
    }
}
