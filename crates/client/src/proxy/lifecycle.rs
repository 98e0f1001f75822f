//! Worker lifecycle: install, activate, purge and periodic refresh.
//!
//! States move `Parsed → Installing → Installed → Activating → Activated`.
//! A failed install ends in `Redundant`. An installed worker waits until
//! skip-waiting is requested; activation from anywhere else is rejected.

use std::sync::Arc;

use folio_core::{CacheKey, Error, PartitionRole};
use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use super::CacheProxy;
use super::events::WorkerEvent;
use crate::fetch::{Destination, ProxyRequest, RequestMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this worker never controls anything.
    Redundant,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LifecycleState {
    pub state: WorkerState,
    pub skip_waiting: bool,
    pub controlling: bool,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self { state: WorkerState::Parsed, skip_waiting: false, controlling: false }
    }
}

/// One manifest URL that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

/// Result of fetching a manifest into one partition.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct PopulationReport {
    pub partition: String,
    /// Stored URLs, in manifest order.
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InstallReport {
    pub static_assets: PopulationReport,
    pub runtime_assets: PopulationReport,
}

impl InstallReport {
    pub fn failed_count(&self) -> usize {
        self.static_assets.failed.len() + self.runtime_assets.failed.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct ActivationReport {
    /// Partitions from previous epochs that were deleted.
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
}

impl CacheProxy {
    pub async fn state(&self) -> WorkerState {
        self.lifecycle.read().await.state
    }

    /// Whether requests are routed through the caches.
    pub async fn is_controlling(&self) -> bool {
        self.lifecycle.read().await.controlling
    }

    fn set_state(&self, lifecycle: &mut LifecycleState, state: WorkerState) {
        if lifecycle.state != state {
            tracing::info!(from = ?lifecycle.state, to = ?state, epoch = %self.names.epoch(), "worker state changed");
            lifecycle.state = state;
            self.ctx.events.emit(WorkerEvent::StateChanged { state });
        }
    }

    /// Open every partition of the current epoch and precache both manifests.
    ///
    /// Individual asset failures are reported, never fatal. Failing to open a
    /// partition makes the worker redundant.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        {
            let mut lifecycle = self.lifecycle.write().await;
            if lifecycle.state != WorkerState::Parsed {
                return Err(Error::InvalidState(format!("cannot install from {:?}", lifecycle.state)));
            }
            self.set_state(&mut lifecycle, WorkerState::Installing);
        }

        // The guard is released while fetching so intercepted requests keep
        // passing through; `Installing` already rejects a second install.
        for name in self.names.all() {
            if let Err(e) = self.ctx.db.open_partition(&name).await {
                tracing::error!(partition = %name, error = %e, "failed to open partition");
                self.set_state(&mut *self.lifecycle.write().await, WorkerState::Redundant);
                return Err(e);
            }
        }

        let static_assets = self
            .populate(self.names.partition(PartitionRole::Static), &self.options.precache, RequestMode::SameOrigin)
            .await;
        let runtime_assets = self
            .populate(
                self.names.partition(PartitionRole::Runtime),
                &self.options.runtime_precache,
                RequestMode::NoCors,
            )
            .await;

        let report = InstallReport { static_assets, runtime_assets };
        if report.failed_count() > 0 {
            tracing::warn!(failed = report.failed_count(), "install finished with precache failures");
        }

        let mut lifecycle = self.lifecycle.write().await;
        self.set_state(&mut lifecycle, WorkerState::Installed);
        lifecycle.skip_waiting = true;
        Ok(report)
    }

    /// Delete every partition the current epoch does not own, then claim
    /// clients. Running it again once activated only repeats the sweep.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let mut lifecycle = self.lifecycle.write().await;
        let previous = lifecycle.state;
        match previous {
            WorkerState::Installed if lifecycle.skip_waiting => {}
            WorkerState::Installed => {
                return Err(Error::InvalidState("installed worker is waiting for SKIP_WAITING".into()));
            }
            WorkerState::Activated => {}
            other => return Err(Error::InvalidState(format!("cannot activate from {other:?}"))),
        }

        self.set_state(&mut lifecycle, WorkerState::Activating);
        let report = match self.evict_stale_partitions().await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "activation failed");
                self.set_state(&mut lifecycle, previous);
                return Err(e);
            }
        };

        self.set_state(&mut lifecycle, WorkerState::Activated);
        if !lifecycle.controlling {
            lifecycle.controlling = true;
            self.ctx.events.emit(WorkerEvent::ClientsClaimed);
        }
        tracing::info!(deleted = report.deleted.len(), kept = report.kept.len(), "activated");
        Ok(report)
    }

    /// Request skip-waiting; an installed worker activates right away.
    pub async fn skip_waiting(&self) -> Result<(), Error> {
        let activate_now = {
            let mut lifecycle = self.lifecycle.write().await;
            lifecycle.skip_waiting = true;
            lifecycle.state == WorkerState::Installed
        };
        if activate_now {
            self.activate().await?;
        }
        Ok(())
    }

    /// Delete every partition, including the current epoch's.
    pub async fn clear_all(&self) -> Result<u64, Error> {
        let deleted = self.ctx.db.delete_all_partitions().await?;
        tracing::info!(deleted, "all partitions cleared");
        self.ctx.events.emit(WorkerEvent::CachesCleared { deleted });
        Ok(deleted)
    }

    /// Re-fetch the install manifest and overwrite the static partition.
    pub async fn periodic_refresh(&self) -> Result<PopulationReport, Error> {
        if !self.is_controlling().await {
            return Err(Error::InvalidState("periodic refresh needs an activated worker".into()));
        }
        let report = self
            .populate(self.names.partition(PartitionRole::Static), &self.options.precache, RequestMode::SameOrigin)
            .await;
        tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "periodic refresh finished");
        Ok(report)
    }

    async fn evict_stale_partitions(&self) -> Result<ActivationReport, Error> {
        let mut report = ActivationReport::default();
        for name in self.ctx.db.partition_names().await? {
            if self.names.owns(&name) {
                report.kept.push(name);
                continue;
            }
            if self.ctx.db.delete_partition(&name).await? {
                tracing::info!(partition = %name, "evicted stale partition");
                self.ctx.events.emit(WorkerEvent::Evicted { partition: name.clone() });
                report.deleted.push(name);
            }
        }
        Ok(report)
    }

    async fn populate(&self, partition: String, urls: &[Url], mode: RequestMode) -> PopulationReport {
        let semaphore = Arc::new(Semaphore::new(self.options.install_concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let semaphore = semaphore.clone();
            let ctx = self.ctx.clone();
            let partition = partition.clone();
            let request = ProxyRequest::get(url.as_str(), Destination::Empty).with_mode(mode);
            let key = CacheKey::new(url.as_str(), &request.vary_string(&self.options.vary_headers));

            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, request.url, Err("install semaphore closed".to_string()));
                };
                let result = match ctx.fetcher.fetch(&request).await {
                    Ok(response) if response.is_cacheable() => ctx
                        .db
                        .put_entry(&partition, &key, &response)
                        .await
                        .map_err(|e| e.to_string()),
                    Ok(response) => Err(format!("HTTP {}", response.status)),
                    Err(e) => Err(e.to_string()),
                };
                (index, request.url, result)
            });
        }

        let mut outcomes = Vec::with_capacity(urls.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!(error = %e, "precache task failed"),
            }
        }
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut report = PopulationReport { partition: partition.clone(), ..Default::default() };
        for (_, url, result) in outcomes {
            match result {
                Ok(()) => {
                    self.ctx.events.emit(WorkerEvent::Precached { url: url.clone(), partition: partition.clone() });
                    report.cached.push(url);
                }
                Err(reason) => {
                    tracing::warn!(%url, %reason, "precache failed");
                    self.ctx
                        .events
                        .emit(WorkerEvent::PrecacheFailed { url: url.clone(), reason: reason.clone() });
                    report.failed.push(PrecacheFailure { url, reason });
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::proxy::{BypassReason, Outcome, Route};
    use crate::testing::{ScriptedFetcher, proxy_with};
    use folio_core::{AppConfig, CacheDb, Epoch};

    const ORIGIN: &str = "https://jdoe.example.edu";

    fn config() -> AppConfig {
        AppConfig {
            origin: ORIGIN.into(),
            version: Some("2".into()),
            precache: vec!["/".into(), "/index.html".into(), "/css/styles.css".into()],
            runtime_precache: vec!["https://cdn.example.net/fa.css".into()],
            ..Default::default()
        }
    }

    fn script_all(fetcher: &ScriptedFetcher) {
        fetcher.respond(&format!("{ORIGIN}/"), 200, "<html>shell</html>");
        fetcher.respond(&format!("{ORIGIN}/index.html"), 200, "<html>index</html>");
        fetcher.respond(&format!("{ORIGIN}/css/styles.css"), 200, "body{}");
        fetcher.respond("https://cdn.example.net/fa.css", 200, ".fa{}");
    }

    #[tokio::test]
    async fn test_install_precaches_both_manifests() {
        let fetcher = ScriptedFetcher::new();
        script_all(&fetcher);
        let proxy = proxy_with(fetcher.clone(), config(), CacheDb::open_in_memory().await.unwrap()).await;

        let report = proxy.install().await.unwrap();

        assert_eq!(report.failed_count(), 0);
        assert_eq!(
            report.static_assets.cached,
            vec![
                "https://jdoe.example.edu/",
                "https://jdoe.example.edu/index.html",
                "https://jdoe.example.edu/css/styles.css"
            ]
        );
        assert_eq!(report.runtime_assets.partition, "folio-runtime-v2");
        assert_eq!(proxy.state().await, WorkerState::Installed);
        assert!(!proxy.is_controlling().await);

        let names = proxy.ctx.db.partition_names().await.unwrap();
        assert_eq!(names.len(), 6);
    }

    #[tokio::test]
    async fn test_install_failures_are_reported_not_fatal() {
        let fetcher = ScriptedFetcher::new();
        script_all(&fetcher);
        fetcher.respond(&format!("{ORIGIN}/css/styles.css"), 404, "nope");
        fetcher.fail("https://cdn.example.net/fa.css");
        let proxy = proxy_with(fetcher.clone(), config(), CacheDb::open_in_memory().await.unwrap()).await;

        let report = proxy.install().await.unwrap();

        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.static_assets.failed[0].reason, "HTTP 404");
        assert_eq!(report.static_assets.cached.len(), 2);
        assert_eq!(proxy.state().await, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let fetcher = ScriptedFetcher::new();
        let proxy = proxy_with(fetcher.clone(), config(), CacheDb::open_in_memory().await.unwrap()).await;
        proxy.install().await.unwrap();

        assert!(matches!(proxy.install().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_requests_pass_through_while_installing() {
        let fetcher = ScriptedFetcher::new();
        script_all(&fetcher);
        fetcher.delay(&format!("{ORIGIN}/"), Duration::from_secs(10), 200, "<html>shell</html>");
        fetcher.respond(&format!("{ORIGIN}/about"), 200, "<html>about</html>");
        let proxy = Arc::new(proxy_with(fetcher.clone(), config(), CacheDb::open_in_memory().await.unwrap()).await);

        let installing = tokio::spawn({
            let proxy = proxy.clone();
            async move { proxy.install().await }
        });
        while proxy.state().await != WorkerState::Installing {
            tokio::task::yield_now().await;
        }

        let handled = tokio::time::timeout(
            Duration::from_secs(2),
            proxy.handle(&ProxyRequest::navigate(format!("{ORIGIN}/about"))),
        )
        .await
        .expect("request blocked by install");

        assert_eq!(handled.route, Route::Bypass(BypassReason::NotControlling));
        assert!(matches!(&handled.outcome, Outcome::ServedFromNetwork(r) if r.text() == "<html>about</html>"));
        assert!(matches!(proxy.install().await, Err(Error::InvalidState(_))));
        installing.abort();
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let fetcher = ScriptedFetcher::new();
        let proxy = proxy_with(fetcher.clone(), config(), CacheDb::open_in_memory().await.unwrap()).await;

        assert!(matches!(proxy.activate().await, Err(Error::InvalidState(_))));
        assert_eq!(proxy.state().await, WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_activation_evicts_old_epochs_idempotently() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["folio-static-v1", "folio-images-v1", "folio-images-v1-meta", "folio-static-v12"] {
            db.open_partition(name).await.unwrap();
        }
        let fetcher = ScriptedFetcher::new();
        let proxy = proxy_with(fetcher.clone(), config(), db.clone()).await;
        let mut events = proxy.subscribe();

        proxy.install().await.unwrap();
        let report = proxy.activate().await.unwrap();

        assert_eq!(report.deleted.len(), 4);
        let names = db.partition_names().await.unwrap();
        let expected = proxy.names.all();
        assert_eq!(names.len(), expected.len());
        assert!(names.iter().all(|n| expected.contains(n)));
        assert!(proxy.is_controlling().await);

        let again = proxy.activate().await.unwrap();
        assert!(again.deleted.is_empty());
        assert_eq!(again.kept.len(), 6);

        let mut claimed = 0;
        while let Ok(event) = events.try_recv() {
            if event == WorkerEvent::ClientsClaimed {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
    }

    #[tokio::test]
    async fn test_eviction_keeps_only_current_epoch_pair() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["folio-images-vA", "folio-images-vA-meta", "folio-images-vB", "folio-images-vB-meta"] {
            db.open_partition(name).await.unwrap();
        }
        let fetcher = ScriptedFetcher::new();
        let cfg = AppConfig { version: Some("B".into()), precache: Vec::new(), runtime_precache: Vec::new(), ..config() };
        let proxy = proxy_with(fetcher.clone(), cfg, db.clone()).await;
        assert_eq!(proxy.version(), &Epoch::new("B"));

        proxy.install().await.unwrap();
        proxy.activate().await.unwrap();

        assert!(!db.has_partition("folio-images-vA").await.unwrap());
        assert!(!db.has_partition("folio-images-vA-meta").await.unwrap());
        assert!(db.has_partition("folio-images-vB").await.unwrap());
        assert!(db.has_partition("folio-images-vB-meta").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_all_deletes_current_epoch_too() {
        let fetcher = ScriptedFetcher::new();
        script_all(&fetcher);
        let db = CacheDb::open_in_memory().await.unwrap();
        let proxy = proxy_with(fetcher.clone(), config(), db.clone()).await;
        proxy.install().await.unwrap();

        let deleted = proxy.clear_all().await.unwrap();

        assert_eq!(deleted, 6);
        assert!(db.partition_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_periodic_refresh_overwrites_static_entries() {
        let fetcher = ScriptedFetcher::new();
        script_all(&fetcher);
        let db = CacheDb::open_in_memory().await.unwrap();
        let proxy = proxy_with(fetcher.clone(), config(), db.clone()).await;

        assert!(matches!(proxy.periodic_refresh().await, Err(Error::InvalidState(_))));

        proxy.install().await.unwrap();
        proxy.activate().await.unwrap();
        fetcher.respond(&format!("{ORIGIN}/"), 200, "<html>v2</html>");

        let report = proxy.periodic_refresh().await.unwrap();

        assert_eq!(report.cached.len(), 3);
        let key = CacheKey::for_url("https://jdoe.example.edu/");
        let entry = db.match_entry("folio-static-v2", &key).await.unwrap().unwrap();
        assert_eq!(entry.text(), "<html>v2</html>");
    }
}
