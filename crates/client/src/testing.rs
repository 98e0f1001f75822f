//! Test doubles shared by the proxy tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use folio_core::{AppConfig, CacheDb, CachedResponse, Error};

use crate::fetch::{Fetcher, ProxyRequest, RequestMode, canonicalize};
use crate::proxy::events::EventBus;
use crate::proxy::{CacheProxy, ProxyOptions};
use crate::proxy::strategy::StrategyContext;

#[derive(Debug, Clone)]
enum Script {
    Respond { status: u16, body: String, delay: Option<Duration> },
    Fail,
}

/// Fetcher answering from a script. Unscripted URLs behave as offline.
///
/// Every `no-cors` capture comes back opaque, whatever its origin.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    log: Mutex<Vec<String>>,
}

fn normalize(url: &str) -> String {
    canonicalize(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.script(url, Script::Respond { status, body: body.into(), delay: None });
    }

    pub fn delay(&self, url: &str, delay: Duration, status: u16, body: &str) {
        self.script(url, Script::Respond { status, body: body.into(), delay: Some(delay) });
    }

    pub fn fail(&self, url: &str) {
        self.script(url, Script::Fail);
    }

    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        let url = normalize(url);
        self.log.lock().unwrap().iter().filter(|u| **u == url).count()
    }

    fn script(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(normalize(url), script);
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &ProxyRequest) -> Result<CachedResponse, Error> {
        let url = normalize(&request.url);
        self.log.lock().unwrap().push(url.clone());
        let script = self.scripts.lock().unwrap().get(&url).cloned();

        match script {
            Some(Script::Respond { status, body, delay }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(CachedResponse {
                    url,
                    status,
                    headers: vec![("content-type".into(), "text/plain".into())],
                    body: body.into_bytes(),
                    opaque: request.mode == RequestMode::NoCors,
                })
            }
            Some(Script::Fail) => Err(Error::Network(format!("{url}: connection reset"))),
            None => Err(Error::Network(format!("{url}: offline"))),
        }
    }
}

pub async fn context(fetcher: Arc<ScriptedFetcher>) -> StrategyContext {
    StrategyContext { db: CacheDb::open_in_memory().await.unwrap(), fetcher, events: EventBus::new() }
}

pub fn ok_response(url: &str, body: &str) -> CachedResponse {
    CachedResponse {
        url: url.into(),
        status: 200,
        headers: vec![("content-type".into(), "text/plain".into())],
        body: body.as_bytes().to_vec(),
        opaque: false,
    }
}

pub async fn proxy_with(fetcher: Arc<ScriptedFetcher>, config: AppConfig, db: CacheDb) -> CacheProxy {
    CacheProxy::new(db, fetcher, ProxyOptions::from_config(&config).unwrap())
}
