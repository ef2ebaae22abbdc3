//! Remote dependency cache - fetches and memoizes URL-referenced code.
//!
//! The resolver reads this cache synchronously and never waits: a pending
//! entry contributes no code to the bundle, and a later rebuild picks the
//! text up once the fetch lands. Each distinct URL is fetched at most once
//! per cache instance; entries are never evicted.
//!
//! Fetch completion is surfaced as an event stream. Nothing here triggers
//! a rebuild - subscribers decide whether a finished fetch is worth one.

use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// One cached remote dependency, keyed by its URL.
#[derive(Debug, Clone)]
pub struct RemoteDependency {
    pub url: String,
    /// Fetched text, present once `fetched` is true.
    pub code: Option<String>,
    pub fetched: bool,
}

impl RemoteDependency {
    fn pending(url: &str) -> Self {
        Self {
            url: url.to_string(),
            code: None,
            fetched: false,
        }
    }
}

type Entries = Arc<Mutex<HashMap<String, RemoteDependency>>>;

pub struct DependencyCache {
    entries: Entries,
    client: Client,
    events: broadcast::Sender<String>,
}

impl DependencyCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            client: Client::new(),
            events,
        }
    }

    /// Register `url` for asynchronous retrieval unless already registered
    /// or fetched. Returns whether the URL was newly registered.
    ///
    /// The fetch runs as a detached tokio task; without a reactor on the
    /// current thread the entry is still registered but no request is made.
    pub fn ensure_fetching(&self, url: &str) -> bool {
        {
            let mut entries = self.entries.lock().expect("cache mutex poisoned");
            if entries.contains_key(url) {
                return false;
            }
            entries.insert(url.to_string(), RemoteDependency::pending(url));
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(url, "fetching remote dependency");
                handle.spawn(Self::fetch_into(
                    Arc::clone(&self.entries),
                    self.events.clone(),
                    self.client.clone(),
                    url.to_string(),
                ));
            }
            Err(_) => {
                tracing::warn!(url, "no async runtime; remote dependency not fetched");
            }
        }
        true
    }

    pub fn lookup(&self, url: &str) -> Option<RemoteDependency> {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .get(url)
            .cloned()
    }

    /// Store fetched code for `url` and emit a completion event. Idempotent:
    /// a superseded fetch's result is stored the same way.
    pub fn on_fetched(&self, url: &str, code: String) {
        Self::store(&self.entries, &self.events, url, code);
    }

    /// Completion events carrying the fetched URL. Lagged receivers drop
    /// old events, which is fine - a rebuild reads the whole cache anyway.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn fetch_into(entries: Entries, events: broadcast::Sender<String>, client: Client, url: String) {
        let response = client.get(&url).send().await.and_then(|r| r.error_for_status());
        match response {
            Ok(response) => match response.text().await {
                Ok(code) => Self::store(&entries, &events, &url, code),
                Err(e) => tracing::warn!(%url, error = %e, "remote dependency body unreadable"),
            },
            // Silent by contract: a failed dependency contributes no code.
            Err(e) => tracing::warn!(%url, error = %e, "remote dependency fetch failed"),
        }
    }

    fn store(entries: &Entries, events: &broadcast::Sender<String>, url: &str, code: String) {
        {
            let mut entries = entries.lock().expect("cache mutex poisoned");
            let entry = entries
                .entry(url.to_string())
                .or_insert_with(|| RemoteDependency::pending(url));
            entry.code = Some(code);
            entry.fetched = true;
        }
        // No receivers is not an error; events are advisory.
        let _ = events.send(url.to_string());
    }
}

impl Default for DependencyCache {
    fn default() -> Self {
        Self::new()
    }
}
