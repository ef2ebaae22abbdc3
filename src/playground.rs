//! Playground pipeline - one long-lived owner for the whole edit loop.
//!
//! Owns the dependency cache and the executor, and turns every edit of the
//! fragment set into a resolve -> guard -> run round trip. All mutable
//! pipeline state lives behind this struct's methods; nothing is ambient.
//!
//! There is no debouncing: every edit runs the full pipeline. The pipeline
//! itself is synchronous up to the run, so a later edit's outcome can never
//! be overwritten by an earlier, slower one.

use crate::cache::DependencyCache;
use crate::executor::{RealmOutput, SandboxConfig, SandboxExecutor};
use crate::fragment::FragmentSet;
use crate::loop_guard::{instrument_loops, DEFAULT_MAX_ITERATIONS};
use crate::resolver::resolve_imports;
use anyhow::Result;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct PlaygroundConfig {
    /// Iteration cap injected into every loop of the bundle.
    pub max_iterations: u32,
    pub sandbox: SandboxConfig,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            sandbox: SandboxConfig::default(),
        }
    }
}

pub struct Playground {
    config: PlaygroundConfig,
    cache: DependencyCache,
    executor: SandboxExecutor,
}

impl Playground {
    pub fn new(config: PlaygroundConfig) -> Self {
        Self {
            executor: SandboxExecutor::new(config.sandbox.clone()),
            cache: DependencyCache::new(),
            config,
        }
    }

    /// Rebuild and rerun from the current fragment set. Called on every
    /// edit.
    pub async fn update(&mut self, fragments: &FragmentSet) -> Result<RealmOutput> {
        let bundle = self.build(fragments);
        self.executor.run(&bundle).await
    }

    /// The bundle text an edit would run: imports resolved, loops guarded.
    pub fn build(&self, fragments: &FragmentSet) -> String {
        let resolved = resolve_imports(fragments, &self.cache);
        instrument_loops(&resolved, self.config.max_iterations)
    }

    /// Completion events for remote dependency fetches. A subscriber may
    /// rebuild when a URL it imported lands in the cache; nothing rebuilds
    /// automatically.
    pub fn subscribe_fetches(&self) -> broadcast::Receiver<String> {
        self.cache.subscribe()
    }

    pub fn cache(&self) -> &DependencyCache {
        &self.cache
    }

    pub fn executor(&self) -> &SandboxExecutor {
        &self.executor
    }
}
