//! Runner cache with single-flight compilation
//!
//! `RunnerCache::get_or_create` guarantees at most one in-flight compile per key.
//! The first caller for a missing key registers a shared compile future under the
//! in-flight lock; every later caller for that key awaits the same future. The
//! compile itself runs on the blocking pool inside a detached task, so it finishes
//! and populates the cache even if every waiter is cancelled.
//!
//! Lock order: `in_flight` → `entries` → `policy`. No lock is held across an `.await`.

pub mod entry;
pub mod eviction;
pub mod key;

pub use entry::{CacheEntry, ErasedRunner};
pub use eviction::{EvictionPolicy, FifoEvictionPolicy, LruEvictionPolicy};
pub use key::CacheKey;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::CacheConfig;
use crate::error::CompileError;

type CompileOutcome = Result<Arc<CacheEntry>, CompileError>;
type PendingCompile = Shared<BoxFuture<'static, CompileOutcome>>;

/// Snapshot of cache counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries currently cached
    pub entries: usize,
    /// Lookups served from a live entry
    pub hits: u64,
    /// Lookups that started a compile
    pub misses: u64,
    /// Lookups that joined a compile another caller had started
    pub coalesced: u64,
    /// Compiles that produced a runner
    pub compiles: u64,
    pub compile_failures: u64,
    pub evictions: u64,
    pub expirations: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    compiles: AtomicU64,
    compile_failures: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

struct Inner {
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
    in_flight: Mutex<HashMap<CacheKey, PendingCompile>>,
    policy: Mutex<Box<dyn EvictionPolicy>>,
    config: CacheConfig,
    counters: Counters,
}

/// Keyed store of compiled runners
///
/// Cheap to clone; clones share the same storage.
#[derive(Clone)]
pub struct RunnerCache {
    inner: Arc<Inner>,
}

impl RunnerCache {
    /// Create a cache using the eviction policy named in `config`
    pub fn new(config: CacheConfig) -> Self {
        let policy = eviction::policy_for(config.eviction);
        Self::with_policy(config, policy)
    }

    /// Create a cache with a custom eviction policy
    pub fn with_policy(config: CacheConfig, policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                policy: Mutex::new(policy),
                config,
                counters: Counters::default(),
            }),
        }
    }

    /// Return the entry for `key`, compiling it with `compile` on a miss
    ///
    /// Concurrent callers for the same key share one compile and all receive its
    /// outcome. A failed compile leaves the key absent, so the next call retries.
    /// Must be called within a tokio runtime.
    pub async fn get_or_create<F>(&self, key: CacheKey, compile: F) -> CompileOutcome
    where
        F: FnOnce() -> Result<ErasedRunner, CompileError> + Send + 'static,
    {
        if let Some(entry) = self.inner.lookup(&key) {
            trace!(key = %key, "cache hit");
            return Ok(entry);
        }

        let pending = {
            let mut in_flight = self.inner.in_flight.lock();

            // A compile may have landed between the lookup above and taking the lock
            if let Some(entry) = self.inner.lookup(&key) {
                trace!(key = %key, "cache hit");
                return Ok(entry);
            }

            match in_flight.get(&key) {
                Some(pending) => {
                    self.inner.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    trace!(key = %key, "joining in-flight compile");
                    pending.clone()
                }
                None => {
                    self.inner.counters.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "cache miss, compiling");
                    let pending = Inner::spawn_compile(Arc::clone(&self.inner), key.clone(), compile);
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Return the live entry for `key` without compiling
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.inner.lookup(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner
            .entries
            .read()
            .get(key)
            .is_some_and(|entry| !self.inner.is_expired(entry))
    }

    /// Drop the entry for `key`; returns whether one was present
    pub fn remove(&self, key: &CacheKey) -> bool {
        let mut entries = self.inner.entries.write();
        let removed = entries.remove(key).is_some();
        if removed {
            self.inner.policy.lock().on_remove(key);
            debug!(key = %key, "removed cached runner");
        }
        removed
    }

    /// Drop every entry; in-flight compiles still land when they finish
    pub fn clear(&self) {
        let mut entries = self.inner.entries.write();
        let mut policy = self.inner.policy.lock();
        for key in entries.keys() {
            policy.on_remove(key);
        }
        let cleared_count = entries.len();
        entries.clear();
        info!(cleared_count, "cleared runner cache");
    }

    /// Eagerly drop entries older than the configured time-to-live
    ///
    /// Returns the number of entries removed. Expired entries are also swept
    /// whenever a compile lands, so this is only needed to reclaim memory early.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.inner.entries.write();
        let mut policy = self.inner.policy.lock();
        let purged = self.inner.sweep_expired(&mut entries, &mut **policy);
        if purged > 0 {
            debug!(count = purged, "purged expired runners");
        }
        purged
    }

    /// Number of live entries; expired entries awaiting a sweep are not counted
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .values()
            .filter(|entry| !self.inner.is_expired(entry))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of compiles currently in flight
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        CacheStats {
            entries: self.len(),
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            compiles: counters.compiles.load(Ordering::Relaxed),
            compile_failures: counters.compile_failures.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
            expirations: counters.expirations.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }
}

impl Default for RunnerCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for RunnerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerCache")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Inner {
    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.config
            .time_to_live()
            .is_some_and(|ttl| entry.age() >= ttl)
    }

    /// Live entry lookup; records the hit with the entry and the policy
    fn lookup(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if self.is_expired(entry) {
            return None;
        }

        entry.record_hit();
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        self.policy.lock().on_access(key);
        Some(Arc::clone(entry))
    }

    /// Start a compile for `key` and return the future every waiter shares
    fn spawn_compile<F>(inner: Arc<Inner>, key: CacheKey, compile: F) -> PendingCompile
    where
        F: FnOnce() -> Result<ErasedRunner, CompileError> + Send + 'static,
    {
        let source = key.shared_source();

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let outcome = match tokio::task::spawn_blocking(compile).await {
                Ok(Ok(runner)) => Ok(Arc::new(CacheEntry::new(runner, started.elapsed()))),
                Ok(Err(err)) => Err(err),
                Err(join_err) => Err(CompileError::new(
                    key.shared_source(),
                    format!("compiler panicked: {}", join_err),
                )),
            };
            inner.complete(&key, &outcome);
            outcome
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(CompileError::new(
                    source,
                    format!("compile task failed: {}", join_err),
                )),
            }
        }
        .boxed()
        .shared()
    }

    /// Publish a finished compile and retire its in-flight slot
    fn complete(&self, key: &CacheKey, outcome: &CompileOutcome) {
        let mut in_flight = self.in_flight.lock();

        match outcome {
            Ok(entry) => {
                self.counters.compiles.fetch_add(1, Ordering::Relaxed);
                debug!(
                    key = %key,
                    compile_ms = entry.compile_time().as_millis() as u64,
                    "compiled runner"
                );
                self.insert(key.clone(), Arc::clone(entry));
            }
            Err(err) => {
                self.counters.compile_failures.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %err, "compile failed");
            }
        }

        in_flight.remove(key);
    }

    /// Remove expired entries, counting them as expirations
    fn sweep_expired(
        &self,
        entries: &mut HashMap<CacheKey, Arc<CacheEntry>>,
        policy: &mut dyn EvictionPolicy,
    ) -> usize {
        if self.config.time_to_live().is_none() {
            return 0;
        }

        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.remove(key);
            policy.on_remove(key);
        }
        self.counters
            .expirations
            .fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }

    fn insert(&self, key: CacheKey, entry: Arc<CacheEntry>) {
        let mut entries = self.entries.write();
        let mut policy = self.policy.lock();

        let swept = self.sweep_expired(&mut entries, &mut **policy);
        if swept > 0 {
            trace!(count = swept, "swept expired runners");
        }

        if entries.insert(key.clone(), entry).is_some() {
            policy.on_remove(&key);
        }
        policy.on_add(&key);

        let Some(max_entries) = self.config.max_entries else {
            return;
        };

        while entries.len() > max_entries {
            let Some(victim) = policy.evict() else {
                break;
            };
            entries.remove(&victim);
            policy.on_remove(&victim);
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %victim, "evicted runner");
        }
    }
}
