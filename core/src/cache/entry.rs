use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A runner with its concrete `Runner<C, R>` type erased
pub type ErasedRunner = Arc<dyn Any + Send + Sync>;

/// Cache entry for a compiled runner
///
/// Only the hit counter changes after creation.
pub struct CacheEntry {
    runner: ErasedRunner,
    created_at: Instant,
    compile_time: Duration,
    hits: AtomicU64,
}

impl CacheEntry {
    pub fn new(runner: ErasedRunner, compile_time: Duration) -> Self {
        Self {
            runner,
            created_at: Instant::now(),
            compile_time,
            hits: AtomicU64::new(0),
        }
    }

    pub fn runner(&self) -> &ErasedRunner {
        &self.runner
    }

    /// Recover the typed runner, if this entry holds a `T`
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.runner).downcast::<T>().ok()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn compile_time(&self) -> Duration {
        self.compile_time
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("created_at", &self.created_at)
            .field("compile_time", &self.compile_time)
            .field("hits", &self.hits())
            .finish_non_exhaustive()
    }
}
