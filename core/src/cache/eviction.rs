use std::collections::{HashMap, VecDeque};

use super::CacheKey;
use crate::config::EvictionKind;

/// Eviction policy for the runner cache
///
/// The cache calls the hooks under its own lock, so implementations need no
/// internal synchronization.
pub trait EvictionPolicy: Send {
    /// Pick the entry to drop when the cache is over capacity
    fn evict(&mut self) -> Option<CacheKey>;

    /// Called on every cache hit
    fn on_access(&mut self, key: &CacheKey);

    /// Called when an entry is added
    fn on_add(&mut self, key: &CacheKey);

    /// Called when an entry is removed for any reason
    fn on_remove(&mut self, key: &CacheKey);
}

pub fn policy_for(kind: EvictionKind) -> Box<dyn EvictionPolicy> {
    match kind {
        EvictionKind::Lru => Box::new(LruEvictionPolicy::new()),
        EvictionKind::Fifo => Box::new(FifoEvictionPolicy::new()),
    }
}

/// LRU (Least Recently Used) eviction policy
#[derive(Debug, Default)]
pub struct LruEvictionPolicy {
    last_used: HashMap<CacheKey, u64>,
    clock: u64,
}

impl LruEvictionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&mut self, key: &CacheKey) {
        self.clock += 1;
        self.last_used.insert(key.clone(), self.clock);
    }
}

impl EvictionPolicy for LruEvictionPolicy {
    fn evict(&mut self) -> Option<CacheKey> {
        self.last_used
            .iter()
            .min_by_key(|(_, tick)| **tick)
            .map(|(key, _)| key.clone())
    }

    fn on_access(&mut self, key: &CacheKey) {
        if self.last_used.contains_key(key) {
            self.touch(key);
        }
    }

    fn on_add(&mut self, key: &CacheKey) {
        self.touch(key);
    }

    fn on_remove(&mut self, key: &CacheKey) {
        self.last_used.remove(key);
    }
}

/// FIFO eviction policy: the oldest insertion goes first, hits don't matter
#[derive(Debug, Default)]
pub struct FifoEvictionPolicy {
    order: VecDeque<CacheKey>,
}

impl FifoEvictionPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvictionPolicy for FifoEvictionPolicy {
    fn evict(&mut self) -> Option<CacheKey> {
        self.order.front().cloned()
    }

    fn on_access(&mut self, _key: &CacheKey) {}

    fn on_add(&mut self, key: &CacheKey) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.clone());
    }

    fn on_remove(&mut self, key: &CacheKey) {
        self.order.retain(|k| k != key);
    }
}
