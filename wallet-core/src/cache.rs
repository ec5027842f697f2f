//! Read-through balance cache
//!
//! Two logical entries per user: the Wallet projection (long TTL,
//! identity and currency rarely change) and the BalanceResponse
//! projection (short TTL, changes on every mutation). Mutations evict;
//! `NotFound` results are never cached.
//!
//! Coherence is arbitrated by a per-user eviction generation: a
//! populate captures the generation before the store read and is
//! discarded if an eviction moved it in the meantime, so a populate
//! racing an evict can never resurrect stale data.

use crate::types::{BalanceResponse, UserId, Wallet};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache TTL constants (in seconds)
pub mod ttl {
    /// Wallet projection entries
    pub const WALLET: u64 = 300; // 5 minutes
    /// Balance projection entries
    pub const BALANCE: u64 = 60; // 1 minute
}

/// Cache tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for wallet entries (seconds)
    pub wallet_ttl_seconds: u64,
    /// TTL for balance entries (seconds)
    pub balance_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            wallet_ttl_seconds: ttl::WALLET,
            balance_ttl_seconds: ttl::BALANCE,
        }
    }
}

/// Cache hit/miss accounting
#[derive(Default, Debug)]
pub struct CacheMetrics {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that fell through to the store
    pub misses: u64,
    /// Entries populated
    pub sets: u64,
    /// Entries evicted
    pub deletes: u64,
}

impl CacheMetrics {
    /// Hit rate in percent
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64) / (total as f64) * 100.0
        }
    }
}

struct Entry<T> {
    value: T,
    expires_at: Instant,
    generation: u64,
}

/// In-process read-through cache for wallet and balance projections
pub struct BalanceCache {
    wallets: DashMap<UserId, Entry<Wallet>>,
    balances: DashMap<UserId, Entry<BalanceResponse>>,
    generations: DashMap<UserId, u64>,
    wallet_ttl: Duration,
    balance_ttl: Duration,
    metrics: RwLock<CacheMetrics>,
}

impl BalanceCache {
    /// Create a cache with the given TTLs
    pub fn new(config: CacheConfig) -> Self {
        Self {
            wallets: DashMap::new(),
            balances: DashMap::new(),
            generations: DashMap::new(),
            wallet_ttl: Duration::from_secs(config.wallet_ttl_seconds),
            balance_ttl: Duration::from_secs(config.balance_ttl_seconds),
            metrics: RwLock::new(CacheMetrics::default()),
        }
    }

    /// Current eviction generation for `user_id`
    ///
    /// Capture this before the store read that computes a value to
    /// populate; pass it back to the matching `put_*` call.
    pub fn generation(&self, user_id: &UserId) -> u64 {
        self.generations.get(user_id).map(|g| *g).unwrap_or(0)
    }

    /// Cached balance, if fresh
    pub fn get_balance(&self, user_id: &UserId) -> Option<BalanceResponse> {
        self.lookup(&self.balances, user_id)
    }

    /// Cached wallet, if fresh
    pub fn get_wallet(&self, user_id: &UserId) -> Option<Wallet> {
        self.lookup(&self.wallets, user_id)
    }

    /// Populate the balance entry, unless an eviction has intervened
    pub fn put_balance(&self, user_id: &UserId, response: BalanceResponse, generation: u64) {
        self.put(&self.balances, user_id, response, generation, self.balance_ttl);
    }

    /// Populate the wallet entry, unless an eviction has intervened
    pub fn put_wallet(&self, user_id: &UserId, wallet: Wallet, generation: u64) {
        self.put(&self.wallets, user_id, wallet, generation, self.wallet_ttl);
    }

    /// Drop both entries for `user_id` and advance its generation
    ///
    /// Must run as the last step after a successful commit so readers
    /// always observe their own writes.
    pub fn evict(&self, user_id: &UserId) {
        *self.generations.entry(user_id.clone()).or_insert(0) += 1;
        if self.balances.remove(user_id).is_some() {
            self.record_delete();
        }
        if self.wallets.remove(user_id).is_some() {
            self.record_delete();
        }
        debug!("evicted cache entries for user {}", user_id);
    }

    fn lookup<T: Clone>(&self, map: &DashMap<UserId, Entry<T>>, user_id: &UserId) -> Option<T> {
        let current = self.generation(user_id);
        let (value, stale) = match map.get(user_id) {
            Some(entry) => {
                if entry.generation == current && entry.expires_at > Instant::now() {
                    (Some(entry.value.clone()), false)
                } else {
                    (None, true)
                }
            }
            None => (None, false),
        };
        if stale {
            map.remove(user_id);
        }
        match value {
            Some(v) => {
                self.record_hit();
                Some(v)
            }
            None => {
                self.record_miss();
                None
            }
        }
    }

    fn put<T>(
        &self,
        map: &DashMap<UserId, Entry<T>>,
        user_id: &UserId,
        value: T,
        generation: u64,
        ttl: Duration,
    ) {
        if self.generation(user_id) != generation {
            debug!("discarding stale cache populate for user {}", user_id);
            return;
        }
        map.insert(
            user_id.clone(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
                generation,
            },
        );
        self.record_set();
    }

    fn record_hit(&self) {
        self.metrics.write().hits += 1;
    }

    fn record_miss(&self) {
        self.metrics.write().misses += 1;
    }

    fn record_set(&self) {
        self.metrics.write().sets += 1;
    }

    fn record_delete(&self) {
        self.metrics.write().deletes += 1;
    }

    /// Get current cache metrics
    pub fn get_metrics(&self) -> CacheMetrics {
        let metrics = self.metrics.read();
        CacheMetrics {
            hits: metrics.hits,
            misses: metrics.misses,
            sets: metrics.sets,
            deletes: metrics.deletes,
        }
    }

    /// Reset cache metrics
    pub fn reset_metrics(&self) {
        *self.metrics.write() = CacheMetrics::default();
    }
}
