//! Wallet Core
//!
//! Balance-ledger consistency engine for per-user wallets.
//!
//! # Architecture
//!
//! - **Ledger Engine**: deposit/withdraw/transfer/balance operations,
//!   each committing the balance change and its ledger entry as one
//!   atomic unit
//! - **Balance Cache**: read-through projections with TTLs and
//!   evict-wins-over-populate coherence
//! - **Resilience Wrapper**: explicit retry + circuit breaker
//!   composition with degraded fallbacks
//! - **Ledger Store seam**: scoped transactions over an external
//!   record/log store; a reference in-memory store is included
//!
//! # Invariants
//!
//! - Balance-ledger consistency: replaying a user's transaction log up
//!   to now equals the live balance
//! - Non-negativity: no operation drives a balance below zero
//! - Conservation: transfers are zero-sum across the two parties
//! - Read-your-writes: a successful mutation is visible to the next
//!   balance read

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod resilience;
pub mod retry;
pub mod store;
pub mod types;

// Re-exports
pub use cache::{BalanceCache, CacheConfig, CacheMetrics};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::WalletLedger;
pub use metrics::Metrics;
pub use resilience::ResilientWallet;
pub use retry::{RetryConfig, RetryStrategy};
pub use store::{LedgerStore, MemoryLedgerStore, StoreTransaction};
pub use types::{
    BalanceResponse, Currency, Transaction, TransactionStatus, TransactionType, UserId, Wallet,
};
