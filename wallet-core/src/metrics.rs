//! Metrics collection for observability
//!
//! Prometheus counters for the ledger engine:
//!
//! - `wallet_wallets_created_total` - Wallets created
//! - `wallet_deposits_total` - Successful deposits
//! - `wallet_withdrawals_total` - Successful withdrawals
//! - `wallet_transfers_total` - Successful transfers
//! - `wallet_balance_lookups_total` - Balance reads
//! - `wallet_historical_lookups_total` - Historical reconstructions
//! - `wallet_insufficient_funds_total` - Rejected debits

use prometheus::{IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Wallets created
    pub wallets_created: IntCounter,

    /// Successful deposits
    pub deposits: IntCounter,

    /// Successful withdrawals
    pub withdrawals: IntCounter,

    /// Successful transfers
    pub transfers: IntCounter,

    /// Balance reads (cached or not)
    pub balance_lookups: IntCounter,

    /// Historical balance reconstructions
    pub historical_lookups: IntCounter,

    /// Debits rejected for insufficient funds
    pub insufficient_funds: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        Ok(Self {
            wallets_created: counter(
                &registry,
                "wallet_wallets_created_total",
                "Wallets created",
            )?,
            deposits: counter(&registry, "wallet_deposits_total", "Successful deposits")?,
            withdrawals: counter(
                &registry,
                "wallet_withdrawals_total",
                "Successful withdrawals",
            )?,
            transfers: counter(&registry, "wallet_transfers_total", "Successful transfers")?,
            balance_lookups: counter(
                &registry,
                "wallet_balance_lookups_total",
                "Balance reads",
            )?,
            historical_lookups: counter(
                &registry,
                "wallet_historical_lookups_total",
                "Historical balance reconstructions",
            )?,
            insufficient_funds: counter(
                &registry,
                "wallet_insufficient_funds_total",
                "Debits rejected for insufficient funds",
            )?,
            registry,
        })
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
