//! Configuration for the wallet ledger

use crate::{
    cache::CacheConfig,
    circuit_breaker::CircuitBreakerConfig,
    error::{Error, Result},
    retry::RetryConfig,
    types::Currency,
};
use serde::{Deserialize, Serialize};

/// Wallet ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Currency for newly created wallets (single-currency platform)
    pub currency: Currency,

    /// Balance cache tuning
    pub cache: CacheConfig,

    /// Retry budget for store calls
    pub retry: RetryConfig,

    /// Circuit breaker tuning
    pub breaker: CircuitBreakerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(code) = std::env::var("WALLET_CURRENCY") {
            config.currency = Currency::from_code(&code)
                .ok_or_else(|| Error::Config(format!("unsupported currency: {}", code)))?;
        }

        if let Ok(ttl) = std::env::var("WALLET_BALANCE_TTL_SECONDS") {
            config.cache.balance_ttl_seconds = ttl
                .parse()
                .map_err(|_| Error::Config(format!("invalid balance TTL: {}", ttl)))?;
        }

        if let Ok(cooldown) = std::env::var("WALLET_BREAKER_COOLDOWN_MS") {
            config.breaker.cooldown_ms = cooldown
                .parse()
                .map_err(|_| Error::Config(format!("invalid breaker cooldown: {}", cooldown)))?;
        }

        Ok(config)
    }
}
