//! Resilience wrapper around the ledger engine
//!
//! Explicit decorator replacing annotation-driven policies: every
//! wrapped call flows through one visible pipeline: circuit breaker
//! admission, retry with backoff, outcome recording, fallback mapping.
//!
//! Fallbacks when retries exhaust or the breaker is open:
//! - `get_balance` returns a zero-balance placeholder (a degraded
//!   signal, not a true balance)
//! - mutations surface `Unavailable` rather than pretending success
//! - `get_historical_balance` degrades to the current (possibly
//!   cached) balance, then to the zero placeholder

use crate::{
    circuit_breaker::{CircuitBreaker, CircuitState},
    error::{Error, Result},
    ledger::WalletLedger,
    retry::RetryStrategy,
    types::{BalanceResponse, UserId, Wallet},
    Config,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use tracing::error;

/// Fault-isolating decorator over [`WalletLedger`]
pub struct ResilientWallet {
    ledger: Arc<WalletLedger>,
    breaker: Mutex<CircuitBreaker>,
    retry: RetryStrategy,
}

impl ResilientWallet {
    /// Wrap an engine with the configured retry and breaker policies
    pub fn new(ledger: Arc<WalletLedger>, config: &Config) -> Self {
        Self {
            ledger,
            breaker: Mutex::new(CircuitBreaker::new(config.breaker.clone())),
            retry: RetryStrategy::new(config.retry.clone()),
        }
    }

    /// Current breaker state (for health reporting)
    pub fn breaker_state(&self) -> CircuitState {
        self.breaker.lock().state()
    }

    /// Breaker admission, retry loop, and outcome recording for one call
    async fn call<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.breaker.lock().check(operation)?;

        let result = self.retry.execute_with_retry(op, operation).await;
        match &result {
            Err(e) if e.is_transient() => self.breaker.lock().record_failure(operation),
            // Business errors mean the store responded; they keep the
            // breaker closed and count as successful probes.
            _ => self.breaker.lock().record_success(operation),
        }
        result
    }

    fn mutation_fallback(&self, operation: &str, user_id: &UserId, err: Error) -> Error {
        if err.is_transient() {
            error!("fallback: {} failed for user {}: {}", operation, user_id, err);
            Error::Unavailable("please try again later".to_string())
        } else {
            err
        }
    }

    /// Create a wallet (passes through unwrapped; creation is not
    /// retried or circuit-broken)
    pub async fn create_wallet(&self, user_id: &UserId) -> Result<Wallet> {
        self.ledger.create_wallet(user_id).await
    }

    /// [`WalletLedger::deposit`] under the resilience policy
    pub async fn deposit(&self, user_id: &UserId, amount: Decimal) -> Result<Wallet> {
        self.call("deposit", || self.ledger.deposit(user_id, amount))
            .await
            .map_err(|e| self.mutation_fallback("deposit", user_id, e))
    }

    /// [`WalletLedger::withdraw`] under the resilience policy
    pub async fn withdraw(&self, user_id: &UserId, amount: Decimal) -> Result<Wallet> {
        self.call("withdraw", || self.ledger.withdraw(user_id, amount))
            .await
            .map_err(|e| self.mutation_fallback("withdraw", user_id, e))
    }

    /// [`WalletLedger::transfer`] under the resilience policy
    pub async fn transfer(
        &self,
        source: &UserId,
        destination: &UserId,
        amount: Decimal,
    ) -> Result<()> {
        self.call("transfer", || self.ledger.transfer(source, destination, amount))
            .await
            .map_err(|e| self.mutation_fallback("transfer", source, e))
    }

    /// [`WalletLedger::get_balance`] with the degraded fallback
    ///
    /// A zero-balance placeholder is returned instead of a transient
    /// failure; callers must treat it as a degraded signal.
    pub async fn get_balance(&self, user_id: &UserId) -> Result<BalanceResponse> {
        match self
            .call("get_balance", || self.ledger.get_balance(user_id))
            .await
        {
            Ok(response) => Ok(response),
            Err(e) if e.is_transient() => {
                error!("fallback: get_balance failed for user {}: {}", user_id, e);
                Ok(BalanceResponse::zero(user_id.clone(), self.ledger.currency()))
            }
            Err(e) => Err(e),
        }
    }

    /// [`WalletLedger::get_historical_balance`] with the degraded fallback
    pub async fn get_historical_balance(
        &self,
        user_id: &UserId,
        as_of: DateTime<Utc>,
    ) -> Result<BalanceResponse> {
        match self
            .call("get_historical_balance", || {
                self.ledger.get_historical_balance(user_id, as_of)
            })
            .await
        {
            Ok(response) => Ok(response),
            Err(e) if e.is_transient() => {
                error!(
                    "fallback: get_historical_balance failed for user {}: {}",
                    user_id, e
                );
                // Degrade to the current balance, which may itself come
                // from the cache or the zero placeholder.
                match self.get_balance(user_id).await {
                    Ok(response) => Ok(response),
                    Err(_) => Ok(BalanceResponse::zero(
                        user_id.clone(),
                        self.ledger.currency(),
                    )),
                }
            }
            Err(e) => Err(e),
        }
    }
}
