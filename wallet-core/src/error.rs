//! Error types for wallet operations

use crate::types::UserId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for wallet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet errors
///
/// Business and input failures are part of every call's visible
/// contract and are propagated by return, never by panic. Only
/// [`Error::Storage`] is transient and eligible for retry; the
/// resilience layer surfaces exhausted retries and an open circuit
/// breaker as [`Error::Unavailable`] without leaking internal detail.
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced wallet absent
    #[error("wallet not found for user {0}")]
    WalletNotFound(UserId),

    /// Duplicate wallet creation
    #[error("wallet already exists for user {0}")]
    WalletAlreadyExists(UserId),

    /// Amount fails the positive-amount precondition
    #[error("invalid amount {0}: must be greater than zero")]
    InvalidAmount(Decimal),

    /// Business-rule violation: balance would go negative
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount the operation needed
        required: Decimal,
        /// Balance actually held
        available: Decimal,
    },

    /// Caller input violates a precondition
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Dependency failure after the resilience budget is exhausted
    #[error("service temporarily unavailable: {0}")]
    Unavailable(String),

    /// Transient store failure (retryable)
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for infrastructure failures the resilience layer may retry
    /// and count against the circuit breaker
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Unavailable(_))
    }
}
