//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Exact arithmetic (Decimal for money)
//! - Append-only transaction records (created once, never mutated)
//! - Serde-friendly shapes for the API layer

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// External user identifier owning a wallet
///
/// Ordered so multi-record operations can acquire record locks in a
/// fixed global order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// Brazilian Real (the platform default)
    BRL,
    /// US Dollar
    USD,
    /// Euro
    EUR,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::BRL => "BRL",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
        }
    }

    /// Parse from an ISO code
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "BRL" => Some(Currency::BRL),
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::BRL
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Mutable current-balance record for one user
///
/// The balance is a cached projection of the full transaction history;
/// the engine keeps both consistent inside one store commit. Balances
/// are never stored negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Opaque wallet identifier
    pub id: Uuid,

    /// Owning user (unique, stable external key)
    pub user_id: UserId,

    /// Current balance (exact decimal, non-negative)
    pub balance: Decimal,

    /// Wallet currency
    pub currency: Currency,
}

impl Wallet {
    /// Create a new wallet with zero balance
    pub fn new(user_id: UserId, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            balance: Decimal::ZERO,
            currency,
        }
    }
}

/// Kind of balance-affecting event
///
/// DEPOSIT and WITHDRAW always carry the wallet owner in
/// `source_user_id` and never set a destination; "source" means
/// "the wallet owner" for those types, not an external counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    /// Funds added to a wallet
    Deposit,
    /// Funds removed from a wallet
    Withdraw,
    /// Funds moved between two wallets
    Transfer,
}

impl TransactionType {
    /// Stable wire/storage label
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdraw => "WITHDRAW",
            TransactionType::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction completion status
///
/// No partial or pending state is modeled; every appended transaction
/// is already committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Applied and durable
    Completed,
}

/// Immutable ledger entry recording one completed balance-affecting event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID
    pub id: Uuid,

    /// Event kind
    pub tx_type: TransactionType,

    /// Amount moved (always positive)
    pub amount: Decimal,

    /// Currency
    pub currency: Currency,

    /// Creation instant
    pub timestamp: DateTime<Utc>,

    /// Wallet owner for DEPOSIT/WITHDRAW, sending party for TRANSFER
    pub source_user_id: UserId,

    /// Receiving party (TRANSFER only)
    pub destination_user_id: Option<UserId>,

    /// Completion status
    pub status: TransactionStatus,

    /// Human-readable description
    pub description: String,
}

impl Transaction {
    /// Ledger entry for a deposit into `user_id`'s wallet
    pub fn deposit(user_id: UserId, amount: Decimal, currency: Currency) -> Self {
        Self::record(
            TransactionType::Deposit,
            user_id,
            None,
            amount,
            currency,
            "deposit completed",
        )
    }

    /// Ledger entry for a withdrawal from `user_id`'s wallet
    pub fn withdraw(user_id: UserId, amount: Decimal, currency: Currency) -> Self {
        Self::record(
            TransactionType::Withdraw,
            user_id,
            None,
            amount,
            currency,
            "withdrawal completed",
        )
    }

    /// Ledger entry for a transfer between two wallets
    pub fn transfer(
        source: UserId,
        destination: UserId,
        amount: Decimal,
        currency: Currency,
    ) -> Self {
        Self::record(
            TransactionType::Transfer,
            source,
            Some(destination),
            amount,
            currency,
            "transfer completed",
        )
    }

    fn record(
        tx_type: TransactionType,
        source_user_id: UserId,
        destination_user_id: Option<UserId>,
        amount: Decimal,
        currency: Currency,
        description: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx_type,
            amount,
            currency,
            timestamp: Utc::now(),
            source_user_id,
            destination_user_id,
            status: TransactionStatus::Completed,
            description: description.to_string(),
        }
    }

    /// Signed contribution of this transaction to `user_id`'s balance
    ///
    /// This is the replay kernel for historical reconstruction: DEPOSIT
    /// credits the owner, WITHDRAW debits the owner, TRANSFER debits the
    /// source and credits the destination. A transaction in which the
    /// user is not a party contributes zero.
    pub fn signed_amount_for(&self, user_id: &UserId) -> Decimal {
        match self.tx_type {
            TransactionType::Deposit => {
                if &self.source_user_id == user_id {
                    self.amount
                } else {
                    Decimal::ZERO
                }
            }
            TransactionType::Withdraw => {
                if &self.source_user_id == user_id {
                    -self.amount
                } else {
                    Decimal::ZERO
                }
            }
            TransactionType::Transfer => {
                if &self.source_user_id == user_id {
                    -self.amount
                } else if self.destination_user_id.as_ref() == Some(user_id) {
                    self.amount
                } else {
                    Decimal::ZERO
                }
            }
        }
    }

    /// True when `user_id` is the source or destination
    pub fn involves(&self, user_id: &UserId) -> bool {
        &self.source_user_id == user_id || self.destination_user_id.as_ref() == Some(user_id)
    }
}

/// Balance read model returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Wallet owner
    pub user_id: UserId,

    /// Balance at the requested instant
    pub balance: Decimal,

    /// Wallet currency
    pub currency: Currency,
}

impl BalanceResponse {
    /// Zero-balance placeholder used as the degraded fallback value
    ///
    /// Callers must treat this as a degraded signal, not a true balance.
    pub fn zero(user_id: UserId, currency: Currency) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
            currency,
        }
    }
}

impl From<&Wallet> for BalanceResponse {
    fn from(wallet: &Wallet) -> Self {
        Self {
            user_id: wallet.user_id.clone(),
            balance: wallet.balance,
            currency: wallet.currency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::BRL.code(), "BRL");
        assert_eq!(Currency::from_code("USD"), Some(Currency::USD));
        assert_eq!(Currency::from_code("XYZ"), None);
        assert_eq!(Currency::default(), Currency::BRL);
    }

    #[test]
    fn test_new_wallet_starts_at_zero() {
        let wallet = Wallet::new(UserId::new("alice"), Currency::BRL);
        assert_eq!(wallet.balance, Decimal::ZERO);
        assert_eq!(wallet.user_id.as_str(), "alice");
    }

    #[test]
    fn test_deposit_credits_owner_only() {
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let tx = Transaction::deposit(alice.clone(), dec(100), Currency::BRL);

        assert_eq!(tx.destination_user_id, None);
        assert_eq!(tx.signed_amount_for(&alice), dec(100));
        assert_eq!(tx.signed_amount_for(&bob), Decimal::ZERO);
    }

    #[test]
    fn test_withdraw_debits_owner() {
        let alice = UserId::new("alice");
        let tx = Transaction::withdraw(alice.clone(), dec(30), Currency::BRL);

        assert_eq!(tx.signed_amount_for(&alice), dec(-30));
    }

    #[test]
    fn test_transfer_is_zero_sum_across_parties() {
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let carol = UserId::new("carol");
        let tx = Transaction::transfer(alice.clone(), bob.clone(), dec(70), Currency::BRL);

        assert_eq!(tx.signed_amount_for(&alice), dec(-70));
        assert_eq!(tx.signed_amount_for(&bob), dec(70));
        assert_eq!(tx.signed_amount_for(&carol), Decimal::ZERO);
        assert_eq!(
            tx.signed_amount_for(&alice) + tx.signed_amount_for(&bob),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_involves_either_party() {
        let tx = Transaction::transfer(
            UserId::new("alice"),
            UserId::new("bob"),
            dec(5),
            Currency::BRL,
        );
        assert!(tx.involves(&UserId::new("alice")));
        assert!(tx.involves(&UserId::new("bob")));
        assert!(!tx.involves(&UserId::new("carol")));
    }
}
