//! Wallet ledger engine
//!
//! Implements deposit, withdraw, transfer, and balance lookups as
//! atomic, invariant-preserving operations over the ledger store.
//!
//! # Invariants
//!
//! - Balance-ledger consistency: the live balance and the appended
//!   transaction are committed as one unit, so replaying a user's
//!   transaction log always reproduces the live balance
//! - Non-negativity: a wallet balance is never stored negative
//! - Conservation: a transfer debits and credits the same amount in
//!   the same commit
//!
//! Mutations evict the balance cache only after a successful commit;
//! callers observe their own writes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wallet_core::{Config, MemoryLedgerStore, UserId, WalletLedger};
//!
//! #[tokio::main]
//! async fn main() -> wallet_core::Result<()> {
//!     let ledger = WalletLedger::new(Arc::new(MemoryLedgerStore::new()), Config::default())?;
//!
//!     let alice = UserId::new("alice");
//!     ledger.create_wallet(&alice).await?;
//!     ledger.deposit(&alice, rust_decimal::Decimal::new(100, 0)).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    cache::{BalanceCache, CacheMetrics},
    error::{Error, Result},
    metrics::Metrics,
    store::LedgerStore,
    types::{BalanceResponse, Currency, Transaction, UserId, Wallet},
    Config,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// Balance-ledger consistency engine
pub struct WalletLedger {
    /// Record and transaction-log store
    store: Arc<dyn LedgerStore>,

    /// Read-through balance cache
    cache: BalanceCache,

    /// Currency assigned to new wallets
    currency: Currency,

    /// Operation counters
    metrics: Metrics,
}

impl WalletLedger {
    /// Create an engine over the given store
    pub fn new(store: Arc<dyn LedgerStore>, config: Config) -> Result<Self> {
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("failed to register metrics: {}", e)))?;

        Ok(Self {
            store,
            cache: BalanceCache::new(config.cache),
            currency: config.currency,
            metrics,
        })
    }

    /// Currency assigned to new wallets
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Engine operation counters
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Balance cache hit/miss counters
    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.get_metrics()
    }

    /// Create a wallet with zero balance for `user_id`
    ///
    /// Fails with `WalletAlreadyExists` when the user already owns one.
    /// The new wallet is written through to the cache; correctness does
    /// not depend on it.
    pub async fn create_wallet(&self, user_id: &UserId) -> Result<Wallet> {
        let mut tx = self.store.begin(std::slice::from_ref(user_id)).await?;
        if tx.get_wallet(user_id).await?.is_some() {
            return Err(Error::WalletAlreadyExists(user_id.clone()));
        }

        let wallet = Wallet::new(user_id.clone(), self.currency);
        tx.save_wallet(&wallet).await?;
        tx.commit().await?;

        let generation = self.cache.generation(user_id);
        self.cache.put_wallet(user_id, wallet.clone(), generation);

        self.metrics.wallets_created.inc();
        info!("created wallet {} for user {}", wallet.id, user_id);
        Ok(wallet)
    }

    /// Add `amount` to the user's balance and append a DEPOSIT entry
    pub async fn deposit(&self, user_id: &UserId, amount: Decimal) -> Result<Wallet> {
        ensure_positive(amount)?;

        let mut tx = self.store.begin(std::slice::from_ref(user_id)).await?;
        let mut wallet = tx
            .get_wallet(user_id)
            .await?
            .ok_or_else(|| Error::WalletNotFound(user_id.clone()))?;

        wallet.balance += amount;
        tx.save_wallet(&wallet).await?;
        tx.append_transaction(&Transaction::deposit(user_id.clone(), amount, wallet.currency))
            .await?;
        tx.commit().await?;

        self.cache.evict(user_id);
        self.metrics.deposits.inc();
        info!("deposited {} {} for user {}", amount, wallet.currency, user_id);
        Ok(wallet)
    }

    /// Subtract `amount` from the user's balance and append a WITHDRAW entry
    ///
    /// Fails with `InsufficientFunds` when the balance would go
    /// negative, leaving the balance unchanged.
    pub async fn withdraw(&self, user_id: &UserId, amount: Decimal) -> Result<Wallet> {
        ensure_positive(amount)?;

        let mut tx = self.store.begin(std::slice::from_ref(user_id)).await?;
        let mut wallet = tx
            .get_wallet(user_id)
            .await?
            .ok_or_else(|| Error::WalletNotFound(user_id.clone()))?;

        if wallet.balance < amount {
            self.metrics.insufficient_funds.inc();
            return Err(Error::InsufficientFunds {
                required: amount,
                available: wallet.balance,
            });
        }

        wallet.balance -= amount;
        tx.save_wallet(&wallet).await?;
        tx.append_transaction(&Transaction::withdraw(user_id.clone(), amount, wallet.currency))
            .await?;
        tx.commit().await?;

        self.cache.evict(user_id);
        self.metrics.withdrawals.inc();
        info!("withdrew {} {} for user {}", amount, wallet.currency, user_id);
        Ok(wallet)
    }

    /// Move `amount` from `source` to `destination` as one commit
    ///
    /// Debit, credit, and the single TRANSFER entry are indivisible:
    /// both records are locked for the duration and no partial state is
    /// ever committed. Resulting balances are not returned to the
    /// caller.
    pub async fn transfer(
        &self,
        source: &UserId,
        destination: &UserId,
        amount: Decimal,
    ) -> Result<()> {
        if source == destination {
            return Err(Error::InvalidArgument("cannot transfer to self".to_string()));
        }
        ensure_positive(amount)?;

        let mut tx = self
            .store
            .begin(&[source.clone(), destination.clone()])
            .await?;
        let mut source_wallet = tx
            .get_wallet(source)
            .await?
            .ok_or_else(|| Error::WalletNotFound(source.clone()))?;
        let mut destination_wallet = tx
            .get_wallet(destination)
            .await?
            .ok_or_else(|| Error::WalletNotFound(destination.clone()))?;

        if source_wallet.balance < amount {
            self.metrics.insufficient_funds.inc();
            return Err(Error::InsufficientFunds {
                required: amount,
                available: source_wallet.balance,
            });
        }

        source_wallet.balance -= amount;
        destination_wallet.balance += amount;
        tx.save_wallet(&source_wallet).await?;
        tx.save_wallet(&destination_wallet).await?;
        tx.append_transaction(&Transaction::transfer(
            source.clone(),
            destination.clone(),
            amount,
            source_wallet.currency,
        ))
        .await?;
        tx.commit().await?;

        self.cache.evict(source);
        self.cache.evict(destination);
        self.metrics.transfers.inc();
        info!(
            "transferred {} {} from user {} to user {}",
            amount, source_wallet.currency, source, destination
        );
        Ok(())
    }

    /// Current balance for `user_id` (primary cache-read path)
    pub async fn get_balance(&self, user_id: &UserId) -> Result<BalanceResponse> {
        self.metrics.balance_lookups.inc();

        let generation = self.cache.generation(user_id);
        if let Some(cached) = self.cache.get_balance(user_id) {
            return Ok(cached);
        }

        info!("fetching balance for user {}", user_id);
        let wallet = self
            .store
            .get_wallet_by_user_id(user_id)
            .await?
            .ok_or_else(|| Error::WalletNotFound(user_id.clone()))?;

        let response = BalanceResponse::from(&wallet);
        self.cache.put_balance(user_id, response.clone(), generation);
        Ok(response)
    }

    /// Wallet owned by `user_id`, read through the wallet cache
    pub async fn get_wallet_by_user_id(&self, user_id: &UserId) -> Result<Wallet> {
        let generation = self.cache.generation(user_id);
        if let Some(cached) = self.cache.get_wallet(user_id) {
            return Ok(cached);
        }

        let wallet = self
            .store
            .get_wallet_by_user_id(user_id)
            .await?
            .ok_or_else(|| Error::WalletNotFound(user_id.clone()))?;

        self.cache.put_wallet(user_id, wallet.clone(), generation);
        Ok(wallet)
    }

    /// Balance as of `as_of`, reconstructed from the transaction log
    ///
    /// Folds every transaction in which the user is a party with
    /// `timestamp <= as_of`, starting from zero: the result is fully
    /// derived from the log and never consults the live balance field.
    /// Not cached; each call re-scans the log.
    pub async fn get_historical_balance(
        &self,
        user_id: &UserId,
        as_of: DateTime<Utc>,
    ) -> Result<BalanceResponse> {
        self.metrics.historical_lookups.inc();

        let wallet = self.get_wallet_by_user_id(user_id).await?;
        let transactions = self
            .store
            .find_transactions_for_user_up_to(user_id, as_of)
            .await?;

        let balance = transactions
            .iter()
            .fold(Decimal::ZERO, |acc, t| acc + t.signed_amount_for(user_id));

        Ok(BalanceResponse {
            user_id: wallet.user_id,
            balance,
            currency: wallet.currency,
        })
    }
}

fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(amount));
    }
    Ok(())
}
