//! Ledger store seam and reference in-memory implementation
//!
//! The engine requires only a record store with per-row atomic
//! read-modify-write and an append-only transaction log. The seam is a
//! scoped transaction: acquire the record locks up front, stage writes,
//! commit atomically. Dropping a transaction without committing releases
//! the locks and discards every staged write.

use crate::{
    error::Result,
    types::{Transaction, UserId, Wallet},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Durable store for wallets and the append-only transaction log
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Look up the wallet owned by `user_id`, if any
    async fn get_wallet_by_user_id(&self, user_id: &UserId) -> Result<Option<Wallet>>;

    /// All transactions in which `user_id` is a party, with
    /// `timestamp <= as_of`, in insertion order
    async fn find_transactions_for_user_up_to(
        &self,
        user_id: &UserId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Transaction>>;

    /// Begin a scoped transaction over the given wallet records
    ///
    /// The store serializes concurrent transactions touching the same
    /// user: record locks are acquired in a fixed global order (sorted
    /// by user id) so opposite-direction transfers cannot deadlock.
    async fn begin(&self, user_ids: &[UserId]) -> Result<Box<dyn StoreTransaction>>;
}

/// One atomic unit of wallet writes plus transaction appends
///
/// Writes are staged until [`commit`](StoreTransaction::commit); a
/// transaction dropped without commit rolls back (nothing is applied).
#[async_trait]
pub trait StoreTransaction: Send {
    /// Read a wallet, observing writes staged in this transaction
    async fn get_wallet(&mut self, user_id: &UserId) -> Result<Option<Wallet>>;

    /// Stage a wallet upsert
    async fn save_wallet(&mut self, wallet: &Wallet) -> Result<()>;

    /// Stage an append to the transaction log
    async fn append_transaction(&mut self, transaction: &Transaction) -> Result<()>;

    /// Apply all staged writes as one indivisible commit
    async fn commit(self: Box<Self>) -> Result<()>;
}

struct StoreInner {
    wallets: DashMap<UserId, Wallet>,
    transactions: RwLock<Vec<Transaction>>,
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

/// Reference in-memory [`LedgerStore`]
///
/// Backs the test suite and embedded use. Holds one record lock per
/// wallet; committed state lives in sharded maps so operations on
/// different users proceed independently.
#[derive(Clone)]
pub struct MemoryLedgerStore {
    inner: Arc<StoreInner>,
}

impl MemoryLedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                wallets: DashMap::new(),
                transactions: RwLock::new(Vec::new()),
                locks: DashMap::new(),
            }),
        }
    }

    fn record_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        self.inner
            .locks
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_wallet_by_user_id(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        Ok(self.inner.wallets.get(user_id).map(|w| w.clone()))
    }

    async fn find_transactions_for_user_up_to(
        &self,
        user_id: &UserId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let log = self.inner.transactions.read();
        Ok(log
            .iter()
            .filter(|t| t.involves(user_id) && t.timestamp <= as_of)
            .cloned()
            .collect())
    }

    async fn begin(&self, user_ids: &[UserId]) -> Result<Box<dyn StoreTransaction>> {
        let mut ids: Vec<UserId> = user_ids.to_vec();
        ids.sort();
        ids.dedup();

        // Fixed global acquisition order; locks are taken one at a time
        // so two transfers over the same pair always converge.
        let mut guards = Vec::with_capacity(ids.len());
        for id in &ids {
            let lock = self.record_lock(id);
            guards.push(lock.lock_owned().await);
        }

        Ok(Box::new(MemoryTransaction {
            inner: self.inner.clone(),
            staged_wallets: Vec::new(),
            staged_transactions: Vec::new(),
            _guards: guards,
        }))
    }
}

struct MemoryTransaction {
    inner: Arc<StoreInner>,
    staged_wallets: Vec<Wallet>,
    staged_transactions: Vec<Transaction>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get_wallet(&mut self, user_id: &UserId) -> Result<Option<Wallet>> {
        if let Some(staged) = self
            .staged_wallets
            .iter()
            .rev()
            .find(|w| &w.user_id == user_id)
        {
            return Ok(Some(staged.clone()));
        }
        Ok(self.inner.wallets.get(user_id).map(|w| w.clone()))
    }

    async fn save_wallet(&mut self, wallet: &Wallet) -> Result<()> {
        if let Some(staged) = self
            .staged_wallets
            .iter_mut()
            .find(|w| w.user_id == wallet.user_id)
        {
            *staged = wallet.clone();
        } else {
            self.staged_wallets.push(wallet.clone());
        }
        Ok(())
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        self.staged_transactions.push(transaction.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        for wallet in &self.staged_wallets {
            self.inner.wallets.insert(wallet.user_id.clone(), wallet.clone());
        }
        if !self.staged_transactions.is_empty() {
            let mut log = self.inner.transactions.write();
            log.extend(self.staged_transactions.iter().cloned());
        }
        Ok(())
    }
}
