//! End-to-end scenarios through the full stack:
//! resilience wrapper -> cache -> ledger engine -> store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wallet_core::{
    CacheConfig, CircuitBreakerConfig, CircuitState, Config, Currency, Error, LedgerStore,
    MemoryLedgerStore, ResilientWallet, Result, RetryConfig, StoreTransaction, Transaction,
    UserId, Wallet, WalletLedger,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn dec(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

/// Store whose health can be toggled mid-test
struct FlakyStore {
    inner: MemoryLedgerStore,
    healthy: AtomicBool,
    calls: AtomicU32,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryLedgerStore::new(),
            healthy: AtomicBool::new(true),
            calls: AtomicU32::new(0),
        }
    }

    fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Storage("store offline".to_string()))
        }
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn get_wallet_by_user_id(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        self.gate()?;
        self.inner.get_wallet_by_user_id(user_id).await
    }

    async fn find_transactions_for_user_up_to(
        &self,
        user_id: &UserId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        self.gate()?;
        self.inner.find_transactions_for_user_up_to(user_id, as_of).await
    }

    async fn begin(&self, user_ids: &[UserId]) -> Result<Box<dyn StoreTransaction>> {
        self.gate()?;
        self.inner.begin(user_ids).await
    }
}

fn breaker_test_config() -> Config {
    Config {
        currency: Currency::BRL,
        cache: CacheConfig::default(),
        retry: RetryConfig {
            max_retries: 0,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        },
        breaker: CircuitBreakerConfig {
            failure_rate_threshold: 0.5,
            min_calls: 3,
            window_ms: 60_000,
            cooldown_ms: 50,
            half_open_max_probes: 2,
            success_threshold: 1,
        },
    }
}

fn build(store: Arc<dyn LedgerStore>, config: Config) -> ResilientWallet {
    let ledger = Arc::new(WalletLedger::new(store, config.clone()).unwrap());
    ResilientWallet::new(ledger, &config)
}

#[tokio::test]
async fn test_wallet_lifecycle_through_full_stack() {
    init_tracing();
    let wallet = build(Arc::new(MemoryLedgerStore::new()), Config::default());
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");

    wallet.create_wallet(&alice).await.unwrap();
    wallet.create_wallet(&bob).await.unwrap();

    let state = wallet.deposit(&alice, dec(100)).await.unwrap();
    assert_eq!(state.balance, dec(100));
    let after_deposit = Utc::now();

    let state = wallet.withdraw(&alice, dec(30)).await.unwrap();
    assert_eq!(state.balance, dec(70));

    wallet.transfer(&alice, &bob, dec(70)).await.unwrap();

    assert_eq!(wallet.get_balance(&alice).await.unwrap().balance, Decimal::ZERO);
    assert_eq!(wallet.get_balance(&bob).await.unwrap().balance, dec(70));

    let historical = wallet
        .get_historical_balance(&alice, after_deposit)
        .await
        .unwrap();
    assert_eq!(historical.balance, dec(100));
}

#[tokio::test]
async fn test_overdraft_rejected_balance_unchanged() {
    init_tracing();
    let wallet = build(Arc::new(MemoryLedgerStore::new()), Config::default());
    let alice = UserId::new("alice");

    wallet.create_wallet(&alice).await.unwrap();
    wallet.deposit(&alice, dec(30)).await.unwrap();

    let result = wallet.withdraw(&alice, dec(50)).await;
    assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
    assert_eq!(wallet.get_balance(&alice).await.unwrap().balance, dec(30));
}

#[tokio::test]
async fn test_self_transfer_rejected() {
    init_tracing();
    let wallet = build(Arc::new(MemoryLedgerStore::new()), Config::default());
    let alice = UserId::new("alice");
    wallet.create_wallet(&alice).await.unwrap();
    wallet.deposit(&alice, dec(10)).await.unwrap();

    let result = wallet.transfer(&alice, &alice, dec(10)).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(wallet.get_balance(&alice).await.unwrap().balance, dec(10));
}

#[tokio::test]
async fn test_breaker_opens_short_circuits_and_recovers() {
    init_tracing();
    let store = Arc::new(FlakyStore::new());
    let wallet = build(store.clone(), breaker_test_config());
    let alice = UserId::new("alice");

    wallet.create_wallet(&alice).await.unwrap();
    wallet.deposit(&alice, dec(100)).await.unwrap();

    // Store goes down: failing reads return the degraded placeholder
    // and fill the breaker window.
    store.set_healthy(false);
    for _ in 0..3 {
        let response = wallet.get_balance(&alice).await.unwrap();
        assert_eq!(response.balance, Decimal::ZERO);
    }
    assert_eq!(wallet.breaker_state(), CircuitState::Open);

    // Open breaker sheds load: no store traffic.
    let before = store.calls();
    let response = wallet.get_balance(&alice).await.unwrap();
    assert_eq!(response.balance, Decimal::ZERO);
    assert_eq!(store.calls(), before);

    // After the cooldown a probe passes through the recovered store
    // and closes the breaker again.
    store.set_healthy(true);
    tokio::time::sleep(Duration::from_millis(60)).await;

    let response = wallet.get_balance(&alice).await.unwrap();
    assert_eq!(response.balance, dec(100));
    assert_eq!(wallet.breaker_state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_mutations_fail_closed_while_store_down() {
    init_tracing();
    let store = Arc::new(FlakyStore::new());
    let wallet = build(store.clone(), breaker_test_config());
    let alice = UserId::new("alice");

    wallet.create_wallet(&alice).await.unwrap();
    wallet.deposit(&alice, dec(100)).await.unwrap();

    store.set_healthy(true);
    // warm the balance into cache while healthy
    assert_eq!(wallet.get_balance(&alice).await.unwrap().balance, dec(100));

    store.set_healthy(false);
    let result = wallet.deposit(&alice, dec(10)).await;
    assert!(matches!(result, Err(Error::Unavailable(_))));

    // The failed mutation committed nothing and evicted nothing: the
    // cached balance is still the pre-failure truth.
    store.set_healthy(true);
    assert_eq!(wallet.get_balance(&alice).await.unwrap().balance, dec(100));
}

#[tokio::test]
async fn test_historical_fallback_uses_cached_balance() {
    init_tracing();
    let store = Arc::new(FlakyStore::new());
    let wallet = build(store.clone(), breaker_test_config());
    let alice = UserId::new("alice");

    wallet.create_wallet(&alice).await.unwrap();
    wallet.deposit(&alice, dec(55)).await.unwrap();
    assert_eq!(wallet.get_balance(&alice).await.unwrap().balance, dec(55));

    store.set_healthy(false);
    let response = wallet
        .get_historical_balance(&alice, Utc::now())
        .await
        .unwrap();
    // Degraded to the cached current balance rather than failing.
    assert_eq!(response.balance, dec(55));
}

#[test]
fn test_balance_response_wire_shape() {
    let response = wallet_core::BalanceResponse {
        user_id: UserId::new("alice"),
        balance: dec(70),
        currency: Currency::BRL,
    };

    let value = serde_json::to_value(&response).unwrap();
    assert!(value.get("user_id").is_some());
    assert!(value.get("balance").is_some());
    assert!(value.get("currency").is_some());

    let parsed: wallet_core::BalanceResponse = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, response);
}
