//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use exchange_server::Config;
use exchange_server::settlement::SettlementSaga;
use exchange_server::store::{
    LedgerStore, MemoryStore, OrderRepository, StoreError, StoreResult, WalletRepository,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::error::ErrorCode;
use shared::models::{
    Account, Currency, Order, OrderCreate, OrderFilter, TransferKind, TransferRecord,
    TransferRequest,
};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

pub const SELLER: i64 = 1;
pub const BUYER: i64 = 2;

pub fn usd() -> Currency {
    Currency::new("USD").unwrap()
}

pub fn btc() -> Currency {
    Currency::new("BTC").unwrap()
}

/// A user's USD and BTC account numbers
pub struct Party {
    pub user_id: i64,
    pub usd: String,
    pub btc: String,
}

/// Wallet with a funded USD and BTC account
pub async fn party(store: &MemoryStore, user_id: i64, usd_balance: Decimal, btc_balance: Decimal) -> Party {
    let wallet = store.create_wallet(user_id, &usd()).await.unwrap();
    let btc_account = store.add_account(user_id, &btc()).await.unwrap();
    let party = Party {
        user_id,
        usd: wallet.accounts[0].clone(),
        btc: btc_account.number,
    };
    if usd_balance > Decimal::ZERO {
        store.credit(&party.usd, usd_balance).await.unwrap();
    }
    if btc_balance > Decimal::ZERO {
        store.credit(&party.btc, btc_balance).await.unwrap();
    }
    party
}

pub async fn balance(store: &dyn LedgerStore, number: &str) -> Decimal {
    store.account(number).await.unwrap().balance
}

/// Seller lists 1 BTC at 50000 USD; buyer holds 60000 USD
pub struct Scenario {
    pub store: Arc<MemoryStore>,
    pub seller: Party,
    pub buyer: Party,
    pub order: Order,
}

pub async fn scenario() -> Scenario {
    let store = Arc::new(MemoryStore::new());
    let seller = party(&store, SELLER, dec!(0), dec!(1.0)).await;
    let buyer = party(&store, BUYER, dec!(60000), dec!(0)).await;
    let order = store
        .create(OrderCreate {
            seller_id: SELLER,
            base_currency: btc(),
            amount: dec!(1.0),
            price: dec!(50000),
            quote_currency: usd(),
        })
        .await
        .unwrap();
    Scenario {
        store,
        seller,
        buyer,
        order,
    }
}

pub fn saga_over(ledger: Arc<dyn LedgerStore>, store: Arc<MemoryStore>) -> SettlementSaga {
    SettlementSaga::new(ledger, store.clone(), store, Duration::from_millis(500))
}

/// Saga over the memory store with its order table replaced
pub fn saga_with_orders(store: Arc<MemoryStore>, orders: Arc<dyn OrderRepository>) -> SettlementSaga {
    SettlementSaga::new(store.clone(), store, orders, Duration::from_millis(500))
}

pub fn test_config() -> Config {
    Config {
        storage_timeout: Duration::from_millis(500),
        ..Config::default()
    }
}

/// What a faulty ledger does with one kind of transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Rejected without applying
    Reject,
    /// Applied, but the caller sees a timeout
    ApplyThenTimeout,
    /// Not applied, and the caller sees a timeout
    DropThenTimeout,
    /// Not applied, the caller sees a timeout, and read-backs fail too
    Blackout,
    /// Applied, but the caller sees a remote database error
    ApplyThenSystemError,
    /// Applied, the caller sees a timeout, and every later call fails
    ApplyThenBlackout,
}

/// `LedgerStore` wrapper injecting faults per transfer kind
pub struct FaultyLedger {
    inner: Arc<MemoryStore>,
    faults: Mutex<Vec<(TransferKind, Fault)>>,
    blackout: Mutex<bool>,
    pub calls: Mutex<Vec<(TransferKind, Uuid)>>,
}

impl FaultyLedger {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(Vec::new()),
            blackout: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(self, kind: TransferKind, fault: Fault) -> Self {
        self.faults.lock().unwrap().push((kind, fault));
        self
    }

    fn fault_for(&self, kind: TransferKind) -> Option<Fault> {
        self.faults
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, f)| *f)
    }

    pub fn calls_of(&self, kind: TransferKind) -> Vec<Uuid> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| *id)
            .collect()
    }
}

#[async_trait]
impl LedgerStore for FaultyLedger {
    async fn account(&self, number: &str) -> StoreResult<Account> {
        self.inner.account(number).await
    }

    async fn create_account(&self, currency: &Currency) -> StoreResult<Account> {
        self.inner.create_account(currency).await
    }

    async fn set_active(&self, number: &str, active: bool) -> StoreResult<Account> {
        self.inner.set_active(number, active).await
    }

    async fn credit(&self, number: &str, amount: Decimal) -> StoreResult<Account> {
        self.inner.credit(number, amount).await
    }

    async fn debit(&self, number: &str, amount: Decimal) -> StoreResult<Account> {
        self.inner.debit(number, amount).await
    }

    async fn transfer(&self, request: &TransferRequest) -> StoreResult<TransferRecord> {
        self.calls.lock().unwrap().push((request.kind, request.id));
        match self.fault_for(request.kind) {
            None => self.inner.transfer(request).await,
            Some(Fault::Reject) => Err(StoreError::Rejected {
                code: ErrorCode::TransferFailed,
                message: format!("injected rejection of {} leg", request.kind),
            }),
            Some(Fault::ApplyThenTimeout) => {
                self.inner.transfer(request).await?;
                Err(StoreError::Timeout("injected timeout after apply".into()))
            }
            Some(Fault::DropThenTimeout) => {
                Err(StoreError::Timeout("injected timeout before apply".into()))
            }
            Some(Fault::Blackout) => {
                *self.blackout.lock().unwrap() = true;
                Err(StoreError::Unreachable("injected blackout".into()))
            }
            Some(Fault::ApplyThenSystemError) => {
                self.inner.transfer(request).await?;
                Err(StoreError::Rejected {
                    code: ErrorCode::DatabaseError,
                    message: format!("injected database error after {} leg", request.kind),
                })
            }
            Some(Fault::ApplyThenBlackout) => {
                self.inner.transfer(request).await?;
                *self.blackout.lock().unwrap() = true;
                Err(StoreError::Timeout("injected timeout after apply".into()))
            }
        }
    }

    async fn transfer_status(&self, id: Uuid) -> StoreResult<Option<TransferRecord>> {
        if *self.blackout.lock().unwrap() {
            return Err(StoreError::Unreachable("injected blackout".into()));
        }
        self.inner.transfer_status(id).await
    }
}

/// `OrderRepository` wrapper failing the first claim
pub struct FaultyOrders {
    inner: Arc<MemoryStore>,
    claim_fault: Mutex<Option<Fault>>,
    blackout: Mutex<bool>,
    pub claims: Mutex<Vec<Uuid>>,
}

impl FaultyOrders {
    pub fn new(inner: Arc<MemoryStore>, fault: Fault) -> Self {
        Self {
            inner,
            claim_fault: Mutex::new(Some(fault)),
            blackout: Mutex::new(false),
            claims: Mutex::new(Vec::new()),
        }
    }

    fn check_blackout(&self) -> StoreResult<()> {
        if *self.blackout.lock().unwrap() {
            return Err(StoreError::Unreachable("injected blackout".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for FaultyOrders {
    async fn create(&self, order: OrderCreate) -> StoreResult<Order> {
        self.inner.create(order).await
    }

    async fn get(&self, id: i64) -> StoreResult<Order> {
        self.check_blackout()?;
        self.inner.get(id).await
    }

    async fn list(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        self.inner.list(filter).await
    }

    async fn claim_pending(&self, id: i64, claim_id: Uuid) -> StoreResult<bool> {
        self.check_blackout()?;
        self.claims.lock().unwrap().push(claim_id);
        let fault = self.claim_fault.lock().unwrap().take();
        match fault {
            None => self.inner.claim_pending(id, claim_id).await,
            Some(Fault::Reject) => Err(StoreError::Rejected {
                code: ErrorCode::OrderNotAvailable,
                message: "injected claim rejection".into(),
            }),
            Some(Fault::ApplyThenTimeout) | Some(Fault::ApplyThenSystemError) => {
                self.inner.claim_pending(id, claim_id).await?;
                Err(StoreError::Timeout("injected timeout after claim".into()))
            }
            Some(Fault::DropThenTimeout) => {
                Err(StoreError::Timeout("injected timeout before claim".into()))
            }
            Some(Fault::Blackout) => {
                *self.blackout.lock().unwrap() = true;
                Err(StoreError::Unreachable("injected blackout".into()))
            }
            Some(Fault::ApplyThenBlackout) => {
                self.inner.claim_pending(id, claim_id).await?;
                *self.blackout.lock().unwrap() = true;
                Err(StoreError::Timeout("injected timeout after claim".into()))
            }
        }
    }

    async fn revert_claim(&self, id: i64, claim_id: Uuid) -> StoreResult<()> {
        self.check_blackout()?;
        self.inner.revert_claim(id, claim_id).await
    }

    async fn finalize(&self, id: i64, claim_id: Uuid, buyer_id: i64) -> StoreResult<Order> {
        self.check_blackout()?;
        self.inner.finalize(id, claim_id, buyer_id).await
    }
}
