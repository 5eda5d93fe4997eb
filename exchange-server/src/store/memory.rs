//! In-memory backend
//!
//! Each account sits behind its own `tokio::sync::Mutex`; a transfer locks
//! both accounts in ascending account-number order, checks, then mutates
//! without yielding. Dropping a transfer future therefore never leaves a
//! half-applied transfer behind.

use super::{
    LedgerStore, OrderRepository, StoreError, StoreResult, WalletRepository, credited,
    ensure_positive, replay, validate_transfer,
};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use shared::models::{
    Account, Currency, Order, OrderCreate, OrderFilter, OrderStatus, TransferRecord,
    TransferRequest, Wallet, generate_account_number,
};
use shared::util::now_millis;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

type AccountSlot = Arc<Mutex<Account>>;

/// Ledger, wallets and orders held in process memory
#[derive(Default)]
pub struct MemoryStore {
    accounts: DashMap<String, AccountSlot>,
    transfers: DashMap<Uuid, TransferRecord>,
    wallets: DashMap<i64, Wallet>,
    orders: DashMap<i64, Order>,
    next_account_id: AtomicI64,
    next_order_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, number: &str) -> StoreResult<AccountSlot> {
        self.accounts
            .get(number)
            .map(|slot| slot.value().clone())
            .ok_or_else(|| StoreError::AccountNotFound(number.to_string()))
    }

    /// Insert an account under a fresh number
    fn open(&self, currency: &Currency) -> Account {
        loop {
            let number = generate_account_number(currency);
            if let Entry::Vacant(entry) = self.accounts.entry(number.clone()) {
                let account = Account {
                    id: self.next_account_id.fetch_add(1, Ordering::SeqCst) + 1,
                    number,
                    balance: Decimal::ZERO,
                    active: true,
                    created_at: now_millis(),
                };
                entry.insert(Arc::new(Mutex::new(account.clone())));
                return account;
            }
        }
    }

    /// Number of committed transfers (test helper)
    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }
}

fn ensure_active(account: &Account) -> StoreResult<()> {
    if !account.active {
        return Err(StoreError::AccountInactive(account.number.clone()));
    }
    Ok(())
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn account(&self, number: &str) -> StoreResult<Account> {
        let slot = self.slot(number)?;
        let account = slot.lock().await;
        Ok(account.clone())
    }

    async fn create_account(&self, currency: &Currency) -> StoreResult<Account> {
        Ok(self.open(currency))
    }

    async fn set_active(&self, number: &str, active: bool) -> StoreResult<Account> {
        let slot = self.slot(number)?;
        let mut account = slot.lock().await;
        account.active = active;
        Ok(account.clone())
    }

    async fn credit(&self, number: &str, amount: Decimal) -> StoreResult<Account> {
        ensure_positive(amount)?;
        let slot = self.slot(number)?;
        let mut account = slot.lock().await;
        ensure_active(&account)?;
        account.balance = credited(&account, amount)?;
        Ok(account.clone())
    }

    async fn debit(&self, number: &str, amount: Decimal) -> StoreResult<Account> {
        ensure_positive(amount)?;
        let slot = self.slot(number)?;
        let mut account = slot.lock().await;
        ensure_active(&account)?;
        if account.balance < amount {
            return Err(StoreError::InsufficientFunds(number.to_string()));
        }
        account.balance -= amount;
        Ok(account.clone())
    }

    async fn transfer(&self, request: &TransferRequest) -> StoreResult<TransferRecord> {
        validate_transfer(request)?;
        let from_slot = self.slot(&request.from_account)?;
        let to_slot = self.slot(&request.to_account)?;

        let (mut from, mut to) = if request.from_account < request.to_account {
            let from = from_slot.lock().await;
            let to = to_slot.lock().await;
            (from, to)
        } else {
            let to = to_slot.lock().await;
            let from = from_slot.lock().await;
            (from, to)
        };

        // Checked under the locks so a concurrent replay of the same id waits for us
        if let Some(existing) = self.transfers.get(&request.id) {
            return replay(request, existing.value().clone());
        }

        ensure_active(&from)?;
        ensure_active(&to)?;
        if from.balance < request.amount {
            return Err(StoreError::InsufficientFunds(from.number.clone()));
        }
        let to_balance = credited(&to, request.amount)?;

        match self.transfers.entry(request.id) {
            Entry::Occupied(existing) => replay(request, existing.get().clone()),
            Entry::Vacant(entry) => {
                from.balance -= request.amount;
                to.balance = to_balance;
                let record = TransferRecord::from_request(request, now_millis());
                entry.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn transfer_status(&self, id: Uuid) -> StoreResult<Option<TransferRecord>> {
        Ok(self.transfers.get(&id).map(|record| record.value().clone()))
    }
}

#[async_trait]
impl WalletRepository for MemoryStore {
    async fn wallet_by_user(&self, user_id: i64) -> StoreResult<Wallet> {
        self.wallets
            .get(&user_id)
            .map(|wallet| wallet.value().clone())
            .ok_or(StoreError::WalletNotFound(user_id))
    }

    async fn create_wallet(&self, user_id: i64, base_currency: &Currency) -> StoreResult<Wallet> {
        match self.wallets.entry(user_id) {
            Entry::Occupied(_) => Err(StoreError::WalletAlreadyExists(user_id)),
            Entry::Vacant(entry) => {
                let account = self.open(base_currency);
                let wallet = Wallet {
                    user_id,
                    accounts: vec![account.number],
                    created_at: now_millis(),
                };
                entry.insert(wallet.clone());
                Ok(wallet)
            }
        }
    }

    async fn add_account(&self, user_id: i64, currency: &Currency) -> StoreResult<Account> {
        let mut wallet = self
            .wallets
            .get_mut(&user_id)
            .ok_or(StoreError::WalletNotFound(user_id))?;
        if wallet.has_currency(currency) {
            return Err(StoreError::CurrencyAccountExists {
                user_id,
                currency: currency.clone(),
            });
        }
        let account = self.open(currency);
        wallet.accounts.push(account.number.clone());
        Ok(account)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, order: OrderCreate) -> StoreResult<Order> {
        let now = now_millis();
        let order = Order {
            id: self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1,
            seller_id: order.seller_id,
            buyer_id: None,
            base_currency: order.base_currency,
            amount: order.amount,
            price: order.price,
            quote_currency: order.quote_currency,
            status: OrderStatus::Pending,
            claim_id: None,
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: i64) -> StoreResult<Order> {
        self.orders
            .get(&id)
            .map(|order| order.value().clone())
            .ok_or(StoreError::OrderNotFound(id))
    }

    async fn list(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|order| filter.matches(order.value()))
            .map(|order| order.value().clone())
            .collect();
        orders.sort_by_key(|order| order.id);
        Ok(orders
            .into_iter()
            .skip(filter.page_offset() as usize)
            .take(filter.page_size() as usize)
            .collect())
    }

    async fn claim_pending(&self, id: i64, claim_id: Uuid) -> StoreResult<bool> {
        // get_mut holds the shard write lock: check and set are one step
        let Some(mut order) = self.orders.get_mut(&id) else {
            return Ok(false);
        };
        match order.status {
            OrderStatus::Pending => {
                order.status = OrderStatus::Settling;
                order.claim_id = Some(claim_id);
                order.updated_at = now_millis();
                Ok(true)
            }
            OrderStatus::Settling => Ok(order.claim_id == Some(claim_id)),
            OrderStatus::Completed => Ok(false),
        }
    }

    async fn revert_claim(&self, id: i64, claim_id: Uuid) -> StoreResult<()> {
        if let Some(mut order) = self.orders.get_mut(&id)
            && order.status == OrderStatus::Settling
            && order.claim_id == Some(claim_id)
        {
            order.status = OrderStatus::Pending;
            order.claim_id = None;
            order.updated_at = now_millis();
        }
        Ok(())
    }

    async fn finalize(&self, id: i64, claim_id: Uuid, buyer_id: i64) -> StoreResult<Order> {
        let mut order = self
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        if order.claim_id != Some(claim_id) {
            return Err(StoreError::OrderNotAvailable(id));
        }
        match (order.status, order.buyer_id) {
            (OrderStatus::Settling, _) => {
                order.status = OrderStatus::Completed;
                order.buyer_id = Some(buyer_id);
                order.updated_at = now_millis();
                Ok(order.clone())
            }
            (OrderStatus::Completed, Some(existing)) if existing == buyer_id => Ok(order.clone()),
            _ => Err(StoreError::OrderNotAvailable(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::models::TransferKind;

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    async fn funded(store: &MemoryStore, amount: Decimal) -> Account {
        let account = store.create_account(&usd()).await.unwrap();
        if amount > Decimal::ZERO {
            store.credit(&account.number, amount).await.unwrap();
        }
        store.account(&account.number).await.unwrap()
    }

    #[tokio::test]
    async fn test_credit_and_debit() {
        let store = MemoryStore::new();
        let acc = funded(&store, dec!(10)).await;
        assert_eq!(acc.balance, dec!(10));

        let acc = store.debit(&acc.number, dec!(4)).await.unwrap();
        assert_eq!(acc.balance, dec!(6));

        let err = store.debit(&acc.number, dec!(7)).await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds(_)));
        assert_eq!(store.account(&acc.number).await.unwrap().balance, dec!(6));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amounts() {
        let store = MemoryStore::new();
        let acc = funded(&store, dec!(1)).await;
        assert!(matches!(
            store.credit(&acc.number, dec!(0)).await,
            Err(StoreError::InvalidAmount(_))
        ));
        assert!(matches!(
            store.debit(&acc.number, dec!(-1)).await,
            Err(StoreError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_inactive_account_is_read_only() {
        let store = MemoryStore::new();
        let acc = funded(&store, dec!(5)).await;
        store.set_active(&acc.number, false).await.unwrap();

        assert!(store.account(&acc.number).await.is_ok());
        assert!(matches!(
            store.credit(&acc.number, dec!(1)).await,
            Err(StoreError::AccountInactive(_))
        ));
        assert!(matches!(
            store.debit(&acc.number, dec!(1)).await,
            Err(StoreError::AccountInactive(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.credit("USDnope", dec!(1)).await,
            Err(StoreError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_transfer_moves_funds_and_records() {
        let store = MemoryStore::new();
        let a = funded(&store, dec!(100)).await;
        let b = funded(&store, dec!(0)).await;

        let req = TransferRequest::new(&a.number, &b.number, dec!(30));
        let record = store.transfer(&req).await.unwrap();
        assert_eq!(record.id, req.id);

        assert_eq!(store.account(&a.number).await.unwrap().balance, dec!(70));
        assert_eq!(store.account(&b.number).await.unwrap().balance, dec!(30));
        assert_eq!(store.transfer_status(req.id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_transfer_replay_is_idempotent() {
        let store = MemoryStore::new();
        let a = funded(&store, dec!(100)).await;
        let b = funded(&store, dec!(0)).await;

        let req = TransferRequest::new(&a.number, &b.number, dec!(30));
        let first = store.transfer(&req).await.unwrap();
        let second = store.transfer(&req).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.account(&a.number).await.unwrap().balance, dec!(70));
        assert_eq!(store.transfer_count(), 1);

        let mut reused = req.clone().with_kind(TransferKind::Compensation);
        reused.amount = dec!(1);
        assert!(matches!(
            store.transfer(&reused).await,
            Err(StoreError::TransferConflict(_))
        ));
    }

    #[tokio::test]
    async fn test_overflowing_credit_leaves_balance() {
        let store = MemoryStore::new();
        let a = funded(&store, Decimal::MAX).await;
        let b = funded(&store, dec!(1)).await;

        assert!(matches!(
            store.credit(&a.number, dec!(1)).await,
            Err(StoreError::AmountOutOfRange(_))
        ));
        assert!(matches!(
            store
                .transfer(&TransferRequest::new(&b.number, &a.number, dec!(1)))
                .await,
            Err(StoreError::AmountOutOfRange(_))
        ));
        assert_eq!(store.account(&a.number).await.unwrap().balance, Decimal::MAX);
        assert_eq!(store.account(&b.number).await.unwrap().balance, dec!(1));
        assert_eq!(store.transfer_count(), 0);
    }

    #[tokio::test]
    async fn test_transfer_to_inactive_leaves_balances() {
        let store = MemoryStore::new();
        let a = funded(&store, dec!(50)).await;
        let b = funded(&store, dec!(0)).await;
        store.set_active(&b.number, false).await.unwrap();

        let err = store
            .transfer(&TransferRequest::new(&a.number, &b.number, dec!(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AccountInactive(_)));
        assert_eq!(store.account(&a.number).await.unwrap().balance, dec!(50));
        assert_eq!(store.account(&b.number).await.unwrap().balance, dec!(0));
        assert_eq!(store.transfer_count(), 0);
    }

    #[tokio::test]
    async fn test_wallet_lifecycle() {
        let store = MemoryStore::new();
        let wallet = store.create_wallet(1, &usd()).await.unwrap();
        assert_eq!(wallet.accounts.len(), 1);
        assert!(wallet.accounts[0].starts_with("USD"));

        assert!(matches!(
            store.create_wallet(1, &usd()).await,
            Err(StoreError::WalletAlreadyExists(1))
        ));

        let btc = Currency::new("BTC").unwrap();
        let account = store.add_account(1, &btc).await.unwrap();
        assert!(account.number.starts_with("BTC"));
        assert!(matches!(
            store.add_account(1, &btc).await,
            Err(StoreError::CurrencyAccountExists { .. })
        ));

        let wallet = store.wallet_by_user(1).await.unwrap();
        assert_eq!(wallet.resolve_account(&btc).unwrap(), account.number);
        assert!(matches!(
            store.wallet_by_user(2).await,
            Err(StoreError::WalletNotFound(2))
        ));
    }

    fn listing(seller_id: i64) -> OrderCreate {
        OrderCreate {
            seller_id,
            base_currency: Currency::new("BTC").unwrap(),
            amount: dec!(1),
            price: dec!(50000),
            quote_currency: usd(),
        }
    }

    #[tokio::test]
    async fn test_order_claim_is_exclusive() {
        let store = MemoryStore::new();
        let order = store.create(listing(1)).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        let (mine, theirs) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(store.claim_pending(order.id, mine).await.unwrap());
        assert!(store.claim_pending(order.id, mine).await.unwrap());
        assert!(!store.claim_pending(order.id, theirs).await.unwrap());
        let claimed = store.get(order.id).await.unwrap();
        assert_eq!(claimed.status, OrderStatus::Settling);
        assert_eq!(claimed.claim_id, Some(mine));

        // Only the holder can release it
        store.revert_claim(order.id, theirs).await.unwrap();
        assert_eq!(store.get(order.id).await.unwrap().status, OrderStatus::Settling);
        store.revert_claim(order.id, mine).await.unwrap();
        let released = store.get(order.id).await.unwrap();
        assert_eq!(released.status, OrderStatus::Pending);
        assert_eq!(released.claim_id, None);

        assert!(!store.claim_pending(999, mine).await.unwrap());
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent() {
        let store = MemoryStore::new();
        let order = store.create(listing(1)).await.unwrap();
        let claim = Uuid::new_v4();
        assert!(matches!(
            store.finalize(order.id, claim, 2).await,
            Err(StoreError::OrderNotAvailable(_))
        ));

        store.claim_pending(order.id, claim).await.unwrap();
        assert!(store.finalize(order.id, Uuid::new_v4(), 2).await.is_err());
        let done = store.finalize(order.id, claim, 2).await.unwrap();
        assert_eq!(done.status, OrderStatus::Completed);
        assert_eq!(done.buyer_id, Some(2));

        let again = store.finalize(order.id, claim, 2).await.unwrap();
        assert_eq!(again, done);
        assert!(store.finalize(order.id, claim, 3).await.is_err());

        // revert never reopens a completed order
        store.revert_claim(order.id, claim).await.unwrap();
        assert_eq!(store.get(order.id).await.unwrap().status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let store = MemoryStore::new();
        for seller in [1, 1, 2] {
            store.create(listing(seller)).await.unwrap();
        }

        let by_seller = OrderFilter {
            seller_id: Some(1),
            ..Default::default()
        };
        assert_eq!(store.list(&by_seller).await.unwrap().len(), 2);

        let paged = OrderFilter {
            limit: Some(2),
            offset: Some(1),
            ..Default::default()
        };
        let page = store.list(&paged).await.unwrap();
        assert_eq!(page.iter().map(|o| o.id).collect::<Vec<_>>(), vec![2, 3]);
    }
}
