//! Purchase settlement
//!
//! claim -> resolve -> payment leg -> asset leg -> finalize, with the payment
//! leg compensated when the asset leg fails. Legs are strictly sequential.
//!
//! A leg whose outcome is ambiguous (timeout, lost connection) is read back
//! by its transfer id before anything else happens. Compensation is never
//! issued blind.
//!
//! Each attempt claims the order under its own claim id, so an ambiguous
//! claim can be read back and only ever the attempt's own claim is released.

use super::error::{SettlementError, SettlementStep};
use crate::store::{LedgerStore, OrderRepository, StoreError, StoreResult, WalletRepository};
use shared::models::{Order, TransferKind, TransferRecord, TransferRequest};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Attempts at the compensating transfer (same idempotency key each time)
const COMPENSATION_ATTEMPTS: u32 = 3;
/// Attempts at finalizing an order whose legs both committed
const FINALIZE_ATTEMPTS: u32 = 3;
/// Attempts at returning an aborted order to PENDING
const RELEASE_ATTEMPTS: u32 = 3;

/// Result of a completed purchase
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub order: Order,
    pub payment_transfer: TransferRecord,
    pub asset_transfer: TransferRecord,
}

/// Accounts touched by one settlement
#[derive(Debug, Clone)]
struct Legs {
    buyer_quote: String,
    seller_quote: String,
    seller_base: String,
    buyer_base: String,
}

impl Legs {
    fn numbers(&self) -> [&str; 4] {
        [
            &self.buyer_quote,
            &self.seller_quote,
            &self.seller_base,
            &self.buyer_base,
        ]
    }
}

enum LegOutcome {
    Committed(TransferRecord),
    /// Definitely not applied
    Failed(StoreError),
    /// Neither the call nor its read-back could tell
    Unknown(String),
}

/// Orchestrates order purchases over injected stores
pub struct SettlementSaga {
    ledger: Arc<dyn LedgerStore>,
    wallets: Arc<dyn WalletRepository>,
    orders: Arc<dyn OrderRepository>,
    call_timeout: Duration,
}

impl SettlementSaga {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        wallets: Arc<dyn WalletRepository>,
        orders: Arc<dyn OrderRepository>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            wallets,
            orders,
            call_timeout,
        }
    }

    /// Purchase `order_id` for `buyer_id`.
    ///
    /// `cancel` is honored until the payment leg starts; from then on the
    /// saga runs to a terminal state.
    #[instrument(name = "settlement", skip(self, cancel))]
    pub async fn purchase_order(
        &self,
        order_id: i64,
        buyer_id: i64,
        cancel: &CancellationToken,
    ) -> Result<SettlementOutcome, SettlementError> {
        if cancel.is_cancelled() {
            return Err(SettlementError::Cancelled(order_id));
        }

        let order = self
            .call("get_order", self.orders.get(order_id))
            .await
            .map_err(|source| match source {
                StoreError::OrderNotFound(_) => SettlementError::OrderNotFound(order_id),
                source => SettlementError::Aborted {
                    order_id,
                    step: SettlementStep::Load,
                    source,
                },
            })?;

        if order.seller_id == buyer_id {
            return Err(SettlementError::SelfPurchase {
                order_id,
                seller_id: order.seller_id,
            });
        }
        if !order.is_available() {
            return Err(SettlementError::OrderNotAvailable(order_id));
        }
        let Some(total) = order.exchange_amount() else {
            warn!(price = %order.price, amount = %order.amount, "Payment amount overflows");
            return Err(SettlementError::AmountOverflow(order_id));
        };
        if cancel.is_cancelled() {
            return Err(SettlementError::Cancelled(order_id));
        }

        let claim_id = Uuid::new_v4();
        let claimed = match self
            .call("claim_pending", self.orders.claim_pending(order_id, claim_id))
            .await
        {
            Ok(claimed) => claimed,
            Err(err) if err.is_ambiguous() => self.confirm_claim(order_id, claim_id, err).await?,
            Err(source) => {
                return Err(SettlementError::Aborted {
                    order_id,
                    step: SettlementStep::Claim,
                    source,
                });
            }
        };
        if !claimed {
            return Err(SettlementError::OrderNotAvailable(order_id));
        }
        debug!(%claim_id, "Order claimed");

        let legs = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.release(order_id, claim_id).await?;
                return Err(SettlementError::Cancelled(order_id));
            }
            resolved = self.resolve(&order, buyer_id) => match resolved {
                Ok(legs) => legs,
                Err(source) => {
                    self.release(order_id, claim_id).await?;
                    return Err(SettlementError::Aborted {
                        order_id,
                        step: SettlementStep::Resolve,
                        source,
                    });
                }
            }
        };
        if cancel.is_cancelled() {
            self.release(order_id, claim_id).await?;
            return Err(SettlementError::Cancelled(order_id));
        }

        let payment_request = TransferRequest::new(&legs.buyer_quote, &legs.seller_quote, total)
            .with_kind(TransferKind::Payment)
            .for_order(order_id);
        let payment = match self.execute_leg(SettlementStep::Payment, &payment_request).await {
            LegOutcome::Committed(record) => record,
            LegOutcome::Failed(source) => {
                self.release(order_id, claim_id).await?;
                return Err(SettlementError::LegFailed {
                    order_id,
                    step: SettlementStep::Payment,
                    amount: payment_request.amount,
                    transfer_id: payment_request.id,
                    source,
                });
            }
            LegOutcome::Unknown(reason) => {
                return Err(inconsistent(
                    order_id,
                    SettlementStep::Payment,
                    &payment_request,
                    reason,
                ));
            }
        };

        let asset_request = TransferRequest::new(&legs.seller_base, &legs.buyer_base, order.amount)
            .with_kind(TransferKind::Asset)
            .for_order(order_id);
        let asset = match self.execute_leg(SettlementStep::Asset, &asset_request).await {
            LegOutcome::Committed(record) => record,
            LegOutcome::Failed(source) => {
                warn!(error = %source, "Asset leg failed, compensating payment");
                self.compensate(order_id, &payment).await?;
                self.release(order_id, claim_id).await?;
                return Err(SettlementError::LegFailed {
                    order_id,
                    step: SettlementStep::Asset,
                    amount: asset_request.amount,
                    transfer_id: asset_request.id,
                    source,
                });
            }
            LegOutcome::Unknown(reason) => {
                return Err(inconsistent(
                    order_id,
                    SettlementStep::Asset,
                    &asset_request,
                    reason,
                ));
            }
        };

        let order = self
            .finalize(order_id, claim_id, buyer_id, &asset_request)
            .await?;
        info!(
            payment_transfer = %payment.id,
            asset_transfer = %asset.id,
            "Order settled"
        );

        Ok(SettlementOutcome {
            order,
            payment_transfer: payment,
            asset_transfer: asset,
        })
    }

    /// Read the order back after a claim whose outcome is unknown.
    ///
    /// `Ok(true)` when our claim landed, `Ok(false)` when another attempt
    /// holds the order.
    async fn confirm_claim(
        &self,
        order_id: i64,
        claim_id: Uuid,
        err: StoreError,
    ) -> Result<bool, SettlementError> {
        warn!(error = %err, %claim_id, "Claim outcome unknown, reading back");
        match self.call("get_order", self.orders.get(order_id)).await {
            Ok(order) if order.claim_id == Some(claim_id) => {
                info!(%claim_id, "Claim landed despite error");
                Ok(true)
            }
            Ok(order) if order.is_available() => Err(SettlementError::Aborted {
                order_id,
                step: SettlementStep::Claim,
                source: err,
            }),
            Ok(_) => Ok(false),
            Err(read_err) => {
                // Releasing is keyed on claim_id and never frees somebody else's claim
                warn!(error = %read_err, "Claim read-back failed, releasing");
                self.release(order_id, claim_id).await?;
                Err(SettlementError::Aborted {
                    order_id,
                    step: SettlementStep::Claim,
                    source: err,
                })
            }
        }
    }

    /// Resolve all four accounts and reject inactive ones before any funds move
    async fn resolve(&self, order: &Order, buyer_id: i64) -> StoreResult<Legs> {
        let seller = self
            .call("wallet_by_user", self.wallets.wallet_by_user(order.seller_id))
            .await?;
        let buyer = self
            .call("wallet_by_user", self.wallets.wallet_by_user(buyer_id))
            .await?;

        let legs = Legs {
            buyer_quote: buyer.resolve_account(&order.quote_currency)?.to_string(),
            seller_quote: seller.resolve_account(&order.quote_currency)?.to_string(),
            seller_base: seller.resolve_account(&order.base_currency)?.to_string(),
            buyer_base: buyer.resolve_account(&order.base_currency)?.to_string(),
        };

        for number in legs.numbers() {
            let account = self.call("account", self.ledger.account(number)).await?;
            if !account.active {
                return Err(StoreError::AccountInactive(account.number));
            }
        }
        Ok(legs)
    }

    #[instrument(skip(self, request), fields(leg = %step, amount = %request.amount, transfer_id = %request.id))]
    async fn execute_leg(&self, step: SettlementStep, request: &TransferRequest) -> LegOutcome {
        let err = match self.call("transfer", self.ledger.transfer(request)).await {
            Ok(record) => return LegOutcome::Committed(record),
            Err(err) if !err.is_ambiguous() => return LegOutcome::Failed(err),
            Err(err) => err,
        };

        warn!(error = %err, "Leg outcome unknown, reading back");
        match self
            .call("transfer_status", self.ledger.transfer_status(request.id))
            .await
        {
            Ok(Some(record)) => {
                info!("Leg committed despite error");
                LegOutcome::Committed(record)
            }
            Ok(None) => LegOutcome::Failed(err),
            Err(read_err) => LegOutcome::Unknown(format!("{err}; read-back failed: {read_err}")),
        }
    }

    /// Reverse the payment leg. Failing here leaves the books inconsistent.
    async fn compensate(
        &self,
        order_id: i64,
        payment: &TransferRecord,
    ) -> Result<TransferRecord, SettlementError> {
        let request = TransferRequest::new(&payment.to_account, &payment.from_account, payment.amount)
            .with_kind(TransferKind::Compensation)
            .for_order(order_id);

        let mut last_error = String::new();
        for attempt in 1..=COMPENSATION_ATTEMPTS {
            match self.execute_leg(SettlementStep::Compensation, &request).await {
                LegOutcome::Committed(record) => return Ok(record),
                LegOutcome::Failed(err) => {
                    warn!(attempt, error = %err, "Compensation failed");
                    let definite = !err.is_ambiguous();
                    last_error = err.to_string();
                    if definite {
                        break;
                    }
                }
                LegOutcome::Unknown(reason) => {
                    warn!(attempt, %reason, "Compensation outcome unknown");
                    last_error = reason;
                }
            }
        }

        Err(inconsistent(
            order_id,
            SettlementStep::Compensation,
            &request,
            format!("asset leg failed and payment could not be reversed: {last_error}"),
        ))
    }

    /// Mark the order COMPLETED. Both legs are committed at this point.
    async fn finalize(
        &self,
        order_id: i64,
        claim_id: Uuid,
        buyer_id: i64,
        asset: &TransferRequest,
    ) -> Result<Order, SettlementError> {
        let mut last_error = String::new();
        for attempt in 1..=FINALIZE_ATTEMPTS {
            match self
                .call("finalize", self.orders.finalize(order_id, claim_id, buyer_id))
                .await
            {
                Ok(order) => return Ok(order),
                Err(err) => {
                    warn!(attempt, error = %err, "Finalize failed");
                    last_error = err.to_string();
                }
            }
        }

        Err(inconsistent(
            order_id,
            SettlementStep::Finalize,
            asset,
            format!("both legs committed but order not finalized: {last_error}"),
        ))
    }

    /// Return the order to PENDING if `claim_id` still holds it
    async fn release(&self, order_id: i64, claim_id: Uuid) -> Result<(), SettlementError> {
        let mut last_error = String::new();
        for attempt in 1..=RELEASE_ATTEMPTS {
            match self
                .call("revert_claim", self.orders.revert_claim(order_id, claim_id))
                .await
            {
                Ok(()) => {
                    debug!("Order claim reverted");
                    return Ok(());
                }
                Err(err) => {
                    warn!(attempt, error = %err, "Failed to revert order claim");
                    last_error = err.to_string();
                }
            }
        }

        error!(
            order_id,
            %claim_id,
            reason = %last_error,
            "Order left SETTLING after an aborted settlement, manual release required"
        );
        Err(SettlementError::ClaimStranded {
            order_id,
            claim_id,
            reason: last_error,
        })
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(format!(
                "{operation} exceeded {}ms",
                self.call_timeout.as_millis()
            ))),
        }
    }
}

fn inconsistent(
    order_id: i64,
    step: SettlementStep,
    request: &TransferRequest,
    reason: String,
) -> SettlementError {
    error!(
        order_id,
        leg = %step,
        amount = %request.amount,
        transfer_id = %request.id,
        from_account = %request.from_account,
        to_account = %request.to_account,
        %reason,
        "Settlement inconsistent, manual reconciliation required"
    );
    SettlementError::Inconsistent {
        order_id,
        step,
        amount: request.amount,
        transfer_id: request.id,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use shared::models::{Currency, OrderCreate, OrderStatus};

    fn currency(code: &str) -> Currency {
        Currency::new(code).unwrap()
    }

    async fn funded(store: &MemoryStore, user_id: i64, usd: Decimal, btc: Decimal) {
        store.create_wallet(user_id, &currency("USD")).await.unwrap();
        let btc_account = store.add_account(user_id, &currency("BTC")).await.unwrap();
        let wallet = store.wallet_by_user(user_id).await.unwrap();
        if usd > dec!(0) {
            store.credit(&wallet.accounts[0], usd).await.unwrap();
        }
        if btc > dec!(0) {
            store.credit(&btc_account.number, btc).await.unwrap();
        }
    }

    async fn setup() -> (Arc<MemoryStore>, SettlementSaga, Order) {
        let store = Arc::new(MemoryStore::new());
        funded(&store, 1, dec!(0), dec!(1)).await;
        funded(&store, 2, dec!(60000), dec!(0)).await;
        let order = store
            .create(OrderCreate {
                seller_id: 1,
                base_currency: currency("BTC"),
                amount: dec!(1),
                price: dec!(50000),
                quote_currency: currency("USD"),
            })
            .await
            .unwrap();
        let saga = SettlementSaga::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Duration::from_secs(1),
        );
        (store, saga, order)
    }

    #[tokio::test]
    async fn test_purchase_records_both_legs() {
        let (store, saga, order) = setup().await;
        let outcome = saga
            .purchase_order(order.id, 2, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.order.status, OrderStatus::Completed);
        assert_eq!(outcome.order.buyer_id, Some(2));
        assert_eq!(outcome.payment_transfer.kind, TransferKind::Payment);
        assert_eq!(outcome.payment_transfer.amount, dec!(50000));
        assert_eq!(outcome.asset_transfer.kind, TransferKind::Asset);
        assert_eq!(outcome.asset_transfer.order_id, Some(order.id));
        assert_eq!(store.transfer_count(), 2);
    }

    #[tokio::test]
    async fn test_self_purchase_rejected() {
        let (_, saga, order) = setup().await;
        let err = saga
            .purchase_order(order.id, 1, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::SelfPurchase { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_claim_leaves_order_pending() {
        let (store, saga, order) = setup().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = saga.purchase_order(order.id, 2, &cancel).await.unwrap_err();
        assert!(matches!(err, SettlementError::Cancelled(_)));
        assert_eq!(store.get(order.id).await.unwrap().status, OrderStatus::Pending);
        assert_eq!(store.transfer_count(), 0);
    }

    #[tokio::test]
    async fn test_overflowing_order_never_claimed() {
        let (store, saga, _) = setup().await;
        let order = store
            .create(OrderCreate {
                seller_id: 1,
                base_currency: currency("BTC"),
                amount: dec!(2),
                price: Decimal::MAX,
                quote_currency: currency("USD"),
            })
            .await
            .unwrap();

        let err = saga
            .purchase_order(order.id, 2, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::AmountOverflow(id) if id == order.id));
        assert!(!err.is_retryable());

        let order = store.get(order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.claim_id, None);
        assert_eq!(store.transfer_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_currency_reverts_claim() {
        let (store, saga, _) = setup().await;
        let order = store
            .create(OrderCreate {
                seller_id: 1,
                base_currency: currency("ETH"),
                amount: dec!(2),
                price: dec!(10),
                quote_currency: currency("USD"),
            })
            .await
            .unwrap();

        let err = saga
            .purchase_order(order.id, 2, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), shared::error::ErrorCode::CurrencyNotSupported);
        assert_eq!(store.get(order.id).await.unwrap().status, OrderStatus::Pending);
    }
}
