//! Order service: listing, lookup and purchase

use crate::error::ServiceResult;
use crate::settlement::{SettlementOutcome, SettlementSaga};
use crate::store::{OrderRepository, StoreError, WalletRepository};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderCreate, OrderFilter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    wallets: Arc<dyn WalletRepository>,
    saga: SettlementSaga,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        wallets: Arc<dyn WalletRepository>,
        saga: SettlementSaga,
    ) -> Self {
        Self {
            orders,
            wallets,
            saga,
        }
    }

    /// List a sell order. New orders always start PENDING.
    pub async fn create(&self, payload: OrderCreate) -> ServiceResult<Order> {
        validate_order(&payload)?;

        // The seller must be able to deliver what they list
        let wallet = self.wallets.wallet_by_user(payload.seller_id).await?;
        wallet
            .resolve_account(&payload.base_currency)
            .map_err(StoreError::from)?;

        let order = self.orders.create(payload).await?;
        tracing::info!(
            order_id = order.id,
            seller_id = order.seller_id,
            pair = %format!("{}/{}", order.base_currency, order.quote_currency),
            amount = %order.amount,
            price = %order.price,
            "Order listed"
        );
        Ok(order)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Order> {
        Ok(self.orders.get(id).await?)
    }

    pub async fn list(&self, filter: &OrderFilter) -> ServiceResult<Vec<Order>> {
        Ok(self.orders.list(filter).await?)
    }

    /// Settle `order_id` for `buyer_id`
    pub async fn purchase(
        &self,
        order_id: i64,
        buyer_id: i64,
        cancel: &CancellationToken,
    ) -> ServiceResult<SettlementOutcome> {
        Ok(self.saga.purchase_order(order_id, buyer_id, cancel).await?)
    }
}

fn validate_order(payload: &OrderCreate) -> Result<(), AppError> {
    if payload.amount <= Decimal::ZERO {
        return Err(AppError::with_message(
            ErrorCode::OrderInvalidAmount,
            format!("Order amount must be positive, got {}", payload.amount),
        )
        .with_detail("field", "amount"));
    }
    if payload.price <= Decimal::ZERO {
        return Err(AppError::with_message(
            ErrorCode::OrderInvalidPrice,
            format!("Order price must be positive, got {}", payload.price),
        )
        .with_detail("field", "price"));
    }
    if payload.base_currency == payload.quote_currency {
        return Err(AppError::with_message(
            ErrorCode::OrderInvalidCurrencyPair,
            format!(
                "Base and quote currency must differ, both are {}",
                payload.base_currency
            ),
        ));
    }
    if payload.exchange_amount().is_none() {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!(
                "Order total {} x {} is out of range",
                payload.amount, payload.price
            ),
        )
        .with_detail("field", "price"));
    }
    Ok(())
}
