//! Sell-order Model

use super::currency::Currency;
use super::transfer::TransferRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default page size for order listings
pub const DEFAULT_ORDER_PAGE: i64 = 20;
/// Maximum page size for order listings
pub const MAX_ORDER_PAGE: i64 = 100;

/// Order status
///
/// `PENDING -> SETTLING -> COMPLETED`, or `SETTLING -> PENDING` when a
/// settlement aborts before any funds stay moved. `SETTLING` is the claim
/// marker: whoever flips `PENDING -> SETTLING` owns the settlement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Settling,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Settling => "SETTLING",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SETTLING" => Ok(Self::Settling),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// A sell offer: `amount` units of `base_currency` at `price` units of
/// `quote_currency` each.
///
/// `buyer_id` is set if and only if `status == Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub seller_id: i64,
    pub buyer_id: Option<i64>,
    pub base_currency: Currency,
    pub amount: Decimal,
    pub price: Decimal,
    pub quote_currency: Currency,
    pub status: OrderStatus,
    /// Settlement attempt holding the order; set while SETTLING and kept once COMPLETED
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Quote-currency amount the buyer pays, `None` if it overflows a `Decimal`
    pub fn exchange_amount(&self) -> Option<Decimal> {
        self.price.checked_mul(self.amount)
    }

    pub fn is_available(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// Create order payload (listing)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub seller_id: i64,
    pub base_currency: Currency,
    pub amount: Decimal,
    pub price: Decimal,
    pub quote_currency: Currency,
}

impl OrderCreate {
    /// See [`Order::exchange_amount`]
    pub fn exchange_amount(&self) -> Option<Decimal> {
        self.price.checked_mul(self.amount)
    }
}

/// Listing filter; every field is optional and they combine with AND
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub base_currency: Option<Currency>,
    pub quote_currency: Option<Currency>,
    pub seller_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| s == order.status)
            && self
                .base_currency
                .as_ref()
                .is_none_or(|c| *c == order.base_currency)
            && self
                .quote_currency
                .as_ref()
                .is_none_or(|c| *c == order.quote_currency)
            && self.seller_id.is_none_or(|id| id == order.seller_id)
    }

    /// Page size clamped to `1..=MAX_ORDER_PAGE`
    pub fn page_size(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_ORDER_PAGE)
            .clamp(1, MAX_ORDER_PAGE)
    }

    pub fn page_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Purchase payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub buyer_id: i64,
}

/// Purchase result returned to the request layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub status: OrderStatus,
    pub order: Order,
    /// Payment leg, then asset leg
    pub transfers: Vec<TransferRecord>,
}
