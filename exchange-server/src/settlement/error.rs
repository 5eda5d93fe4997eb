//! Settlement errors

use crate::store::StoreError;
use rust_decimal::Decimal;
use shared::error::ErrorCode;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Where in the saga an error happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStep {
    Load,
    Claim,
    Resolve,
    Payment,
    Asset,
    Compensation,
    Finalize,
}

impl SettlementStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Claim => "claim",
            Self::Resolve => "resolve",
            Self::Payment => "payment",
            Self::Asset => "asset",
            Self::Compensation => "compensation",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for SettlementStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchase failures.
///
/// Every variant except `Inconsistent` and `ClaimStranded` leaves balances
/// exactly as they were before the purchase and the order back in PENDING
/// (or untouched).
///
/// Resolution failures arrive as `Aborted { step: Resolve, .. }` carrying the
/// store error: `WalletNotFound` when the buyer or seller has no wallet at
/// all, `CurrencyNotSupported` when the wallet lacks the currency, and
/// `AccountNotFound`/`AccountInactive` for the account rows themselves.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Order {0} not found")]
    OrderNotFound(i64),

    #[error("Order {0} is not available")]
    OrderNotAvailable(i64),

    #[error("User {seller_id} cannot purchase own order {order_id}")]
    SelfPurchase { order_id: i64, seller_id: i64 },

    #[error("Settlement of order {0} cancelled before any funds moved")]
    Cancelled(i64),

    /// `price * amount` does not fit in a `Decimal`; the order can never settle
    #[error("Order {0}: payment amount overflows")]
    AmountOverflow(i64),

    /// The order is held by this attempt's claim and could not be released.
    /// No funds moved, but the order stays SETTLING until reconciled.
    #[error("Order {order_id}: claim {claim_id} could not be released: {reason}")]
    ClaimStranded {
        order_id: i64,
        claim_id: Uuid,
        reason: String,
    },

    /// Failed before any transfer was attempted
    #[error("Order {order_id}: {step} failed: {source}")]
    Aborted {
        order_id: i64,
        step: SettlementStep,
        #[source]
        source: StoreError,
    },

    /// A leg was rejected; earlier legs were compensated
    #[error("Order {order_id}: {step} leg of {amount} failed: {source}")]
    LegFailed {
        order_id: i64,
        step: SettlementStep,
        amount: Decimal,
        transfer_id: Uuid,
        #[source]
        source: StoreError,
    },

    /// Balances no longer match the order state. Needs manual reconciliation.
    #[error(
        "Order {order_id}: settlement inconsistent at {step} (transfer {transfer_id}, amount {amount}): {reason}"
    )]
    Inconsistent {
        order_id: i64,
        step: SettlementStep,
        amount: Decimal,
        transfer_id: Uuid,
        reason: String,
    },
}

impl SettlementError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::OrderNotFound(_) => ErrorCode::OrderNotFound,
            Self::OrderNotAvailable(_) => ErrorCode::OrderNotAvailable,
            Self::SelfPurchase { .. } => ErrorCode::OrderSelfPurchase,
            Self::Cancelled(_) => ErrorCode::SettlementCancelled,
            Self::AmountOverflow(_) => ErrorCode::ValueOutOfRange,
            Self::ClaimStranded { .. } => ErrorCode::SettlementInconsistent,
            Self::Aborted { source, .. } | Self::LegFailed { source, .. } => source.code(),
            Self::Inconsistent { .. } => ErrorCode::SettlementInconsistent,
        }
    }

    /// Whether the purchase may be attempted again.
    ///
    /// Settlements needing reconciliation are never retried automatically,
    /// and an overflowing order fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Inconsistent { .. } | Self::ClaimStranded { .. } | Self::AmountOverflow(_)
        )
    }

    pub fn order_id(&self) -> i64 {
        match self {
            Self::OrderNotFound(id)
            | Self::OrderNotAvailable(id)
            | Self::Cancelled(id)
            | Self::AmountOverflow(id) => *id,
            Self::SelfPurchase { order_id, .. }
            | Self::ClaimStranded { order_id, .. }
            | Self::Aborted { order_id, .. }
            | Self::LegFailed { order_id, .. }
            | Self::Inconsistent { order_id, .. } => *order_id,
        }
    }
}
