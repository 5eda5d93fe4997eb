//! Transfer Model
//!
//! Every committed value movement leaves one `TransferRecord`. The transfer
//! id doubles as an idempotency key: a ledger never applies the same id twice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Why a transfer happened
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    /// Wallet-to-wallet transfer requested directly
    #[default]
    Direct,
    /// Settlement: buyer pays seller in the quote currency
    Payment,
    /// Settlement: seller delivers the base currency to the buyer
    Asset,
    /// Settlement: reversal of a payment leg
    Compensation,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Payment => "payment",
            Self::Asset => "asset",
            Self::Compensation => "compensation",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "payment" => Ok(Self::Payment),
            "asset" => Ok(Self::Asset),
            "compensation" => Ok(Self::Compensation),
            other => Err(format!("unknown transfer kind: {other}")),
        }
    }
}

/// Request to move `amount` from one account to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Idempotency key; generated when the caller omits it
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub from_account: String,
    pub to_account: String,
    pub amount: Decimal,
    #[serde(default)]
    pub kind: TransferKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
}

impl TransferRequest {
    pub fn new(from_account: impl Into<String>, to_account: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_account: from_account.into(),
            to_account: to_account.into(),
            amount,
            kind: TransferKind::Direct,
            order_id: None,
        }
    }

    pub fn with_kind(mut self, kind: TransferKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn for_order(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }
}

/// Committed transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: Uuid,
    pub from_account: String,
    pub to_account: String,
    pub amount: Decimal,
    pub kind: TransferKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    pub created_at: i64,
}

impl TransferRecord {
    /// Record for `request`, committed at `created_at`
    pub fn from_request(request: &TransferRequest, created_at: i64) -> Self {
        Self {
            id: request.id,
            from_account: request.from_account.clone(),
            to_account: request.to_account.clone(),
            amount: request.amount,
            kind: request.kind,
            order_id: request.order_id,
            created_at,
        }
    }
}
