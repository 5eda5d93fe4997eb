//! Account Model

use super::currency::{Currency, currency_of};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Single-currency balance record.
///
/// `balance` never goes below zero; inactive accounts are readable but
/// reject every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub number: String,
    pub balance: Decimal,
    pub active: bool,
    pub created_at: i64,
}

impl Account {
    /// Currency encoded in the account number prefix
    pub fn currency(&self) -> Option<Currency> {
        currency_of(&self.number)
    }
}

/// Open a new account in a wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCreate {
    pub currency: Currency,
}

/// Deposit / withdraw payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

/// Activate / deactivate payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}
