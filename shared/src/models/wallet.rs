//! Wallet Model

use super::currency::{Currency, currency_of};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A user's ordered list of account numbers, one per currency.
///
/// Accounts are separate rows referenced by number, never embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: i64,
    pub accounts: Vec<String>,
    pub created_at: i64,
}

/// Wallet has no account in the requested currency
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("wallet of user {user_id} has no {currency} account")]
pub struct CurrencyNotSupported {
    pub user_id: i64,
    pub currency: Currency,
}

impl Wallet {
    /// First account whose currency prefix matches `currency`.
    ///
    /// Pure lookup over this snapshot.
    pub fn resolve_account(&self, currency: &Currency) -> Result<&str, CurrencyNotSupported> {
        self.accounts
            .iter()
            .find(|number| currency_of(number).as_ref() == Some(currency))
            .map(String::as_str)
            .ok_or_else(|| CurrencyNotSupported {
                user_id: self.user_id,
                currency: currency.clone(),
            })
    }

    pub fn has_currency(&self, currency: &Currency) -> bool {
        self.resolve_account(currency).is_ok()
    }
}

/// Create wallet payload (onboarding)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletCreate {
    pub user_id: i64,
    /// Defaults to the server's configured base currency
    pub base_currency: Option<Currency>,
}
