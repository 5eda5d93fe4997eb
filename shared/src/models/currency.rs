//! Currency codes and the account-number convention
//!
//! An account number is `<CODE><SUFFIX>`: a 3-letter uppercase currency code
//! followed by 29 random alphanumerics. Wallet resolution matches on the
//! prefix, so this layout must not change.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Base currency of new wallets unless configured otherwise
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

/// Width of the currency prefix in an account number
pub const CURRENCY_CODE_LEN: usize = 3;

/// Length of the random part of an account number
pub const ACCOUNT_SUFFIX_LEN: usize = 29;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Rejected currency code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid currency code: {0:?}")]
pub struct InvalidCurrency(pub String);

/// A 3-letter uppercase currency code (`USD`, `BTC`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse a currency code. Lowercase input is upper-cased.
    pub fn new(code: &str) -> Result<Self, InvalidCurrency> {
        let code = code.trim();
        if code.len() != CURRENCY_CODE_LEN || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(InvalidCurrency(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self(DEFAULT_BASE_CURRENCY.to_string())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = InvalidCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = InvalidCurrency;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// Generate a fresh account number for `currency`
pub fn generate_account_number(currency: &Currency) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ACCOUNT_SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", currency.as_str(), suffix)
}

/// Currency encoded in an account number's prefix.
///
/// Strict: the prefix must already be uppercase ASCII letters, no case folding.
pub fn currency_of(number: &str) -> Option<Currency> {
    let prefix = number.get(..CURRENCY_CODE_LEN)?;
    if !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    Some(Currency(prefix.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_new() {
        assert_eq!(Currency::new("USD").unwrap().as_str(), "USD");
        assert_eq!(Currency::new("btc").unwrap().as_str(), "BTC");
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("USDT").is_err());
        assert!(Currency::new("U5D").is_err());
        assert!(Currency::new("").is_err());
    }

    #[test]
    fn test_currency_default() {
        assert_eq!(Currency::default(), Currency::new(DEFAULT_BASE_CURRENCY).unwrap());
    }

    #[test]
    fn test_currency_serde() {
        let c: Currency = serde_json::from_str("\"eth\"").unwrap();
        assert_eq!(c.as_str(), "ETH");
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"ETH\"");
        assert!(serde_json::from_str::<Currency>("\"EURO\"").is_err());
    }

    #[test]
    fn test_generate_account_number_layout() {
        let usd = Currency::new("USD").unwrap();
        let number = generate_account_number(&usd);
        assert_eq!(number.len(), CURRENCY_CODE_LEN + ACCOUNT_SUFFIX_LEN);
        assert!(number.starts_with("USD"));
        assert!(number[CURRENCY_CODE_LEN..].bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_account_number_unique() {
        let btc = Currency::new("BTC").unwrap();
        let a = generate_account_number(&btc);
        let b = generate_account_number(&btc);
        assert_ne!(a, b);
    }

    #[test]
    fn test_currency_of() {
        assert_eq!(currency_of("BTCabc").unwrap().as_str(), "BTC");
        assert_eq!(currency_of("USD").unwrap().as_str(), "USD");
        assert!(currency_of("us").is_none());
        assert!(currency_of("usdXYZ").is_none());
        assert!(currency_of("").is_none());
    }
}
