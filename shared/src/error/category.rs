//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Account errors
/// - 2xxx: Wallet errors
/// - 4xxx: Order errors
/// - 5xxx: Transfer / settlement errors
/// - 9xxx: System errors
///
/// Unused ranges (3xxx, 6xxx-8xxx) fall back to `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Account errors (1xxx)
    Account,
    /// Wallet errors (2xxx)
    Wallet,
    /// Order errors (4xxx)
    Order,
    /// Transfer / settlement errors (5xxx)
    Transfer,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Category of a raw code, by thousands range
    pub fn from_code(code: u16) -> Self {
        match code {
            1000..2000 => Self::Account,
            2000..3000 => Self::Wallet,
            4000..5000 => Self::Order,
            5000..6000 => Self::Transfer,
            9000.. => Self::System,
            _ => Self::General,
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
