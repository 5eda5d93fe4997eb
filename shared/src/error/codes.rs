//! Unified error codes for the exchange
//!
//! This module defines all error codes used across exchange-server,
//! exchange-client and API consumers. Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Account errors
//! - 2xxx: Wallet errors
//! - 4xxx: Order errors
//! - 5xxx: Transfer / settlement errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Account ====================
    /// Account not found
    AccountNotFound = 1001,
    /// Account is inactive
    AccountInactive = 1002,
    /// Balance lower than the requested debit
    InsufficientFunds = 1003,
    /// Amount must be positive
    InvalidAmount = 1004,
    /// Source and destination account are the same
    SameAccount = 1005,
    /// Account number collision
    AccountNumberExists = 1006,

    // ==================== 2xxx: Wallet ====================
    /// Wallet not found
    WalletNotFound = 2001,
    /// User already has a wallet
    WalletAlreadyExists = 2002,
    /// Wallet has no account in the requested currency
    CurrencyNotSupported = 2003,
    /// Wallet already has an account in this currency
    CurrencyAccountExists = 2004,
    /// Currency code is malformed
    InvalidCurrency = 2005,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is not pending (already settled or being settled)
    OrderNotAvailable = 4002,
    /// Base and quote currency are the same
    OrderInvalidCurrencyPair = 4003,
    /// Order amount must be positive
    OrderInvalidAmount = 4004,
    /// Order price must be positive
    OrderInvalidPrice = 4005,
    /// Buyer and seller are the same user
    OrderSelfPurchase = 4006,

    // ==================== 5xxx: Transfer / Settlement ====================
    /// Transfer failed
    TransferFailed = 5001,
    /// Transfer not found
    TransferNotFound = 5002,
    /// Transfer outcome unknown (acknowledgement lost)
    TransferOutcomeUnknown = 5003,
    /// Balances and order state are out of sync; manual reconciliation needed
    SettlementInconsistent = 5004,
    /// Settlement cancelled before any funds moved
    SettlementCancelled = 5005,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Upstream service returned an unexpected response
    UpstreamError = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether a caller may retry the same request.
    ///
    /// `SettlementInconsistent` must never be retried automatically.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkError
                | ErrorCode::TimeoutError
                | ErrorCode::DatabaseError
                | ErrorCode::SettlementCancelled
        )
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Account
            ErrorCode::AccountNotFound => "Account not found",
            ErrorCode::AccountInactive => "Account is inactive",
            ErrorCode::InsufficientFunds => "Insufficient funds",
            ErrorCode::InvalidAmount => "Amount must be positive",
            ErrorCode::SameAccount => "Source and destination accounts must differ",
            ErrorCode::AccountNumberExists => "Account number already exists",

            // Wallet
            ErrorCode::WalletNotFound => "Wallet not found",
            ErrorCode::WalletAlreadyExists => "Wallet already exists",
            ErrorCode::CurrencyNotSupported => "Wallet has no account in this currency",
            ErrorCode::CurrencyAccountExists => "Wallet already has an account in this currency",
            ErrorCode::InvalidCurrency => "Invalid currency code",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderNotAvailable => "Order is not available for purchase",
            ErrorCode::OrderInvalidCurrencyPair => "Base and quote currency must differ",
            ErrorCode::OrderInvalidAmount => "Order amount must be positive",
            ErrorCode::OrderInvalidPrice => "Order price must be positive",
            ErrorCode::OrderSelfPurchase => "Seller cannot purchase own order",

            // Transfer / Settlement
            ErrorCode::TransferFailed => "Transfer failed",
            ErrorCode::TransferNotFound => "Transfer not found",
            ErrorCode::TransferOutcomeUnknown => "Transfer outcome unknown",
            ErrorCode::SettlementInconsistent => {
                "Settlement left balances inconsistent; manual reconciliation required"
            }
            ErrorCode::SettlementCancelled => "Settlement cancelled before funds moved",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::UpstreamError => "Upstream service error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Account
            1001 => Ok(ErrorCode::AccountNotFound),
            1002 => Ok(ErrorCode::AccountInactive),
            1003 => Ok(ErrorCode::InsufficientFunds),
            1004 => Ok(ErrorCode::InvalidAmount),
            1005 => Ok(ErrorCode::SameAccount),
            1006 => Ok(ErrorCode::AccountNumberExists),

            // Wallet
            2001 => Ok(ErrorCode::WalletNotFound),
            2002 => Ok(ErrorCode::WalletAlreadyExists),
            2003 => Ok(ErrorCode::CurrencyNotSupported),
            2004 => Ok(ErrorCode::CurrencyAccountExists),
            2005 => Ok(ErrorCode::InvalidCurrency),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderNotAvailable),
            4003 => Ok(ErrorCode::OrderInvalidCurrencyPair),
            4004 => Ok(ErrorCode::OrderInvalidAmount),
            4005 => Ok(ErrorCode::OrderInvalidPrice),
            4006 => Ok(ErrorCode::OrderSelfPurchase),

            // Transfer / Settlement
            5001 => Ok(ErrorCode::TransferFailed),
            5002 => Ok(ErrorCode::TransferNotFound),
            5003 => Ok(ErrorCode::TransferOutcomeUnknown),
            5004 => Ok(ErrorCode::SettlementInconsistent),
            5005 => Ok(ErrorCode::SettlementCancelled),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::UpstreamError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
