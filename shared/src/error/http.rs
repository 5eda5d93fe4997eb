//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::AccountNotFound
            | Self::WalletNotFound
            | Self::OrderNotFound
            | Self::TransferNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::AccountNumberExists
            | Self::WalletAlreadyExists
            | Self::CurrencyAccountExists
            | Self::OrderNotAvailable => StatusCode::CONFLICT,

            // 422 Unprocessable (well-formed request the ledger state refuses)
            Self::InsufficientFunds | Self::AccountInactive | Self::CurrencyNotSupported => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 503 Service Unavailable (transient errors, client can retry)
            Self::NetworkError | Self::TimeoutError | Self::SettlementCancelled => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 502 Bad Gateway
            Self::UpstreamError | Self::TransferOutcomeUnknown => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::Unknown
            | Self::SettlementInconsistent => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
