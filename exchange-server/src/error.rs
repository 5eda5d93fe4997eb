//! Unified service-layer error type
//!
//! `ServiceError` bridges storage and settlement errors to the API-layer
//! `AppError`, so services and handlers propagate with `?` instead of
//! mapping errors by hand at every call site.

use axum::response::IntoResponse;
use exchange_client::ClientError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::config::ConfigError;
use crate::settlement::{SettlementError, SettlementStep};
use crate::store::StoreError;

/// Service-layer error
///
/// - `Store`: storage or remote ledger errors (database errors auto-logged)
/// - `Settlement`: purchase failures, carrying reconciliation context
/// - `App`: business-rule errors, passed through to the client
#[derive(Debug)]
pub enum ServiceError {
    Store(StoreError),
    Settlement(SettlementError),
    App(AppError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}

impl From<SettlementError> for ServiceError {
    fn from(e: SettlementError) -> Self {
        ServiceError::Settlement(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(db_err) => {
                tracing::error!(error = %db_err, "Storage database error");
                AppError::new(ErrorCode::DatabaseError)
            }
            StoreError::Corrupt(reason) => {
                tracing::error!(%reason, "Corrupt storage record");
                AppError::new(ErrorCode::InternalError)
            }
            StoreError::Rejected { code, message } => AppError::with_message(code, message),
            StoreError::CurrencyNotSupported(inner) => {
                AppError::with_message(ErrorCode::CurrencyNotSupported, inner.to_string())
                    .with_detail("user_id", inner.user_id)
                    .with_detail("currency", inner.currency.to_string())
            }
            other => AppError::with_message(other.code(), other.to_string()),
        }
    }
}

impl From<SettlementError> for AppError {
    fn from(e: SettlementError) -> Self {
        let code = e.code();
        let retryable = e.is_retryable();
        let order_id = e.order_id();
        let err = match &e {
            SettlementError::Aborted {
                step,
                source: StoreError::Database(db_err),
                ..
            } => {
                tracing::error!(order_id, %step, error = %db_err, "Settlement database error");
                AppError::new(ErrorCode::DatabaseError).with_detail("step", step.as_str())
            }
            SettlementError::Aborted { step, .. } => {
                AppError::with_message(code, e.to_string()).with_detail("step", step.as_str())
            }
            SettlementError::LegFailed {
                step,
                amount,
                transfer_id,
                ..
            } => AppError::with_message(code, e.to_string())
                .with_detail("leg", step.as_str())
                .with_detail("amount", amount.to_string())
                .with_detail("transfer_id", transfer_id.to_string()),
            SettlementError::Inconsistent {
                step,
                amount,
                transfer_id,
                reason,
                ..
            } => AppError::with_message(code, e.to_string())
                .with_detail("leg", step.as_str())
                .with_detail("amount", amount.to_string())
                .with_detail("transfer_id", transfer_id.to_string())
                .with_detail("reason", reason.as_str()),
            SettlementError::ClaimStranded {
                claim_id, reason, ..
            } => AppError::with_message(code, e.to_string())
                .with_detail("step", SettlementStep::Claim.as_str())
                .with_detail("claim_id", claim_id.to_string())
                .with_detail("reason", reason.as_str()),
            _ => AppError::with_message(code, e.to_string()),
        };
        err.with_detail("order_id", order_id)
            .with_detail("retryable", retryable)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Store(store_err) => store_err.into(),
            ServiceError::Settlement(settlement_err) => settlement_err.into(),
            ServiceError::App(app_err) => app_err,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures while wiring the server together
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("ledger client: {0}")]
    Client(#[from] ClientError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::models::{Currency, CurrencyNotSupported};
    use uuid::Uuid;

    #[test]
    fn test_store_error_keeps_code() {
        let err: AppError = StoreError::InsufficientFunds("USDbuyer".into()).into();
        assert_eq!(err.code, ErrorCode::InsufficientFunds);
        assert_eq!(err.message, "Insufficient funds in USDbuyer");

        let err: AppError = StoreError::Rejected {
            code: ErrorCode::AccountInactive,
            message: "Account inactive: BTCx".into(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::AccountInactive);
        assert_eq!(err.message, "Account inactive: BTCx");
    }

    #[test]
    fn test_currency_not_supported_details() {
        let err: AppError = StoreError::from(CurrencyNotSupported {
            user_id: 4,
            currency: Currency::new("ETH").unwrap(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::CurrencyNotSupported);
        let details = err.details.unwrap();
        assert_eq!(details["user_id"], 4);
        assert_eq!(details["currency"], "ETH");
    }

    #[test]
    fn test_inconsistent_settlement_details() {
        let transfer_id = Uuid::new_v4();
        let err: AppError = SettlementError::Inconsistent {
            order_id: 12,
            step: SettlementStep::Compensation,
            amount: dec!(50000),
            transfer_id,
            reason: "ledger unreachable".into(),
        }
        .into();

        assert_eq!(err.code, ErrorCode::SettlementInconsistent);
        let details = err.details.unwrap();
        assert_eq!(details["order_id"], 12);
        assert_eq!(details["leg"], "compensation");
        assert_eq!(details["amount"], "50000");
        assert_eq!(details["transfer_id"], transfer_id.to_string());
        assert_eq!(details["retryable"], false);
    }

    #[test]
    fn test_service_error_passes_app_error_through() {
        let err: AppError =
            ServiceError::App(AppError::with_message(ErrorCode::OrderInvalidPrice, "bad price"))
                .into();
        assert_eq!(err.code, ErrorCode::OrderInvalidPrice);
        assert_eq!(err.message, "bad price");
    }
}
