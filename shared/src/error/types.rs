//! `AppError` and the `ApiResponse` envelope

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Error crossing the HTTP boundary
///
/// `details` carries machine-readable context such as the order id, the
/// failing settlement step or the transfer id an operator needs to reconcile.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Error with the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach one detail entry
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, message)
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Errors an operator has to look at: system failures and broken settlements
    pub fn needs_attention(&self) -> bool {
        self.code.category() == ErrorCategory::System
            || self.code == ErrorCode::SettlementInconsistent
    }
}

/// Response envelope shared by every endpoint
///
/// `code` is 0 on success. On failure `data` is absent and `details` mirrors
/// [`AppError::details`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: Some(0),
            message: "OK".to_string(),
            data: Some(data),
            details: None,
        }
    }

    /// A missing code is read as success
    pub fn is_success(&self) -> bool {
        matches!(self.code, None | Some(0))
    }
}

impl<T> From<&AppError> for ApiResponse<T> {
    fn from(err: &AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message.clone(),
            data: None,
            details: err.details.clone(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.needs_attention() {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                details = ?self.details,
                "Request failed with system error"
            );
        }

        let body = ApiResponse::<()>::from(&self);
        (self.http_status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_custom_message() {
        let err = AppError::new(ErrorCode::InsufficientFunds);
        assert_eq!(err.message, "Insufficient funds");
        assert!(err.details.is_none());

        let err = AppError::with_message(ErrorCode::InvalidAmount, "amount must be > 0");
        assert_eq!(err.code, ErrorCode::InvalidAmount);
        assert_eq!(err.to_string(), "amount must be > 0");
    }

    #[test]
    fn test_details_accumulate() {
        let err = AppError::new(ErrorCode::SettlementInconsistent)
            .with_detail("order_id", 7)
            .with_detail("step", "compensation");

        let details = err.details.unwrap();
        assert_eq!(details["order_id"], 7);
        assert_eq!(details["step"], "compensation");
    }

    #[test]
    fn test_status_and_retry() {
        assert_eq!(
            AppError::new(ErrorCode::InsufficientFunds).http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::new(ErrorCode::OrderNotAvailable).http_status(),
            StatusCode::CONFLICT
        );
        assert!(AppError::new(ErrorCode::TimeoutError).is_retryable());
        assert!(!AppError::validation("bad").is_retryable());
    }

    #[test]
    fn test_needs_attention() {
        assert!(AppError::internal("boom").needs_attention());
        assert!(AppError::new(ErrorCode::SettlementInconsistent).needs_attention());
        assert!(!AppError::new(ErrorCode::OrderNotFound).needs_attention());
    }

    #[test]
    fn test_envelope_from_error() {
        let err = AppError::with_message(ErrorCode::OrderNotFound, "Order 7 not found")
            .with_detail("order_id", 7);
        let response = ApiResponse::<String>::from(&err);

        assert_eq!(response.code, Some(4001));
        assert!(!response.is_success());
        assert!(response.data.is_none());
        assert_eq!(response.details.unwrap()["order_id"], 7);
    }

    #[test]
    fn test_envelope_wire_format() {
        let json = serde_json::to_string(&ApiResponse::success("hello")).unwrap();
        assert_eq!(json, r#"{"code":0,"message":"OK","data":"hello"}"#);

        let parsed: ApiResponse<i32> = serde_json::from_str(r#"{"message":"OK","data":42}"#).unwrap();
        assert!(parsed.is_success());
        assert_eq!(parsed.data, Some(42));
    }
}
