//! Error codes and the HTTP envelope for the exchange
//!
//! Every failure that leaves the server is an [`AppError`]: a stable
//! [`ErrorCode`] (grouped by [`ErrorCategory`]), a message and optional
//! details, rendered as an [`ApiResponse`].
//!
//! Code ranges: 0xxx general, 1xxx account, 2xxx wallet, 4xxx order,
//! 5xxx transfer and settlement, 9xxx system.
//!
//! ```
//! use shared::error::{ApiResponse, AppError, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::InsufficientFunds, "Balance too low")
//!     .with_detail("account", "USD0001");
//! let response = ApiResponse::<()>::from(&err);
//! assert_eq!(response.code, Some(1003));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
