//! Shared types for the exchange workspace
//!
//! Domain models (accounts, wallets, orders, transfers), the unified error
//! system and small utilities used by both the server and the ledger client.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{
    Account, Currency, Order, OrderCreate, OrderFilter, OrderStatus, TransferKind,
    TransferRecord, TransferRequest, Wallet,
};
