//! Exchange Client - HTTP client for the ledger API
//!
//! Talks to the wallet/ledger endpoints of a remote exchange-server. Used by
//! the server itself when its ledger lives behind a network boundary.

pub mod config;
pub mod error;
pub mod http;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::LedgerClient;

// Re-export shared types for convenience
pub use shared::error::{ApiResponse, ErrorCode};
