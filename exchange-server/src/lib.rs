//! exchange-server
//!
//! Ledger, wallets and sell orders for a two-party exchange. A purchase is
//! settled by a saga that moves the quote currency from buyer to seller and
//! the base currency from seller to buyer, compensating the first leg when
//! the second one fails.

pub mod api;
pub mod config;
pub mod error;
pub mod logger;
pub mod services;
pub mod settlement;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{ServiceError, ServiceResult, StartupError};
pub use state::AppState;
