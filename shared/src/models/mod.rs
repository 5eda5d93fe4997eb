//! Data models
//!
//! Shared between exchange-server and exchange-client (via API).
//! Monetary quantities are `rust_decimal::Decimal`, serialized as strings.
//! Storage row types live next to each backend, not here.

pub mod account;
pub mod currency;
pub mod order;
pub mod transfer;
pub mod wallet;

// Re-exports
pub use account::*;
pub use currency::*;
pub use order::*;
pub use transfer::*;
pub use wallet::*;
