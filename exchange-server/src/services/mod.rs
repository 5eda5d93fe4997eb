//! Business services consumed by the HTTP handlers

pub mod orders;
pub mod wallet;

pub use orders::OrderService;
pub use wallet::WalletService;
