//! Settlement of order purchases across the buyer's and seller's wallets

mod error;
mod saga;

pub use error::{SettlementError, SettlementStep};
pub use saga::{SettlementOutcome, SettlementSaga};
