//! Storage layer
//!
//! The ledger, wallet and order repositories are async traits injected as
//! `Arc<dyn ...>`. Three backends implement them:
//! - [`memory::MemoryStore`]: dashmap + per-account mutex (dev, tests)
//! - [`postgres::PgStore`]: sqlx/PostgreSQL with row locks
//! - [`remote::RemoteLedger`]: ledger and wallets served by another
//!   exchange-server over HTTP

pub mod memory;
pub mod postgres;
pub mod remote;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use remote::RemoteLedger;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::error::{ErrorCategory, ErrorCode};
use shared::models::{
    Account, Currency, CurrencyNotSupported, Order, OrderCreate, OrderFilter, TransferRecord,
    TransferRequest, Wallet,
};
use thiserror::Error;
use uuid::Uuid;

/// Storage error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account inactive: {0}")]
    AccountInactive(String),

    #[error("Insufficient funds in {0}")]
    InsufficientFunds(String),

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Resulting balance would not fit in a `Decimal`
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    #[error("Source and destination are the same account: {0}")]
    SameAccount(String),

    #[error("Account number already exists: {0}")]
    AccountNumberExists(String),

    #[error("Wallet not found for user {0}")]
    WalletNotFound(i64),

    #[error("Wallet already exists for user {0}")]
    WalletAlreadyExists(i64),

    #[error("Wallet of user {user_id} already has a {currency} account")]
    CurrencyAccountExists { user_id: i64, currency: Currency },

    #[error(transparent)]
    CurrencyNotSupported(#[from] CurrencyNotSupported),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Order not available: {0}")]
    OrderNotAvailable(i64),

    #[error("Transfer {0} already recorded with different parameters")]
    TransferConflict(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Stored row could not be mapped back into a model
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Call did not finish in time; it may still have been applied
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Remote ledger could not be reached or answered garbage
    #[error("Ledger unreachable: {0}")]
    Unreachable(String),

    /// Remote ledger refused the request
    #[error("{message}")]
    Rejected { code: ErrorCode, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Error code reported to API callers
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AccountNotFound(_) => ErrorCode::AccountNotFound,
            Self::AccountInactive(_) => ErrorCode::AccountInactive,
            Self::InsufficientFunds(_) => ErrorCode::InsufficientFunds,
            Self::InvalidAmount(_) => ErrorCode::InvalidAmount,
            Self::AmountOutOfRange(_) => ErrorCode::ValueOutOfRange,
            Self::SameAccount(_) => ErrorCode::SameAccount,
            Self::AccountNumberExists(_) => ErrorCode::AccountNumberExists,
            Self::WalletNotFound(_) => ErrorCode::WalletNotFound,
            Self::WalletAlreadyExists(_) => ErrorCode::WalletAlreadyExists,
            Self::CurrencyAccountExists { .. } => ErrorCode::CurrencyAccountExists,
            Self::CurrencyNotSupported(_) => ErrorCode::CurrencyNotSupported,
            Self::OrderNotFound(_) => ErrorCode::OrderNotFound,
            Self::OrderNotAvailable(_) => ErrorCode::OrderNotAvailable,
            Self::TransferConflict(_) => ErrorCode::AlreadyExists,
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Corrupt(_) => ErrorCode::InternalError,
            Self::Timeout(_) => ErrorCode::TimeoutError,
            Self::Unreachable(_) => ErrorCode::NetworkError,
            Self::Rejected { code, .. } => *code,
            Self::Database(_) => ErrorCode::DatabaseError,
        }
    }

    /// Whether the operation may have been applied despite the error.
    ///
    /// Definite rejections leave state untouched. Database errors count as
    /// ambiguous because a connection lost during COMMIT hides the outcome.
    /// So do system-category answers from a remote ledger: its own storage
    /// failed somewhere it could not see the result either.
    pub fn is_ambiguous(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Unreachable(_) | Self::Database(_) => true,
            Self::Rejected { code, .. } => {
                code.category() == ErrorCategory::System
                    || *code == ErrorCode::TransferOutcomeUnknown
            }
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Reject zero and negative amounts
pub fn ensure_positive(amount: Decimal) -> StoreResult<()> {
    if amount <= Decimal::ZERO {
        return Err(StoreError::InvalidAmount(amount));
    }
    Ok(())
}

/// Balance of `account` after crediting `amount`
pub(crate) fn credited(account: &Account, amount: Decimal) -> StoreResult<Decimal> {
    account.balance.checked_add(amount).ok_or_else(|| {
        StoreError::AmountOutOfRange(format!(
            "crediting {amount} to {} overflows its balance",
            account.number
        ))
    })
}

/// Preconditions of every transfer, checked before any row is touched
pub fn validate_transfer(request: &TransferRequest) -> StoreResult<()> {
    ensure_positive(request.amount)?;
    if request.from_account == request.to_account {
        return Err(StoreError::SameAccount(request.from_account.clone()));
    }
    Ok(())
}

/// A stored record answers a replayed request only if it describes the same movement
pub(crate) fn replay(request: &TransferRequest, existing: TransferRecord) -> StoreResult<TransferRecord> {
    if existing.from_account == request.from_account
        && existing.to_account == request.to_account
        && existing.amount == request.amount
        && existing.kind == request.kind
        && existing.order_id == request.order_id
    {
        Ok(existing)
    } else {
        Err(StoreError::TransferConflict(request.id))
    }
}

/// Durable per-account balances
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn account(&self, number: &str) -> StoreResult<Account>;

    /// Open an empty, active account in `currency` with a fresh number
    async fn create_account(&self, currency: &Currency) -> StoreResult<Account>;

    async fn set_active(&self, number: &str, active: bool) -> StoreResult<Account>;

    async fn credit(&self, number: &str, amount: Decimal) -> StoreResult<Account>;

    /// Fails with `InsufficientFunds` without touching the balance
    async fn debit(&self, number: &str, amount: Decimal) -> StoreResult<Account>;

    /// Debit `from` and credit `to` as one atomic unit.
    ///
    /// Replaying a request whose id is already recorded returns the stored
    /// record and moves nothing.
    async fn transfer(&self, request: &TransferRequest) -> StoreResult<TransferRecord>;

    /// Committed transfer with this id, if any
    async fn transfer_status(&self, id: Uuid) -> StoreResult<Option<TransferRecord>>;
}

/// User wallets
#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn wallet_by_user(&self, user_id: i64) -> StoreResult<Wallet>;

    /// Create a wallet holding exactly one `base_currency` account
    async fn create_wallet(&self, user_id: i64, base_currency: &Currency) -> StoreResult<Wallet>;

    /// Open an account in `currency` and append it to the wallet
    async fn add_account(&self, user_id: i64, currency: &Currency) -> StoreResult<Account>;
}

/// Sell orders
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: OrderCreate) -> StoreResult<Order>;

    async fn get(&self, id: i64) -> StoreResult<Order>;

    async fn list(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;

    /// PENDING -> SETTLING tagged with `claim_id`, in one conditional update.
    ///
    /// `true` iff the order is now held by `claim_id`; repeating a claim that
    /// already landed also answers `true`.
    async fn claim_pending(&self, id: i64, claim_id: Uuid) -> StoreResult<bool>;

    /// SETTLING -> PENDING, only while the order is still held by `claim_id`.
    /// No-op otherwise.
    async fn revert_claim(&self, id: i64, claim_id: Uuid) -> StoreResult<()>;

    /// SETTLING under `claim_id` -> COMPLETED with `buyer_id` recorded.
    ///
    /// Repeating it for the same claim and buyer returns the order unchanged.
    async fn finalize(&self, id: i64, claim_id: Uuid, buyer_id: i64) -> StoreResult<Order>;
}
