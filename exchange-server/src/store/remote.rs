//! Remote ledger
//!
//! Accounts, transfers and wallets served by another exchange-server through
//! [`LedgerClient`]. Orders stay local.

use super::{LedgerStore, StoreError, StoreResult, WalletRepository, ensure_positive, validate_transfer};
use async_trait::async_trait;
use exchange_client::{ClientError, LedgerClient};
use rust_decimal::Decimal;
use shared::models::{Account, Currency, TransferRecord, TransferRequest, Wallet};
use uuid::Uuid;

impl From<ClientError> for StoreError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { code, message } => StoreError::Rejected { code, message },
            ClientError::Timeout(msg) => StoreError::Timeout(msg),
            other => StoreError::Unreachable(other.to_string()),
        }
    }
}

/// `LedgerStore` + `WalletRepository` over HTTP
#[derive(Debug, Clone)]
pub struct RemoteLedger {
    client: LedgerClient,
}

impl RemoteLedger {
    pub fn new(client: LedgerClient) -> Self {
        tracing::info!(base_url = client.base_url(), "Using remote ledger");
        Self { client }
    }
}

#[async_trait]
impl LedgerStore for RemoteLedger {
    async fn account(&self, number: &str) -> StoreResult<Account> {
        Ok(self.client.account(number).await?)
    }

    async fn create_account(&self, currency: &Currency) -> StoreResult<Account> {
        Ok(self.client.open_account(currency).await?)
    }

    async fn set_active(&self, number: &str, active: bool) -> StoreResult<Account> {
        Ok(self.client.set_active(number, active).await?)
    }

    async fn credit(&self, number: &str, amount: Decimal) -> StoreResult<Account> {
        ensure_positive(amount)?;
        Ok(self.client.deposit(number, amount).await?)
    }

    async fn debit(&self, number: &str, amount: Decimal) -> StoreResult<Account> {
        ensure_positive(amount)?;
        Ok(self.client.withdraw(number, amount).await?)
    }

    async fn transfer(&self, request: &TransferRequest) -> StoreResult<TransferRecord> {
        validate_transfer(request)?;
        Ok(self.client.transfer(request).await?)
    }

    async fn transfer_status(&self, id: Uuid) -> StoreResult<Option<TransferRecord>> {
        Ok(self.client.transfer_status(id).await?)
    }
}

#[async_trait]
impl WalletRepository for RemoteLedger {
    async fn wallet_by_user(&self, user_id: i64) -> StoreResult<Wallet> {
        Ok(self.client.wallet(user_id).await?)
    }

    async fn create_wallet(&self, user_id: i64, base_currency: &Currency) -> StoreResult<Wallet> {
        Ok(self
            .client
            .create_wallet(user_id, Some(base_currency.clone()))
            .await?)
    }

    async fn add_account(&self, user_id: i64, currency: &Currency) -> StoreResult<Account> {
        Ok(self.client.create_account(user_id, currency).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn test_client_error_mapping() {
        let rejected: StoreError = ClientError::Api {
            code: ErrorCode::InsufficientFunds,
            message: "Insufficient funds in USDx".into(),
        }
        .into();
        assert_eq!(rejected.code(), ErrorCode::InsufficientFunds);
        assert!(!rejected.is_ambiguous());

        // The remote side failed mid-request; its transfer may have committed
        let remote_db: StoreError = ClientError::Api {
            code: ErrorCode::DatabaseError,
            message: "connection reset".into(),
        }
        .into();
        assert!(remote_db.is_ambiguous());

        let timeout: StoreError = ClientError::Timeout("deadline".into()).into();
        assert!(matches!(timeout, StoreError::Timeout(_)));
        assert!(timeout.is_ambiguous());

        let unreachable: StoreError = ClientError::Connect("refused".into()).into();
        assert!(matches!(unreachable, StoreError::Unreachable(_)));
        assert!(unreachable.is_ambiguous());
    }
}
