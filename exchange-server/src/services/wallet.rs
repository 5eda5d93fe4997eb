//! Wallet service
//!
//! Wallets, accounts and direct transfers. Thin layer over the ledger and
//! wallet repositories that validates input before it reaches storage.

use crate::error::ServiceResult;
use crate::store::{LedgerStore, WalletRepository, ensure_positive, validate_transfer};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{Account, Currency, TransferRecord, TransferRequest, Wallet, WalletCreate};
use std::sync::Arc;
use uuid::Uuid;

pub struct WalletService {
    ledger: Arc<dyn LedgerStore>,
    wallets: Arc<dyn WalletRepository>,
    base_currency: Currency,
}

impl WalletService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        wallets: Arc<dyn WalletRepository>,
        base_currency: Currency,
    ) -> Self {
        Self {
            ledger,
            wallets,
            base_currency,
        }
    }

    pub async fn wallet(&self, user_id: i64) -> ServiceResult<Wallet> {
        Ok(self.wallets.wallet_by_user(user_id).await?)
    }

    /// Onboard a user with a single base-currency account
    pub async fn create_wallet(&self, payload: WalletCreate) -> ServiceResult<Wallet> {
        if payload.user_id <= 0 {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                "user_id must be positive",
            )
            .with_detail("field", "user_id")
            .into());
        }
        let base = payload
            .base_currency
            .unwrap_or_else(|| self.base_currency.clone());
        let wallet = self.wallets.create_wallet(payload.user_id, &base).await?;
        tracing::info!(user_id = wallet.user_id, base_currency = %base, "Wallet created");
        Ok(wallet)
    }

    /// Open an account in `currency` inside the user's wallet
    pub async fn open_account(&self, user_id: i64, currency: &Currency) -> ServiceResult<Account> {
        let account = self.wallets.add_account(user_id, currency).await?;
        tracing::info!(user_id, number = %account.number, "Account opened");
        Ok(account)
    }

    /// Accounts of a wallet in wallet order, with current balances
    pub async fn accounts(&self, user_id: i64) -> ServiceResult<Vec<Account>> {
        let wallet = self.wallets.wallet_by_user(user_id).await?;
        let mut accounts = Vec::with_capacity(wallet.accounts.len());
        for number in &wallet.accounts {
            accounts.push(self.ledger.account(number).await?);
        }
        Ok(accounts)
    }

    pub async fn account(&self, number: &str) -> ServiceResult<Account> {
        Ok(self.ledger.account(number).await?)
    }

    /// Open an account that belongs to no wallet
    pub async fn open_standalone_account(&self, currency: &Currency) -> ServiceResult<Account> {
        Ok(self.ledger.create_account(currency).await?)
    }

    pub async fn deposit(&self, number: &str, amount: Decimal) -> ServiceResult<Account> {
        ensure_positive(amount)?;
        let account = self.ledger.credit(number, amount).await?;
        tracing::info!(%number, %amount, "Deposit");
        Ok(account)
    }

    pub async fn withdraw(&self, number: &str, amount: Decimal) -> ServiceResult<Account> {
        ensure_positive(amount)?;
        let account = self.ledger.debit(number, amount).await?;
        tracing::info!(%number, %amount, "Withdrawal");
        Ok(account)
    }

    pub async fn set_active(&self, number: &str, active: bool) -> ServiceResult<Account> {
        let account = self.ledger.set_active(number, active).await?;
        tracing::info!(%number, active, "Account activation changed");
        Ok(account)
    }

    pub async fn transfer(&self, request: TransferRequest) -> ServiceResult<TransferRecord> {
        validate_transfer(&request)?;
        let record = self.ledger.transfer(&request).await?;
        tracing::info!(
            transfer_id = %record.id,
            from = %record.from_account,
            to = %record.to_account,
            amount = %record.amount,
            kind = %record.kind,
            "Transfer committed"
        );
        Ok(record)
    }

    pub async fn transfer_status(&self, id: Uuid) -> ServiceResult<TransferRecord> {
        self.ledger.transfer_status(id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::TransferNotFound, format!("Transfer {id} not found"))
                .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::store::{MemoryStore, StoreError};
    use rust_decimal_macros::dec;

    fn service() -> WalletService {
        let store = Arc::new(MemoryStore::new());
        WalletService::new(store.clone(), store, Currency::default())
    }

    #[tokio::test]
    async fn test_create_wallet_uses_base_currency() {
        let svc = service();
        let wallet = svc
            .create_wallet(WalletCreate {
                user_id: 5,
                base_currency: None,
            })
            .await
            .unwrap();
        assert_eq!(wallet.accounts.len(), 1);
        assert!(wallet.accounts[0].starts_with("USD"));

        let eur = svc
            .create_wallet(WalletCreate {
                user_id: 6,
                base_currency: Some(Currency::new("EUR").unwrap()),
            })
            .await
            .unwrap();
        assert!(eur.accounts[0].starts_with("EUR"));
    }

    #[tokio::test]
    async fn test_create_wallet_rejects_bad_user_id() {
        let err = service()
            .create_wallet(WalletCreate {
                user_id: 0,
                base_currency: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::App(e) if e.code == ErrorCode::ValueOutOfRange));
    }

    #[tokio::test]
    async fn test_deposit_withdraw_validation() {
        let svc = service();
        let account = svc
            .open_standalone_account(&Currency::default())
            .await
            .unwrap();

        let err = svc.deposit(&account.number, dec!(0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::InvalidAmount(_))));

        svc.deposit(&account.number, dec!(100)).await.unwrap();
        let err = svc.withdraw(&account.number, dec!(100.01)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::InsufficientFunds(_))));

        let account = svc.withdraw(&account.number, dec!(40)).await.unwrap();
        assert_eq!(account.balance, dec!(60));
    }

    #[tokio::test]
    async fn test_accounts_in_wallet_order() {
        let svc = service();
        svc.create_wallet(WalletCreate {
            user_id: 1,
            base_currency: None,
        })
        .await
        .unwrap();
        let btc = svc
            .open_account(1, &Currency::new("BTC").unwrap())
            .await
            .unwrap();
        svc.deposit(&btc.number, dec!(0.5)).await.unwrap();

        let accounts = svc.accounts(1).await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert!(accounts[0].number.starts_with("USD"));
        assert_eq!(accounts[1].number, btc.number);
        assert_eq!(accounts[1].balance, dec!(0.5));
    }

    #[tokio::test]
    async fn test_transfer_status_not_found() {
        let err = service().transfer_status(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::App(e) if e.code == ErrorCode::TransferNotFound));
    }
}
