//! Wallets

use super::{PgStore, is_unique_violation};
use crate::store::{StoreError, StoreResult, WalletRepository};
use async_trait::async_trait;
use shared::models::{Account, Currency, Wallet};
use shared::util::now_millis;
use sqlx::PgConnection;

#[derive(sqlx::FromRow)]
struct WalletRow {
    user_id: i64,
    created_at: i64,
}

async fn load_wallet(conn: &mut PgConnection, user_id: i64, lock: bool) -> StoreResult<Wallet> {
    let sql = if lock {
        "SELECT user_id, created_at FROM wallets WHERE user_id = $1 FOR UPDATE"
    } else {
        "SELECT user_id, created_at FROM wallets WHERE user_id = $1"
    };
    let row: WalletRow = sqlx::query_as(sql)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StoreError::WalletNotFound(user_id))?;

    let accounts: Vec<String> = sqlx::query_scalar(
        "SELECT account_number FROM wallet_accounts WHERE user_id = $1 ORDER BY position",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Wallet {
        user_id: row.user_id,
        accounts,
        created_at: row.created_at,
    })
}

async fn attach(
    conn: &mut PgConnection,
    user_id: i64,
    position: i32,
    currency: &Currency,
    account: &Account,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO wallet_accounts (user_id, position, currency, account_number)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(position)
    .bind(currency.as_str())
    .bind(&account.number)
    .execute(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e, "wallet_accounts_user_id_currency_key") {
            StoreError::CurrencyAccountExists {
                user_id,
                currency: currency.clone(),
            }
        } else {
            e.into()
        }
    })?;
    Ok(())
}

#[async_trait]
impl WalletRepository for PgStore {
    async fn wallet_by_user(&self, user_id: i64) -> StoreResult<Wallet> {
        let mut conn = self.pool.acquire().await?;
        load_wallet(&mut conn, user_id, false).await
    }

    async fn create_wallet(&self, user_id: i64, base_currency: &Currency) -> StoreResult<Wallet> {
        let mut tx = self.pool.begin().await?;
        let created_at = now_millis();

        sqlx::query("INSERT INTO wallets (user_id, created_at) VALUES ($1, $2)")
            .bind(user_id)
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e, "wallets_pkey") {
                    StoreError::WalletAlreadyExists(user_id)
                } else {
                    e.into()
                }
            })?;

        let account = Self::insert_account(&mut tx, base_currency).await?;
        attach(&mut tx, user_id, 0, base_currency, &account).await?;
        tx.commit().await?;

        tracing::info!(user_id, account = %account.number, "Wallet created");
        Ok(Wallet {
            user_id,
            accounts: vec![account.number],
            created_at,
        })
    }

    async fn add_account(&self, user_id: i64, currency: &Currency) -> StoreResult<Account> {
        let mut tx = self.pool.begin().await?;
        // Row lock serializes concurrent openings on the same wallet
        let wallet = load_wallet(&mut tx, user_id, true).await?;
        if wallet.has_currency(currency) {
            return Err(StoreError::CurrencyAccountExists {
                user_id,
                currency: currency.clone(),
            });
        }

        let account = Self::insert_account(&mut tx, currency).await?;
        attach(&mut tx, user_id, wallet.accounts.len() as i32, currency, &account).await?;
        tx.commit().await?;
        Ok(account)
    }
}
