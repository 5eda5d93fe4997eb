//! Accounts and transfers

use super::{PgStore, corrupt, ensure_found, is_unique_violation};
use crate::store::{
    LedgerStore, StoreError, StoreResult, credited, ensure_positive, replay, validate_transfer,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    Account, Currency, TransferRecord, TransferRequest, generate_account_number,
};
use shared::util::now_millis;
use sqlx::{PgConnection, Postgres, Transaction};
use uuid::Uuid;

/// Fresh-number attempts before giving up on a collision streak
const NUMBER_ATTEMPTS: usize = 3;

#[derive(sqlx::FromRow)]
pub(super) struct AccountRow {
    id: i64,
    number: String,
    balance: Decimal,
    active: bool,
    created_at: i64,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            number: row.number,
            balance: row.balance,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TransferRow {
    id: Uuid,
    from_account: String,
    to_account: String,
    amount: Decimal,
    kind: String,
    order_id: Option<i64>,
    created_at: i64,
}

impl TryFrom<TransferRow> for TransferRecord {
    type Error = StoreError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        Ok(TransferRecord {
            kind: row
                .kind
                .parse()
                .map_err(|e| corrupt("transfer", row.id, e))?,
            id: row.id,
            from_account: row.from_account,
            to_account: row.to_account,
            amount: row.amount,
            order_id: row.order_id,
            created_at: row.created_at,
        })
    }
}

/// Lock one account row for the rest of the transaction
async fn lock_account(conn: &mut PgConnection, number: &str) -> StoreResult<Account> {
    let row: Option<AccountRow> = sqlx::query_as(
        "SELECT id, number, balance, active, created_at FROM accounts WHERE number = $1 FOR UPDATE",
    )
    .bind(number)
    .fetch_optional(conn)
    .await?;
    ensure_found(row, || StoreError::AccountNotFound(number.to_string())).map(Into::into)
}

async fn find_transfer(conn: &mut PgConnection, id: Uuid) -> StoreResult<Option<TransferRecord>> {
    let row: Option<TransferRow> = sqlx::query_as(
        "SELECT id, from_account, to_account, amount, kind, order_id, created_at
         FROM transfers WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.map(TryInto::try_into).transpose()
}

async fn set_balance(
    tx: &mut Transaction<'_, Postgres>,
    number: &str,
    balance: Decimal,
) -> StoreResult<Account> {
    let row: AccountRow = sqlx::query_as(
        "UPDATE accounts SET balance = $2 WHERE number = $1
         RETURNING id, number, balance, active, created_at",
    )
    .bind(number)
    .bind(balance)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.into())
}

impl PgStore {
    /// Insert an account under a fresh number within `conn`
    pub(super) async fn insert_account(
        conn: &mut PgConnection,
        currency: &Currency,
    ) -> StoreResult<Account> {
        for _ in 0..NUMBER_ATTEMPTS {
            let number = generate_account_number(currency);
            let row: Option<AccountRow> = sqlx::query_as(
                "INSERT INTO accounts (number, balance, active, created_at)
                 VALUES ($1, 0, TRUE, $2)
                 ON CONFLICT (number) DO NOTHING
                 RETURNING id, number, balance, active, created_at",
            )
            .bind(&number)
            .bind(now_millis())
            .fetch_optional(&mut *conn)
            .await?;
            if let Some(row) = row {
                return Ok(row.into());
            }
            tracing::warn!(%number, "Account number collision, regenerating");
        }
        Err(StoreError::AccountNumberExists(currency.to_string()))
    }

    async fn adjust(&self, number: &str, delta: Decimal) -> StoreResult<Account> {
        let mut tx = self.pool.begin().await?;
        let account = lock_account(&mut tx, number).await?;
        if !account.active {
            return Err(StoreError::AccountInactive(account.number));
        }
        let balance = account.balance.checked_add(delta).ok_or_else(|| {
            StoreError::AmountOutOfRange(format!(
                "adjusting {} by {delta} overflows its balance",
                account.number
            ))
        })?;
        if balance < Decimal::ZERO {
            return Err(StoreError::InsufficientFunds(account.number));
        }
        let account = set_balance(&mut tx, number, balance).await?;
        tx.commit().await?;
        Ok(account)
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn account(&self, number: &str) -> StoreResult<Account> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, number, balance, active, created_at FROM accounts WHERE number = $1",
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;
        ensure_found(row, || StoreError::AccountNotFound(number.to_string())).map(Into::into)
    }

    async fn create_account(&self, currency: &Currency) -> StoreResult<Account> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_account(&mut conn, currency).await
    }

    async fn set_active(&self, number: &str, active: bool) -> StoreResult<Account> {
        let row: Option<AccountRow> = sqlx::query_as(
            "UPDATE accounts SET active = $2 WHERE number = $1
             RETURNING id, number, balance, active, created_at",
        )
        .bind(number)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        ensure_found(row, || StoreError::AccountNotFound(number.to_string())).map(Into::into)
    }

    async fn credit(&self, number: &str, amount: Decimal) -> StoreResult<Account> {
        ensure_positive(amount)?;
        self.adjust(number, amount).await
    }

    async fn debit(&self, number: &str, amount: Decimal) -> StoreResult<Account> {
        ensure_positive(amount)?;
        self.adjust(number, -amount).await
    }

    async fn transfer(&self, request: &TransferRequest) -> StoreResult<TransferRecord> {
        validate_transfer(request)?;
        let mut tx = self.pool.begin().await?;

        // Ascending number order: two transfers over the same pair never deadlock
        let (from, to) = if request.from_account < request.to_account {
            let from = lock_account(&mut tx, &request.from_account).await?;
            let to = lock_account(&mut tx, &request.to_account).await?;
            (from, to)
        } else {
            let to = lock_account(&mut tx, &request.to_account).await?;
            let from = lock_account(&mut tx, &request.from_account).await?;
            (from, to)
        };

        // After the locks, so a replay racing the original sees its commit
        if let Some(existing) = find_transfer(&mut tx, request.id).await? {
            return replay(request, existing);
        }

        for account in [&from, &to] {
            if !account.active {
                return Err(StoreError::AccountInactive(account.number.clone()));
            }
        }
        if from.balance < request.amount {
            return Err(StoreError::InsufficientFunds(from.number));
        }

        let to_balance = credited(&to, request.amount)?;

        set_balance(&mut tx, &from.number, from.balance - request.amount).await?;
        set_balance(&mut tx, &to.number, to_balance).await?;

        let record = TransferRecord::from_request(request, now_millis());
        sqlx::query(
            "INSERT INTO transfers (id, from_account, to_account, amount, kind, order_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id)
        .bind(&record.from_account)
        .bind(&record.to_account)
        .bind(record.amount)
        .bind(record.kind.as_str())
        .bind(record.order_id)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // Same id replayed concurrently over a different pair of accounts
            if is_unique_violation(&e, "transfers_pkey") {
                StoreError::TransferConflict(request.id)
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        tracing::debug!(
            transfer_id = %record.id,
            from = %record.from_account,
            to = %record.to_account,
            amount = %record.amount,
            kind = %record.kind,
            "Transfer committed"
        );
        Ok(record)
    }

    async fn transfer_status(&self, id: Uuid) -> StoreResult<Option<TransferRecord>> {
        let mut conn = self.pool.acquire().await?;
        find_transfer(&mut conn, id).await
    }
}
