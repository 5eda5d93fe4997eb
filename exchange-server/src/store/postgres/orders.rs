//! Orders

use super::{PgStore, corrupt};
use crate::store::{OrderRepository, StoreError, StoreResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{Order, OrderCreate, OrderFilter};
use shared::util::now_millis;
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, seller_id, buyer_id, base_currency, amount, price, \
                             quote_currency, status, claim_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    seller_id: i64,
    buyer_id: Option<i64>,
    base_currency: String,
    amount: Decimal,
    price: Decimal,
    quote_currency: String,
    status: String,
    claim_id: Option<Uuid>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let id = row.id;
        Ok(Order {
            id,
            seller_id: row.seller_id,
            buyer_id: row.buyer_id,
            base_currency: row
                .base_currency
                .parse()
                .map_err(|e| corrupt("order", id, e))?,
            amount: row.amount,
            price: row.price,
            quote_currency: row
                .quote_currency
                .parse()
                .map_err(|e| corrupt("order", id, e))?,
            status: row.status.parse().map_err(|e| corrupt("order", id, e))?,
            claim_id: row.claim_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl PgStore {
    async fn fetch_order(&self, id: i64) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn create(&self, order: OrderCreate) -> StoreResult<Order> {
        let now = now_millis();
        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders (seller_id, base_currency, amount, price, quote_currency, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, 'PENDING', $6, $6)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.seller_id)
        .bind(order.base_currency.as_str())
        .bind(order.amount)
        .bind(order.price)
        .bind(order.quote_currency.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get(&self, id: i64) -> StoreResult<Order> {
        self.fetch_order(id)
            .await?
            .ok_or(StoreError::OrderNotFound(id))
    }

    async fn list(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::TEXT IS NULL OR base_currency = $2)
               AND ($3::TEXT IS NULL OR quote_currency = $3)
               AND ($4::BIGINT IS NULL OR seller_id = $4)
             ORDER BY id
             LIMIT $5 OFFSET $6"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.base_currency.as_ref().map(|c| c.as_str()))
        .bind(filter.quote_currency.as_ref().map(|c| c.as_str()))
        .bind(filter.seller_id)
        .bind(filter.page_size())
        .bind(filter.page_offset())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn claim_pending(&self, id: i64, claim_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'SETTLING', claim_id = $2, updated_at = $3
             WHERE id = $1
               AND (status = 'PENDING' OR (status = 'SETTLING' AND claim_id = $2))",
        )
        .bind(id)
        .bind(claim_id)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revert_claim(&self, id: i64, claim_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "UPDATE orders SET status = 'PENDING', claim_id = NULL, updated_at = $3
             WHERE id = $1 AND status = 'SETTLING' AND claim_id = $2",
        )
        .bind(id)
        .bind(claim_id)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finalize(&self, id: i64, claim_id: Uuid, buyer_id: i64) -> StoreResult<Order> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = 'COMPLETED', buyer_id = $3,
                    updated_at = CASE WHEN status = 'COMPLETED' THEN updated_at ELSE $4 END
             WHERE id = $1
               AND claim_id = $2
               AND (status = 'SETTLING' OR (status = 'COMPLETED' AND buyer_id = $3))
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(claim_id)
        .bind(buyer_id)
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            // Still pending, held by another claim, or completed for somebody else
            None => match self.fetch_order(id).await? {
                Some(_) => Err(StoreError::OrderNotAvailable(id)),
                None => Err(StoreError::OrderNotFound(id)),
            },
        }
    }
}
