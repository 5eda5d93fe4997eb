//! Order API Handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use shared::error::AppError;
use shared::models::{Order, OrderCreate, OrderFilter, PurchaseRequest, PurchaseResponse};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiResult, ok};
use crate::state::AppState;

/// POST /api/orders - list a sell order
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<OrderCreate>,
) -> ApiResult<Order> {
    ok(state.orders.create(payload).await?)
}

/// GET /api/orders?status&base_currency&quote_currency&seller_id&limit&offset
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<Vec<Order>> {
    ok(state.orders.list(&filter).await?)
}

/// GET /api/orders/{id}
pub async fn get_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Order> {
    ok(state.orders.get(id).await?)
}

/// POST /api/orders/{id}/purchase
///
/// The saga runs on its own task. If the client goes away the drop guard
/// cancels it, which only takes effect before the payment leg starts.
pub async fn purchase(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<PurchaseRequest>,
) -> ApiResult<PurchaseResponse> {
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let orders = state.orders.clone();
    let task =
        tokio::spawn(async move { orders.purchase(id, payload.buyer_id, &cancel).await });
    let result = task.await.map_err(|e| {
        tracing::error!(order_id = id, error = %e, "Settlement task failed");
        AppError::internal("Settlement task failed")
    })?;
    guard.disarm();

    let outcome = result?;
    ok(PurchaseResponse {
        status: outcome.order.status,
        order: outcome.order,
        transfers: vec![outcome.payment_transfer, outcome.asset_transfer],
    })
}
