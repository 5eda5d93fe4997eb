//! Transfer API Handlers

use axum::Json;
use axum::extract::{Path, State};
use shared::models::{TransferRecord, TransferRequest};
use uuid::Uuid;

use crate::api::{ApiResult, ok};
use crate::state::AppState;

/// POST /api/transfers - replaying a known id returns the stored record
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> ApiResult<TransferRecord> {
    ok(state.wallets.transfer(request).await?)
}

/// GET /api/transfers/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<TransferRecord> {
    ok(state.wallets.transfer_status(id).await?)
}
