//! Account API Handlers

use axum::Json;
use axum::extract::{Path, State};
use shared::models::{Account, AccountCreate, ActiveRequest, AmountRequest};

use crate::api::{ApiResult, ok};
use crate::state::AppState;

/// POST /api/accounts - standalone account outside any wallet
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<AccountCreate>,
) -> ApiResult<Account> {
    ok(state
        .wallets
        .open_standalone_account(&payload.currency)
        .await?)
}

/// GET /api/accounts/{number}
pub async fn get_by_number(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<Account> {
    ok(state.wallets.account(&number).await?)
}

/// POST /api/accounts/{number}/deposit
pub async fn deposit(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(payload): Json<AmountRequest>,
) -> ApiResult<Account> {
    ok(state.wallets.deposit(&number, payload.amount).await?)
}

/// POST /api/accounts/{number}/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(payload): Json<AmountRequest>,
) -> ApiResult<Account> {
    ok(state.wallets.withdraw(&number, payload.amount).await?)
}

/// POST /api/accounts/{number}/active
pub async fn set_active(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(payload): Json<ActiveRequest>,
) -> ApiResult<Account> {
    ok(state.wallets.set_active(&number, payload.active).await?)
}
