//! Wallet API Handlers

use axum::Json;
use axum::extract::{Path, State};
use shared::models::{Account, AccountCreate, Wallet, WalletCreate};

use crate::api::{ApiResult, ok};
use crate::state::AppState;

/// POST /api/wallets - onboard a user
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<WalletCreate>,
) -> ApiResult<Wallet> {
    ok(state.wallets.create_wallet(payload).await?)
}

/// GET /api/wallets/{user_id}
pub async fn get_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Wallet> {
    ok(state.wallets.wallet(user_id).await?)
}

/// GET /api/wallets/{user_id}/accounts - accounts with balances, wallet order
pub async fn list_accounts(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<Account>> {
    ok(state.wallets.accounts(user_id).await?)
}

/// POST /api/wallets/{user_id}/accounts
pub async fn open_account(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<AccountCreate>,
) -> ApiResult<Account> {
    ok(state
        .wallets
        .open_account(user_id, &payload.currency)
        .await?)
}
