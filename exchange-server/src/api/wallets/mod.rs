//! Wallet API

mod handler;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/wallets", post(handler::create))
        .route("/api/wallets/{user_id}", get(handler::get_by_user))
        .route(
            "/api/wallets/{user_id}/accounts",
            get(handler::list_accounts).post(handler::open_account),
        )
}
