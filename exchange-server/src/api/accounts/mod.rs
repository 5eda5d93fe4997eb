//! Account API

mod handler;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/accounts", post(handler::create))
        .route("/api/accounts/{number}", get(handler::get_by_number))
        .route("/api/accounts/{number}/deposit", post(handler::deposit))
        .route("/api/accounts/{number}/withdraw", post(handler::withdraw))
        .route("/api/accounts/{number}/active", post(handler::set_active))
}
