//! Order API

mod handler;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(handler::list).post(handler::create))
        .route("/api/orders/{id}", get(handler::get_by_id))
        .route("/api/orders/{id}/purchase", post(handler::purchase))
}
