//! Transfer API

mod handler;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/transfers", post(handler::create))
        .route("/api/transfers/{id}", get(handler::get_by_id))
}
