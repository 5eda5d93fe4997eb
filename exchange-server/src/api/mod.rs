//! HTTP API
//!
//! Every endpoint answers with the `ApiResponse` envelope. Errors carry an
//! `ErrorCode` and map to the HTTP status of that code.

pub mod accounts;
pub mod health;
pub mod orders;
pub mod transfers;
pub mod wallets;

use axum::Json;
use axum::Router;
use axum::routing::get;
use shared::error::{ApiResponse, AppError};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Handler result carrying the response envelope
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(wallets::router())
        .merge(accounts::router())
        .merge(transfers::router())
        .merge(orders::router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
