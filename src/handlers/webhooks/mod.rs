mod stripe;

pub use stripe::*;

use axum::{Router, http::StatusCode, routing::post};

use crate::db::AppState;

async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/stripe-webhook",
        post(handle_stripe_webhook).fallback(method_not_allowed),
    )
}
