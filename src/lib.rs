pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod license;
pub mod models;
pub mod payments;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::db::AppState;

/// Full HTTP surface: health, license verification and the Stripe webhook.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(handlers::public::router())
        .merge(handlers::webhooks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
