mod verify;

pub use verify::*;

use axum::{
    Json, Router,
    http::{HeaderValue, header},
    routing::get,
};
use serde::Serialize;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    // Browser extensions call /api/verify from arbitrary origins; every
    // response carries the CORS headers, errors included.
    let verify = Router::new()
        .route("/api/verify", get(verify_license).options(verify_preflight))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ));

    Router::new().route("/health", get(health)).merge(verify)
}
