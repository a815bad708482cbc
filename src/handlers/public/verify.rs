use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::AppError;
use crate::extractors::Query;
use crate::license::{is_valid_license_key, normalize_license_key};

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl VerifyResponse {
    fn valid(ok: bool) -> Self {
        Self { ok, reason: None }
    }

    fn rejected(reason: &'static str) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
        }
    }
}

/// Check whether a license key is known and active.
///
/// Malformed keys are an ordinary negative answer (200), not a client error.
/// An unparseable query string (e.g. `key` given twice) counts as malformed.
pub async fn verify_license(
    State(state): State<AppState>,
    query: std::result::Result<Query<VerifyQuery>, AppError>,
) -> (StatusCode, Json<VerifyResponse>) {
    let raw_key = match query {
        Ok(Query(q)) => q.key,
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable verify query");
            String::new()
        }
    };
    let key = normalize_license_key(&raw_key);
    if !is_valid_license_key(&key) {
        return (StatusCode::OK, Json(VerifyResponse::rejected("invalid_format")));
    }

    let license = match state.store.find_by_key(&key).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "License lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(VerifyResponse::rejected("db_error")),
            );
        }
    };

    let ok = license.is_some_and(|l| l.is_active());
    tracing::debug!(license_key = %key, ok, "License verified");

    (StatusCode::OK, Json(VerifyResponse::valid(ok)))
}

/// CORS preflight; the headers come from the router layer.
pub async fn verify_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}
