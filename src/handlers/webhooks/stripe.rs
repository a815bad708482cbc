use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::db::AppState;
use crate::error::Result;
use crate::license::{IssuedLicense, issue_license};
use crate::payments::{CHECKOUT_SESSION_COMPLETED, StripeCheckoutSession, StripeWebhookEvent};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    // Nothing below runs for an unauthenticated payload
    let event = match state.verifier.construct_event(&body, signature) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected Stripe webhook");
            return (StatusCode::BAD_REQUEST, format!("Webhook Error: {}", e)).into_response();
        }
    };

    match event.event_type.as_str() {
        CHECKOUT_SESSION_COMPLETED => {
            if let Err(e) = handle_checkout_completed(&state, &event).await {
                return e.into_response();
            }
        }
        other => {
            tracing::debug!(event_id = %event.id, event_type = %other, "Stripe event ignored");
        }
    }

    Json(WebhookAck { received: true }).into_response()
}

/// Issue or reuse the purchaser's license and email it to them.
///
/// Returns `Ok(None)` when the session carries no usable email.
async fn handle_checkout_completed(
    state: &AppState,
    event: &StripeWebhookEvent,
) -> Result<Option<IssuedLicense>> {
    let session = StripeCheckoutSession::from_object(&event.data.object);

    let Some(email) = session.purchaser_email() else {
        tracing::info!(event_id = %event.id, "Checkout completed without an email, no license issued");
        return Ok(None);
    };

    let issued = issue_license(
        state.store.as_ref(),
        email,
        session.customer.clone(),
        session.id.clone(),
    )
    .await?;

    tracing::info!(
        event_id = %event.id,
        email = %email,
        license_key = %issued.license.license_key,
        reused = issued.reused,
        "License issued for checkout"
    );

    // The license is already stored; a failed email must not fail the webhook
    if let Err(e) = state
        .notifier
        .send_license_key(email, &issued.license.license_key)
        .await
    {
        tracing::error!(email = %email, error = %e, "Failed to send license email");
    }

    Ok(Some(issued))
}
