mod stripe;

pub use stripe::*;

/// Why an inbound webhook was refused. The message is returned to the sender.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("No stripe-signature header value was provided.")]
    MissingHeader,

    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    #[error("No signatures found matching the expected signature for payload")]
    NoMatchingSignature,

    #[error("Timestamp outside the tolerance zone")]
    TimestampOutsideTolerance,

    #[error("Webhook secret is not a usable HMAC key")]
    InvalidSecret,

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

/// Authenticates a raw webhook body and turns it into an event.
pub trait EventVerifier: Send + Sync {
    fn construct_event(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<StripeWebhookEvent, SignatureError>;
}
