use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{EventVerifier, SignatureError};
use crate::config::Config;

type HmacSha256 = Hmac<Sha256>;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// API secret key; only its mode is inspected, the webhook path never calls Stripe
    pub secret_key: Option<String>,
    pub webhook_secret: String,
    /// Maximum age of the signed timestamp in seconds (0 disables the check)
    pub tolerance_secs: i64,
}

impl StripeConfig {
    pub fn from_config(config: &Config, webhook_secret: String) -> Self {
        Self {
            secret_key: config.stripe_secret_key.clone(),
            webhook_secret,
            tolerance_secs: config.webhook_tolerance_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    secret_key: Option<String>,
    webhook_secret: String,
    tolerance_secs: i64,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            tolerance_secs: config.tolerance_secs,
        }
    }

    /// True when configured with a live-mode (`sk_live_`/`rk_live_`) key.
    pub fn is_live_mode(&self) -> bool {
        self.secret_key
            .as_deref()
            .map(|k| k.starts_with("sk_live_") || k.starts_with("rk_live_"))
            .unwrap_or(false)
    }

    /// Check a `stripe-signature` header (`t=...,v1=...`) against the raw body.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<(), SignatureError> {
        self.verify_webhook_signature_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    fn verify_webhook_signature_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<(), SignatureError> {
        let mut raw_timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => raw_timestamp = Some(value),
                    "v1" => signatures.push(value),
                    _ => {}
                }
            }
        }

        // The signed string uses the timestamp exactly as sent
        let (Some(raw_timestamp), Some(timestamp)) = (
            raw_timestamp,
            raw_timestamp.and_then(|t| t.parse::<i64>().ok()),
        ) else {
            return Err(SignatureError::MalformedHeader);
        };
        if signatures.is_empty() {
            return Err(SignatureError::MalformedHeader);
        }

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(raw_timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        let matched = signatures
            .iter()
            .any(|sig| bool::from(expected.as_bytes().ct_eq(sig.as_bytes())));
        if !matched {
            return Err(SignatureError::NoMatchingSignature);
        }

        if self.tolerance_secs > 0 && now.saturating_sub(timestamp) > self.tolerance_secs {
            return Err(SignatureError::TimestampOutsideTolerance);
        }

        Ok(())
    }
}

impl EventVerifier for StripeClient {
    fn construct_event(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<StripeWebhookEvent, SignatureError> {
        let header = signature_header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(SignatureError::MissingHeader)?;

        self.verify_webhook_signature(payload, header)?;

        serde_json::from_slice(payload).map_err(SignatureError::InvalidPayload)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// The fields of a checkout session this service reads.
///
/// Built field by field from the event object, so an unexpected shape in one
/// field (an expanded `customer`, say) never hides the purchaser's email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub customer: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<StripeCustomerDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
}

fn string_field(object: &serde_json::Value, field: &str) -> Option<String> {
    object.get(field).and_then(|v| v.as_str()).map(String::from)
}

impl StripeCheckoutSession {
    pub fn from_object(object: &serde_json::Value) -> Self {
        // `customer` is an id, or the full object when the event was expanded
        let customer = match object.get("customer") {
            Some(serde_json::Value::String(id)) => Some(id.clone()),
            Some(expanded @ serde_json::Value::Object(_)) => string_field(expanded, "id"),
            _ => None,
        };

        Self {
            id: string_field(object, "id"),
            customer,
            customer_email: string_field(object, "customer_email"),
            customer_details: object
                .get("customer_details")
                .filter(|d| d.is_object())
                .map(|d| StripeCustomerDetails {
                    email: string_field(d, "email"),
                }),
        }
    }

    /// `customer_details.email`, falling back to `customer_email`. Empty values are skipped.
    pub fn purchaser_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .filter(|e| !e.is_empty())
            .or_else(|| self.customer_email.as_deref().filter(|e| !e.is_empty()))
    }
}
