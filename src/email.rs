//! Purchase notification emails.
//!
//! Sent through the Resend API when a key is configured; otherwise the
//! send is skipped and only logged.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

pub const LICENSE_EMAIL_SUBJECT: &str = "Your ClickEffects Pro License Key";

/// Result of attempting to send a license email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    /// Email was accepted by Resend
    Sent,
    /// No API key configured
    Disabled,
}

/// Delivers the license key to the purchaser.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_license_key(&self, to_email: &str, license_key: &str) -> Result<EmailSendResult>;
}

/// Resend API request body.
#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: String,
    html: String,
}

/// Resend API response.
#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    #[allow(dead_code)]
    id: String,
}

#[derive(Clone)]
pub struct EmailService {
    api_key: Option<String>,
    from_email: String,
    api_url: String,
    http_client: Client,
}

impl EmailService {
    pub fn new(api_key: Option<String>, from_email: String) -> Self {
        Self {
            api_key,
            from_email,
            api_url: RESEND_API_URL.to_string(),
            http_client: Client::new(),
        }
    }

    /// Point at a different Resend-compatible endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

pub fn license_email_text(license_key: &str) -> String {
    format!(
        "Thanks for your purchase!\n\nHere is your ClickEffects Pro license key:\n\n{}\n\nOpen the extension's Options page, paste this key, and click Activate.\n\nTip: save or screenshot this email for your records.",
        license_key
    )
}

pub fn license_email_html(license_key: &str) -> String {
    format!(
        r#"<div style="font-family:system-ui,Segoe UI,Roboto,Arial">
<h2>Thanks for your purchase!</h2>
<p>Here is your ClickEffects Pro license key:</p>
<p style="font-size:20px;font-weight:700;padding:10px 14px;background:#0f1220;color:#e6ecff;border-radius:10px;display:inline-block">
{}
</p>
<p>Open the extension's Options page, paste this key, and click <b>Activate</b>.</p>
<p style="color:#8ea0d0">Tip: save or screenshot this email for your records.</p>
</div>"#,
        license_key
    )
}

#[async_trait]
impl Notifier for EmailService {
    async fn send_license_key(&self, to_email: &str, license_key: &str) -> Result<EmailSendResult> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(to = %to_email, "No Resend API key configured, license email not sent");
            return Ok(EmailSendResult::Disabled);
        };

        let request = ResendEmailRequest {
            from: &self.from_email,
            to: vec![to_email],
            subject: LICENSE_EMAIL_SUBJECT,
            text: license_email_text(license_key),
            html: license_email_html(license_key),
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Email service error: {}", e)))?;

        if response.status().is_success() {
            let _result: ResendEmailResponse = response
                .json()
                .await
                .map_err(|e| AppError::Internal(format!("Email service response error: {}", e)))?;

            tracing::info!(to = %to_email, "License email sent via Resend");
            Ok(EmailSendResult::Sent)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AppError::Internal(format!(
                "Email service error: {} - {}",
                status, body
            )))
        }
    }
}
