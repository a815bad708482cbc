//! Shared fixtures for the HTTP-level tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use hmac::{Hmac, Mac};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::{Value, json};
use sha2::Sha256;
use tower::ServiceExt;

pub use clickeffects_license::db::{AppState, DbPool, LicenseStore, SqliteLicenseStore, queries};
pub use clickeffects_license::email::{EmailSendResult, Notifier};
pub use clickeffects_license::error::{AppError, Result};
pub use clickeffects_license::models::License;
pub use clickeffects_license::payments::{StripeClient, StripeConfig};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test123secret456";
pub const TEST_EMAIL: &str = "buyer@example.com";

/// In-memory database. A single connection, so every checkout sees the same data.
pub fn test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        clickeffects_license::db::init_db(&conn).unwrap();
    }
    pool
}

pub fn test_verifier() -> StripeClient {
    StripeClient::new(&StripeConfig {
        secret_key: Some("sk_test_xxx".to_string()),
        webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
        tolerance_secs: 300,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub license_key: String,
}

/// Notifier that records every send, optionally failing each one.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SentEmail>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_license_key(&self, to_email: &str, license_key: &str) -> Result<EmailSendResult> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to_email.to_string(),
            license_key: license_key.to_string(),
        });
        if self.fail {
            return Err(AppError::Internal("Email service error: 503".into()));
        }
        Ok(EmailSendResult::Sent)
    }
}

/// Store whose every call fails, standing in for an unreachable database.
pub struct FailingStore;

#[async_trait]
impl LicenseStore for FailingStore {
    async fn find_by_email(&self, _email: &str) -> Result<Option<License>> {
        Err(AppError::Database("connection refused".into()))
    }

    async fn find_by_key(&self, _license_key: &str) -> Result<Option<License>> {
        Err(AppError::Database("connection refused".into()))
    }

    async fn upsert_license(&self, _license: &License) -> Result<()> {
        Err(AppError::Database("connection refused".into()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_app() -> TestApp {
    test_app_with_notifier(RecordingNotifier::default())
}

pub fn test_app_with_notifier(notifier: RecordingNotifier) -> TestApp {
    let pool = test_pool();
    let notifier = Arc::new(notifier);
    let state = AppState {
        store: Arc::new(SqliteLicenseStore::new(pool.clone())),
        verifier: Arc::new(test_verifier()),
        notifier: notifier.clone(),
    };
    TestApp {
        router: clickeffects_license::app(state),
        pool,
        notifier,
    }
}

pub fn failing_store_app() -> Router {
    let state = AppState {
        store: Arc::new(FailingStore),
        verifier: Arc::new(test_verifier()),
        notifier: Arc::new(RecordingNotifier::default()),
    };
    clickeffects_license::app(state)
}

pub fn insert_license(pool: &DbPool, key: &str, email: &str, status: Option<&str>) {
    let conn = pool.get().unwrap();
    let license = License {
        license_key: key.to_string(),
        email: email.to_string(),
        stripe_customer_id: None,
        stripe_session_id: None,
        status: status.map(String::from),
    };
    queries::upsert_license(&conn, &license).unwrap();
}

pub fn license_for_email(pool: &DbPool, email: &str) -> Option<License> {
    let conn = pool.get().unwrap();
    queries::get_license_by_email(&conn, email).unwrap()
}

pub fn count_licenses_for_email(pool: &DbPool, email: &str) -> i64 {
    let conn = pool.get().unwrap();
    queries::count_licenses_for_email(&conn, email).unwrap()
}

pub fn count_all_licenses(pool: &DbPool) -> i64 {
    let conn = pool.get().unwrap();
    conn.query_row("SELECT COUNT(*) FROM licenses", [], |row| row.get(0))
        .unwrap()
}

/// `stripe-signature` header for `payload`, timestamped now.
pub fn sign_payload(payload: &str, secret: &str) -> String {
    type HmacSha256 = Hmac<Sha256>;

    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

pub fn checkout_completed_event(
    session_id: &str,
    customer_details_email: Option<&str>,
    customer_email: Option<&str>,
) -> String {
    json!({
        "id": format!("evt_{}", session_id),
        "object": "event",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "customer": "cus_test_123",
                "customer_email": customer_email,
                "customer_details": { "email": customer_details_email },
                "payment_status": "paid"
            }
        }
    })
    .to_string()
}

pub fn webhook_request(payload: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/stripe-webhook")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("stripe-signature", sig);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

pub fn signed_webhook_request(payload: &str) -> Request<Body> {
    let signature = sign_payload(payload, TEST_WEBHOOK_SECRET);
    webhook_request(payload, Some(&signature))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body should be JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}
