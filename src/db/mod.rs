pub mod queries;
mod postgrest;
mod sqlite;

pub use postgrest::PostgrestLicenseStore;
pub use sqlite::SqliteLicenseStore;

use std::sync::Arc;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::email::Notifier;
use crate::error::Result;
use crate::models::License;
use crate::payments::EventVerifier;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Persistence for license records, keyed by `license_key`.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// First license issued to this email, if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<License>>;

    /// Exact match on the (normalized) key.
    async fn find_by_key(&self, license_key: &str) -> Result<Option<License>>;

    /// Insert, or overwrite the row with the same `license_key`.
    async fn upsert_license(&self, license: &License) -> Result<()>;
}

/// Process-wide collaborators, built once at startup and cloned into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LicenseStore>,
    pub verifier: Arc<dyn EventVerifier>,
    pub notifier: Arc<dyn Notifier>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder().max_size(10).build(manager)?;
    Ok(pool)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS licenses (
             license_key TEXT PRIMARY KEY,
             email TEXT NOT NULL,
             stripe_customer_id TEXT,
             stripe_session_id TEXT,
             status TEXT DEFAULT 'active',
             created_at INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_licenses_email ON licenses(email);",
    )?;
    Ok(())
}
