use async_trait::async_trait;

use super::{DbPool, LicenseStore, queries};
use crate::error::Result;
use crate::models::License;

/// License store backed by a local SQLite file.
#[derive(Clone)]
pub struct SqliteLicenseStore {
    pool: DbPool,
}

impl SqliteLicenseStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl LicenseStore for SqliteLicenseStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<License>> {
        let conn = self.pool.get()?;
        queries::get_license_by_email(&conn, email)
    }

    async fn find_by_key(&self, license_key: &str) -> Result<Option<License>> {
        let conn = self.pool.get()?;
        queries::get_license_by_key(&conn, license_key)
    }

    async fn upsert_license(&self, license: &License) -> Result<()> {
        let conn = self.pool.get()?;
        queries::upsert_license(&conn, license)
    }
}
