//! License store backed by a Supabase project, spoken to over its
//! PostgREST interface with the service-role key.

use async_trait::async_trait;
use reqwest::{Client, Response};

use super::LicenseStore;
use crate::error::{AppError, Result};
use crate::models::License;

const SELECT_COLS: &str = "license_key,email,stripe_customer_id,stripe_session_id,status";

#[derive(Clone)]
pub struct PostgrestLicenseStore {
    client: Client,
    /// `{project}/rest/v1/licenses`
    table_url: String,
    service_key: String,
}

impl PostgrestLicenseStore {
    pub fn new(project_url: &str, service_key: &str) -> Self {
        Self {
            client: Client::new(),
            table_url: format!("{}/rest/v1/licenses", project_url.trim_end_matches('/')),
            service_key: service_key.to_string(),
        }
    }

    /// Single-row lookup on `column = value`.
    async fn fetch_one(&self, column: &str, value: &str) -> Result<Option<License>> {
        let url = format!(
            "{}?select={}&{}=eq.{}&limit=1",
            self.table_url,
            SELECT_COLS,
            column,
            urlencoding::encode(value)
        );

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Supabase request failed: {}", e)))?;

        let response = check_status(response).await?;
        let rows: Vec<License> = response
            .json()
            .await
            .map_err(|e| AppError::Database(format!("Supabase response invalid: {}", e)))?;

        Ok(rows.into_iter().next())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Database(format!("Supabase returned {}: {}", status, body)))
}

#[async_trait]
impl LicenseStore for PostgrestLicenseStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<License>> {
        self.fetch_one("email", email).await
    }

    async fn find_by_key(&self, license_key: &str) -> Result<Option<License>> {
        self.fetch_one("license_key", license_key).await
    }

    async fn upsert_license(&self, license: &License) -> Result<()> {
        let response = self
            .client
            .post(format!("{}?on_conflict=license_key", self.table_url))
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(license)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Supabase request failed: {}", e)))?;

        check_status(response).await?;
        Ok(())
    }
}
