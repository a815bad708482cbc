use std::env;

const DEFAULT_FROM_EMAIL: &str = "noreply@yourdomain.com";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite file used when no Supabase project is configured
    pub database_path: String,
    /// Supabase project URL (PostgREST lives under `/rest/v1`)
    pub supabase_url: Option<String>,
    /// Service-role key; bypasses row-level security
    pub supabase_service_role_key: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    /// Maximum age of a signed webhook timestamp (0 = no limit)
    pub webhook_tolerance_secs: i64,
    pub resend_api_key: Option<String>,
    pub license_from_email: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let webhook_tolerance_secs: i64 = env::var("WEBHOOK_TOLERANCE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v: &i64| *v >= 0)
            .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "licenses.db".to_string()),
            supabase_url: non_empty_var("SUPABASE_URL"),
            supabase_service_role_key: non_empty_var("SUPABASE_SERVICE_ROLE_KEY"),
            stripe_secret_key: non_empty_var("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: non_empty_var("STRIPE_WEBHOOK_SECRET"),
            webhook_tolerance_secs,
            resend_api_key: non_empty_var("RESEND_API_KEY"),
            license_from_email: non_empty_var("LICENSE_FROM_EMAIL")
                .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Supabase URL and service-role key, when both are present.
    pub fn supabase(&self) -> Option<(&str, &str)> {
        match (&self.supabase_url, &self.supabase_service_role_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }
}

/// Unset and empty variables are treated the same.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
