use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use clickeffects_license::config::Config;
use clickeffects_license::db::{
    self, AppState, LicenseStore, PostgrestLicenseStore, SqliteLicenseStore,
};
use clickeffects_license::email::EmailService;
use clickeffects_license::payments::{StripeClient, StripeConfig};

#[derive(Parser, Debug)]
#[command(name = "clickeffects-license", version, about = "License issuance and verification service")]
struct Cli {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database file (overrides DATABASE_PATH)
    #[arg(long)]
    database_path: Option<String>,
}

fn build_store(config: &Config) -> anyhow::Result<Arc<dyn LicenseStore>> {
    if let Some((url, key)) = config.supabase() {
        tracing::info!(supabase_url = %url, "Using Supabase license store");
        return Ok(Arc::new(PostgrestLicenseStore::new(url, key)));
    }

    tracing::info!(database_path = %config.database_path, "Using SQLite license store");
    let pool = db::create_pool(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path))?;
    {
        let conn = pool.get().context("acquiring database connection")?;
        db::init_db(&conn).context("initializing schema")?;
    }
    Ok(Arc::new(SqliteLicenseStore::new(pool)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clickeffects_license=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(path) = cli.database_path {
        config.database_path = path;
    }

    let webhook_secret = config
        .stripe_webhook_secret
        .clone()
        .context("STRIPE_WEBHOOK_SECRET must be set")?;
    let stripe = StripeClient::new(&StripeConfig::from_config(&config, webhook_secret));
    tracing::info!(live_mode = stripe.is_live_mode(), "Stripe webhook verification configured");

    let email = EmailService::new(config.resend_api_key.clone(), config.license_from_email.clone());
    if !email.is_enabled() {
        tracing::warn!("RESEND_API_KEY not set, license emails will be skipped");
    }

    let state = AppState {
        store: build_store(&config)?,
        verifier: Arc::new(stripe),
        notifier: Arc::new(email),
    };

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, clickeffects_license::app(state)).await?;
    Ok(())
}
