use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meetlink_backend::calendar::GoogleCalendar;
use meetlink_backend::config::{self, AppConfig};
use meetlink_backend::consent::InstalledFlowConsent;
use meetlink_backend::credentials::{CredentialManager, TokenStore};
use meetlink_backend::scheduler::EventTemplate;
use meetlink_backend::{create_app, AppState};

const DEFAULT_LOG_FILTER: &str = "meetlink_backend=debug,meetlink=debug,tower_http=debug";

/// `RUST_LOG` when set, else the crate's debug defaults.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` first so RUST_LOG from it reaches the filter
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(log_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    // Load configuration
    let config = AppConfig::from_env()?;
    let secret = config::load_client_secret(&config)?;

    tracing::info!(
        "Starting meeting scheduler (time zone {}, token file {})",
        config.time_zone,
        config.token_path.display()
    );

    let credentials = CredentialManager::new(
        TokenStore::new(&config.token_path),
        secret,
        Arc::new(InstalledFlowConsent::new(config.consent_redirect_port)),
    );
    let state = AppState::new(
        credentials,
        Arc::new(GoogleCalendar::new(config.calendar_id.clone())),
        EventTemplate::new(config.time_zone),
    );

    let app = create_app(state, config.cors_allowed_origins.as_deref());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server started on port {}", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
