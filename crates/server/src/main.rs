use consent_bridge::AppState;
use consent_bridge::api::start_webserver;
use consent_bridge::config::{SessionBackend, load_config};
use consent_bridge::hydra::HydraAdminClient;
use consent_bridge::session::{DatabaseSessionStore, MemorySessionStore, SessionStore};
use rustls::crypto;
use rustls::crypto::CryptoProvider;
use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_standard_tracing() {
    let default_directives = "consent_bridge=info,hyper=warn,sea_orm=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    initialize_standard_tracing();

    let config = load_config()?;

    let ring_provider = crypto::ring::default_provider();
    if CryptoProvider::install_default(ring_provider).is_err() {
        tracing::debug!("A rustls crypto provider was already installed");
    }

    let store: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackend::Database => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| color_eyre::eyre::eyre!("database_url is not configured"))?;
            let db = Database::connect(url).await?;
            Arc::new(DatabaseSessionStore::new(Arc::new(db)))
        }
        SessionBackend::Memory => {
            tracing::warn!(
                "Using the in-memory session store; entries written by other processes are not visible"
            );
            Arc::new(MemorySessionStore::new())
        }
    };

    let backend = Arc::new(HydraAdminClient::new(
        &config.hydra.admin_url,
        config.hydra.request_timeout(),
    )?);

    tracing::info!(
        admin_url = %config.hydra.admin_url,
        session_backend = ?config.session.backend,
        remember_for_secs = config.session.consent_remember_for_secs,
        "consent bridge configuration"
    );

    let state = AppState::new(&config, store, backend);
    start_webserver(state, config.listen_addr).await?;
    Ok(())
}
