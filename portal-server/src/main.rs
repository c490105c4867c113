//! portal-server: speaker portal HTTP service
//!
//! Serves the speaker form flow, the admin console API and the external
//! roster webhook on one port.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use portal_common::api::auth::{initialize_admin_key, AdminKeySetup};
use portal_common::config::{ConfigOverrides, PortalConfig, TomlConfig};
use portal_common::db::init_database;
use portal_common::events::EventBus;
use portal_server::external::RestDirectoryClient;
use portal_server::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Broadcast capacity for the admin event stream
const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for portal-server
#[derive(Parser, Debug)]
#[command(name = "portal-server")]
#[command(about = "Conference speaker portal")]
#[command(version)]
struct Args {
    /// Config file (default: platform config directory)
    #[arg(short, long, env = "PORTAL_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding portal.db and uploads
    #[arg(short, long, env = "PORTAL_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "PORTAL_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORTAL_PORT")]
    port: Option<u16>,

    /// Base URL of the external datastore
    #[arg(long, env = "PORTAL_EXTERNAL_URL")]
    external_url: Option<String>,

    /// Service key for the external datastore
    #[arg(long, env = "PORTAL_EXTERNAL_SERVICE_KEY", hide_env_values = true)]
    external_service_key: Option<String>,

    /// Secret expected in the x-webhook-secret header
    #[arg(long, env = "PORTAL_WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: Option<String>,

    /// Admin key for /api/admin routes
    #[arg(long, env = "PORTAL_ADMIN_KEY", hide_env_values = true)]
    admin_key: Option<String>,

    /// Largest accepted upload in bytes
    #[arg(long, env = "PORTAL_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PORTAL_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            root_folder: self.root_folder.clone(),
            bind: self.bind.clone(),
            port: self.port,
            external_url: self.external_url.clone(),
            external_service_key: self.external_service_key.clone(),
            webhook_secret: self.webhook_secret.clone(),
            admin_key: self.admin_key.clone(),
            max_upload_bytes: self.max_upload_bytes,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing starts so its log level can seed the filter
    let toml = TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;
    let config = PortalConfig::resolve(args.overrides(), toml);

    let default_filter = format!(
        "portal_server={level},portal_common={level},tower_http={level}",
        level = config.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting speaker portal v{}", env!("CARGO_PKG_VERSION"));
    info!("Root folder: {}", config.root_folder.display());

    config
        .ensure_directories()
        .context("Failed to create root folder")?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    let admin_key = initialize_admin_key(&pool, config.admin_key.as_deref())
        .await
        .context("Failed to initialize admin key")?;
    match &admin_key {
        AdminKeySetup::Configured { .. } => info!("✓ Admin key loaded from configuration"),
        AdminKeySetup::Existing { .. } => info!("✓ Using stored admin key"),
        AdminKeySetup::Generated { key, .. } => {
            warn!("Generated new admin key (shown once, store it now): {}", key)
        }
        AdminKeySetup::Disabled => warn!("Admin authentication disabled (empty stored key)"),
    }

    let mut state = AppState::new(pool, EventBus::new(EVENT_BUS_CAPACITY), config.uploads_dir())
        .with_admin_key_digest(admin_key.digest())
        .with_webhook_secret(config.webhook_secret.clone())
        .with_max_upload_bytes(config.max_upload_bytes);

    match &config.external {
        Some(external) => {
            let client = RestDirectoryClient::new(external)
                .context("Failed to build external datastore client")?;
            info!("External datastore: {}", external.url);
            state = state.with_directory(Arc::new(client));
        }
        None => warn!("External datastore not configured; sync endpoints will return 502"),
    }

    if config.webhook_secret.is_none() {
        warn!("No webhook secret configured; webhooks are accepted without verification");
    }

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("portal-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
