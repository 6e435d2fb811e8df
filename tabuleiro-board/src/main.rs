//! tabuleiro-board - HTTP service for the board progression flow
//!
//! Serves progress, answer grading, hints, history, checkout and the
//! Stripe webhook behind an authenticating proxy.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tabuleiro_board::billing::{CheckoutProvider, StripeClient};
use tabuleiro_board::mentor::{GeminiClient, Mentor, TextGenerator, UnconfiguredGenerator};
use tabuleiro_board::progression::ProgressionController;
use tabuleiro_board::store::{AccountStore, ProgressStore, SqliteStore, UnavailableStore};
use tabuleiro_board::{build_router, AppState, DEFAULT_BIND_ADDRESS, DEFAULT_PORT};
use tabuleiro_common::config::{self, TomlConfig};
use tabuleiro_common::db::{self, RuntimeSettings};
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for tabuleiro-board
#[derive(Parser, Debug)]
#[command(name = "tabuleiro-board")]
#[command(about = "Progression service for O Tabuleiro da Dominação")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "TABULEIRO_PORT")]
    port: Option<u16>,

    /// Root folder holding tabuleiro.db
    #[arg(short, long, env = "TABULEIRO_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Config file (default: ~/.config/tabuleiro/config.toml)
    #[arg(short, long, env = "TABULEIRO_CONFIG")]
    config: Option<PathBuf>,

    /// Run without a database; every store operation reports unavailable
    #[arg(long)]
    no_database: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load_or_default(args.config.as_deref());

    // RUST_LOG wins over the config file level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level)),
        )
        .init();

    info!("Starting tabuleiro-board v{}", env!("CARGO_PKG_VERSION"));

    let owner_open_id = config::resolve_secret(
        "OWNER_OPEN_ID",
        toml_config.owner_open_id.as_deref(),
        "Owner open-id",
    );

    let (progress_store, accounts, settings): (Arc<dyn ProgressStore>, Arc<dyn AccountStore>, RuntimeSettings) =
        if args.no_database {
            warn!("Running without a database: board operations will report unavailable");
            let progress: Arc<dyn ProgressStore> = Arc::new(UnavailableStore);
            let accounts: Arc<dyn AccountStore> = Arc::new(UnavailableStore);
            (progress, accounts, RuntimeSettings::default())
        } else {
            let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
            std::fs::create_dir_all(&root_folder)
                .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;

            let db_path = config::database_path(&root_folder);
            info!("Database path: {}", db_path.display());

            let pool = db::init_database(&db_path)
                .await
                .context("Failed to initialize database")?;
            let settings = RuntimeSettings::load(&pool)
                .await
                .context("Failed to load runtime settings")?;
            info!(
                approval_reward_xp = settings.approval_reward_xp,
                min_answer_chars = settings.min_answer_chars,
                "Loaded runtime settings"
            );

            let store = Arc::new(SqliteStore::new(pool).with_owner(owner_open_id));
            let progress: Arc<dyn ProgressStore> = store.clone();
            let accounts: Arc<dyn AccountStore> = store;
            (progress, accounts, settings)
        };

    let generator: Arc<dyn TextGenerator> = match config::resolve_secret(
        "GEMINI_API_KEY",
        toml_config.mentor.api_key.as_deref(),
        "Gemini API key",
    ) {
        Some(key) => {
            info!(model = %toml_config.mentor.model, "Mentor enabled");
            Arc::new(GeminiClient::from_config(&toml_config.mentor, key)?)
        }
        None => {
            warn!("No Gemini API key configured: every answer will be rejected");
            Arc::new(UnconfiguredGenerator)
        }
    };
    let mentor = Arc::new(Mentor::new(generator, settings.approval_reward_xp));
    let controller = Arc::new(ProgressionController::new(progress_store, mentor));

    let checkout: Option<Arc<dyn CheckoutProvider>> = match config::resolve_secret(
        "STRIPE_SECRET_KEY",
        toml_config.billing.secret_key.as_deref(),
        "Stripe secret key",
    ) {
        Some(key) => {
            let client: Arc<dyn CheckoutProvider> = Arc::new(StripeClient::new(key, &toml_config.billing)?);
            Some(client)
        }
        None => {
            warn!("No Stripe secret key configured: checkout disabled");
            None
        }
    };

    let webhook_secret = config::resolve_secret(
        "STRIPE_WEBHOOK_SECRET",
        toml_config.billing.webhook_secret.as_deref(),
        "Stripe webhook secret",
    );
    if webhook_secret.is_none() {
        warn!("No Stripe webhook secret configured: webhooks will be rejected");
    }

    let state = AppState::new(controller, accounts, settings)
        .with_checkout(checkout)
        .with_webhook_secret(webhook_secret);
    let app = build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let bind_address = toml_config
        .bind_address
        .as_deref()
        .unwrap_or(DEFAULT_BIND_ADDRESS);
    let addr = format!("{}:{}", bind_address, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("tabuleiro-board listening on http://{}", addr);
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
