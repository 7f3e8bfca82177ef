// Main entry point for gatehouse

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gatehouse::api::{create_router, AppState};
use gatehouse::auth::audit_logger::AuditLogger;
use gatehouse::auth::identifier::Identifier;
use gatehouse::auth::middleware::AuthState;
use gatehouse::auth::token::TokenHash;
use gatehouse::auth::user_store::{DbUserStore, YamlUserStore};
use gatehouse::auth::AuthManager;
use gatehouse::config::Config;
use gatehouse::core::crypto::hash_password;
use gatehouse::rbac::{DbRbacStore, MemoryRbacStore, RbacStore};

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "gatehouse", version, about = "Authentication and RBAC service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print an argon2 PHC string for seeding a user's password_hash
    HashPassword { password: String },
    /// Print the lookup hash of a bearer token, using AUTH_TOKEN_HMAC_KEY
    HashToken { token: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
            Ok(())
        }
        Command::HashToken { token } => {
            let config = Config::from_env().context("Configuration error")?;
            let hash = TokenHash::compute(&token, config.auth.token_hmac_key.as_bytes())?;
            println!("{}", hash);
            Ok(())
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    // 1. Load and validate configuration first (before any logging)
    let config = Config::from_env().context("Configuration error")?;

    // 2. Initialize tracing subscriber with config values
    init_tracing(&config)?;

    info!("Starting gatehouse");
    info!(
        bind_address = %config.bind_address,
        port = config.port,
        strategies = ?config.auth.strategies,
        "Configuration loaded"
    );

    if config.auth.token_hmac_key.is_empty() {
        warn!("AUTH_TOKEN_HMAC_KEY is empty; bearer token hashes use an empty HMAC key");
    }

    // 3. Initialize database pool (if configured)
    let db_pool: Option<sqlx::PgPool> = match config.database_url {
        Some(ref database_url) => Some(
            sqlx::PgPool::connect(database_url)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to connect to database");
                    e
                })?,
        ),
        None => None,
    };

    if db_pool.is_some() {
        info!("Database pool initialized");
    }

    // 4. Initialize identifier (DB or YAML)
    let identifier: Arc<dyn Identifier> = if let Some(ref pool) = db_pool {
        Arc::new(DbUserStore::new(pool.clone(), config.auth.password_field.clone()))
    } else if let Some(ref users_path) = config.users_yaml_path {
        let store = YamlUserStore::from_file(users_path, config.auth.password_field.clone())
            .map_err(|e| {
                error!(error = %e, path = ?users_path, "Failed to load users");
                e
            })?;
        info!(users = store.len(), "Loaded users from YAML");
        Arc::new(store)
    } else {
        bail!("Either DATABASE_URL or USERS_YAML_PATH must be set");
    };

    // 5. Initialize RBAC store (DB, YAML seed, or empty in-memory)
    let rbac_store: Arc<dyn RbacStore> = if let Some(ref pool) = db_pool {
        Arc::new(DbRbacStore::new(pool.clone()))
    } else if let Some(ref rbac_path) = config.rbac_yaml_path {
        Arc::new(MemoryRbacStore::from_file(rbac_path).await.map_err(|e| {
            error!(error = %e, path = ?rbac_path, "Failed to load RBAC seed");
            e
        })?)
    } else {
        Arc::new(MemoryRbacStore::new())
    };

    info!("Identifier and RBAC store initialized");

    // 6. Build the strategy chain
    let manager = Arc::new(AuthManager::from_config(&config.auth, identifier)?);

    // 7. Initialize audit logger
    let audit_logger = Arc::new(AuditLogger::new(
        db_pool.clone().map(Arc::new),
        manager.kinds(),
    ));

    let auth_state = Arc::new(AuthState {
        manager,
        audit_logger,
        body_limit: config.body_size_limit_bytes,
    });

    let app_state = AppState {
        rbac_store,
        config: Arc::new(config.clone()),
    };

    // 8. Create router and start HTTP server
    let router = create_router(app_state, auth_state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind to address");
        e
    })?;

    info!(addr = %addr, "Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG overrides LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    let result = if config.log_format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
