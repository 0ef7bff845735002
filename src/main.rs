//! Kanban server binary.
//!
//! Resolves configuration from CLI flags and the environment, opens the
//! database, and serves the JSON API until interrupted.

use anyhow::Result;
use clap::Parser;
use kanban_server::api::{self, AppState};
use kanban_server::auth::AuthContext;
use kanban_server::config::Config;
use kanban_server::db::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kanban-server", version, about = "Multi-tenant kanban backend")]
struct Cli {
    /// SQLite database path (overrides KANBAN_DATABASE).
    #[arg(long)]
    database: Option<String>,

    /// Bind address, e.g. 127.0.0.1:8700 (overrides KANBAN_BIND_ADDR).
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    config.validate()?;

    run_server(config).await
}

async fn run_server(config: Config) -> Result<()> {
    info!("Starting kanban server v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_path);

    let db = Database::open(&config.database_path)?;
    info!("Database initialized successfully");

    let auth = AuthContext::new(
        &config.jwt_secret,
        config.jwt_expiry_hours,
        config.bcrypt_cost,
    );
    let app = api::router(AppState { db, auth });

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
