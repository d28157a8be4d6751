//! Accord API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use accord_api::config::ApiConfig;
use accord_core::store::{AccountStore, MemoryAccountStore, PgAccountStore};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "accord_api_server", about = "Accord account and login API")]
struct Args {
    /// Port to listen on, overriding the port of `BIND_ADDR` (0 = ephemeral).
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Keep accounts in process memory instead of PostgreSQL. Data is lost on exit.
    #[arg(long, env = "ACCORD_IN_MEMORY", default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let mut config = ApiConfig::from_env()?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.env.default_log_filter())),
        )
        .init();

    let mut bind_addr: SocketAddr = config.bind_addr.parse()?;
    if let Some(port) = args.port {
        bind_addr.set_port(port);
    }

    info!(env = %config.env, addr = %bind_addr, in_memory = args.in_memory, "starting accord_api_server");

    let store: Arc<dyn AccountStore> = if args.in_memory {
        warn!("using in-memory account store; accounts do not survive restart");
        Arc::new(MemoryAccountStore::new())
    } else {
        info!(max_connections = args.max_connections, "configuring connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&config.database_url)
            .await?;
        let store = PgAccountStore::new(pool);
        info!("running database migrations");
        store.migrate().await?;
        Arc::new(store)
    };

    let state = accord_api::AppState::new(config, store)?;
    let providers: Vec<String> = state
        .authenticator
        .providers()
        .map(|p| p.to_string())
        .collect();
    if providers.is_empty() {
        info!("no OAuth providers configured");
    } else {
        info!(providers = ?providers, "OAuth providers configured");
    }
    let _cleanup = state.authenticator.states().spawn_cleanup_task();

    let app = accord_api::router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
