//! Kitab Ghar API server binary.

use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use kitab_api::config::ApiConfig;
use kitab_core::auth::token::TokenIssuer;
use kitab_core::store::pg::{PgIdentityStore, PgProfileStore};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "kitab_server", about = "Kitab Ghar API server")]
struct Args {
    /// Port to listen on (0 = ephemeral).
    #[arg(long, default_value_t = 3100)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/kitab_ghar"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kitab_api=debug,kitab_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    info!(database_url = %args.database_url, port = args.port, "starting kitab_server");

    // Fails here when the signing secret is unset or empty.
    let mut config = ApiConfig::from_env()?;
    config.bind_addr = format!("127.0.0.1:{}", args.port);
    config.database_url = args.database_url;
    let issuer = TokenIssuer::new(&config.token)?;

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    kitab_core::migrate::migrate(&pool).await?;

    let state = kitab_api::AppState {
        identities: Arc::new(PgIdentityStore::new(pool.clone())),
        profiles: Arc::new(PgProfileStore::new(pool)),
        issuer: Arc::new(issuer),
        config: config.clone(),
    };

    let app = kitab_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
