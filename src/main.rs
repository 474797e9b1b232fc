use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use heatbox::config::Config;
use heatbox::handlers;
use heatbox::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "heatbox")]
#[command(about = "Heat-planning geodata API server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env()?;
    let state = Arc::new(AppState::new(&config)?);
    info!(
        tile_cache_capacity = config.tile_cache_capacity.get(),
        "state initialized"
    );

    let app = handlers::router(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
