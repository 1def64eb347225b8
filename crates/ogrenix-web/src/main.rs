//! Ogrenix lesson server.
//!
//! Run with: cargo run -p ogrenix-web

use std::net::{IpAddr, SocketAddr};

use tracing::info;
use tracing_subscriber::EnvFilter;

use ogrenix_config::Config;
use ogrenix_web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Ogrenix lesson server...");

    let config = Config::load()?;
    let host: IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::new(host, config.server.port);
    info!(model = %config.llm.model, base_url = %config.llm.base_url, "backend configured");

    let state = AppState::from_config(config);
    let app = ogrenix_web::router::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 Lesson server listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
