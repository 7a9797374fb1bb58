use seatrelay::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: &str = "3001";

/// Builds the listen address from optional `HOST` / `PORT` values.
fn listen_addr(host: Option<String>, port: Option<String>) -> String {
    let host = host
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = port
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PORT.to_string());
    format!("{host}:{port}")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = listen_addr(std::env::var("HOST").ok(), std::env::var("PORT").ok());

    let server = RelayServer::builder().bind(&addr).build().await?;
    tracing::info!(%addr, "relay listening");

    server.run().await?;
    Ok(())
}
