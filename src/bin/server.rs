//! market-mcp HTTP server binary.
//!
//! Startup is strictly ordered: settings are validated, the provider
//! client is built, and every capability is registered before the
//! listener accepts its first connection. Any registration failure
//! aborts startup with a diagnostic.
//!
//! # Environment Variables
//!
//! - `FINNHUB_API_KEY` (required)
//! - `FINNHUB_BASE_URL`: Finnhub API base (default: https://finnhub.io/api/v1)
//! - `MCP_PORT`: HTTP port (default: 9001)
//! - `API_TIMEOUT`: provider request timeout in seconds (default: 30)
//! - `RUST_LOG`: tracing filter (default: "info,market_mcp=debug")

use std::sync::Arc;

use market_mcp::market::{register_all, FinnhubClient};
use market_mcp::registry::Registry;
use market_mcp::server::{app_router, AppState};
use market_mcp::{McpService, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,market_mcp=debug".into()),
        )
        .init();

    let settings = Settings::from_env()?;
    let provider = Arc::new(FinnhubClient::new(
        settings.finnhub_api_key.clone(),
        settings.finnhub_base_url.clone(),
        settings.api_timeout,
    )?);

    let mut registry = Registry::new();
    register_all(&mut registry, provider.clone())?;
    tracing::info!(
        app = %settings.app_name,
        capabilities = registry.len(),
        "registry initialized"
    );

    let service = Arc::new(McpService::new(Arc::new(registry), provider));
    let app = app_router(AppState { service });

    let bind_addr = format!("0.0.0.0:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, version = market_mcp::VERSION, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
