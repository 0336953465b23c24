// api-gateway-rs/src/main.rs
// AI gateway - HTTP entry point in front of the local LLM backend
// Port 8000 unless AI_GATEWAY_SERVICE_PORT / AI_GATEWAY_SERVICE_ADDR say otherwise

use config_rs::GatewayConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv::dotenv().ok();

    // `log` records from the client crates are bridged into tracing by `init`
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env();
    api_gateway::serve(config).await?;

    Ok(())
}
