use multi_agent_advisor::{agent::Orchestrator, api::start_server, config::AdvisorConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables first so RUST_LOG from .env applies
    let config = AdvisorConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Multi-Agent Financial Advisor - API Server");
    info!(
        provider = %config.provider,
        model = config.model(),
        address = %config.bind_address(),
        "Configuration loaded"
    );

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    info!(
        store = orchestrator.store().backend(),
        "Orchestrator initialized"
    );

    start_server(orchestrator, &config.bind_address()).await?;

    Ok(())
}
