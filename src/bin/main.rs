use multi_agent_advisor::{agent::Orchestrator, config::AdvisorConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AdvisorConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        eprintln!("Usage: advisor <question>");
        eprintln!("Example: advisor \"Summarize analyst recommendations for NVDA\"");
        std::process::exit(2);
    }

    let orchestrator = Orchestrator::from_config(&config)?;
    info!(provider = orchestrator.provider(), "Running one-shot query");

    match orchestrator.ask(&query).await {
        Ok(answer) => {
            println!("{}", answer.answer);

            if !answer.sources.is_empty() {
                println!("\nSources:");
                for (i, source) in answer.sources.iter().enumerate() {
                    println!("  {}. {} - {}", i + 1, source.title, source.url);
                }
            }

            println!("\nLog ID: {}", answer.log_id);
            println!("\nReasoning Trace:");
            for (i, trace) in answer.reasoning_trace.iter().enumerate() {
                println!("  {}: {}", i + 1, trace);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("An error occurred: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
