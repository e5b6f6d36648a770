//! Tool trait and registry
//!
//! Tools are the only place the advisor touches market data or the web.
//! Member agents pick tools by name; the LLM never calls them directly.

use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::models::{Ticker, ToolInput, ToolOutput};
use crate::Result;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub mod web_search;
pub mod yahoo;

pub use web_search::WebSearchTool;
pub use yahoo::{
    AnalystRecommendationsTool, CompanyNewsTool, StockFundamentalsTool, StockPriceTool,
    YahooFinanceClient,
};

pub const WEB_SEARCH: &str = "web_search";
pub const STOCK_PRICE: &str = "stock_price";
pub const ANALYST_RECOMMENDATIONS: &str = "analyst_recommendations";
pub const STOCK_FUNDAMENTALS: &str = "stock_fundamentals";
pub const COMPANY_NEWS: &str = "company_news";

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Look up a tool that must exist
    pub fn require(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.get(name)
            .ok_or_else(|| AdvisorError::ToolNotFound(name.to_string()))
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client shared by the data tools
pub(crate) fn build_tool_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .timeout(timeout)
        // Yahoo rejects requests without a browser-like agent
        .user_agent("Mozilla/5.0 (compatible; multi-agent-advisor/0.1)")
        .build()
        .map_err(AdvisorError::from)
}

fn ensure_object_parameters(input: &ToolInput) -> Result<()> {
    if input.parameters.is_object() {
        Ok(())
    } else {
        Err(AdvisorError::InvalidToolInput(
            "tool_input must be a JSON object".to_string(),
        ))
    }
}

pub(crate) fn require_str<'a>(input: &'a ToolInput, key: &str) -> Result<&'a str> {
    ensure_object_parameters(input)?;
    input
        .parameters
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AdvisorError::InvalidToolInput(format!(
                "Expected '{}' in {} tool_input",
                key, input.tool_name
            ))
        })
}

/// Finance tools refuse to run without a precise ticker symbol
pub(crate) fn require_ticker(input: &ToolInput) -> Result<Ticker> {
    let raw = require_str(input, "symbol")?;
    Ticker::parse(raw).ok_or_else(|| {
        AdvisorError::InvalidToolInput(format!("'{}' is not a valid ticker symbol", raw))
    })
}

pub(crate) fn optional_usize(input: &ToolInput, key: &str, default: usize) -> usize {
    input
        .parameters
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(default)
}

/// Create the registry with web search and Yahoo Finance tools.
pub fn create_default_registry(config: &AdvisorConfig) -> Result<ToolRegistry> {
    let client = build_tool_client(config.http_timeout)?;
    let yahoo = YahooFinanceClient::new(client.clone(), config.yahoo_base_url.clone());

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WebSearchTool::new(
        client,
        config.search_base_url.clone(),
    )));
    registry.register(Arc::new(StockPriceTool::new(yahoo.clone())));
    registry.register(Arc::new(AnalystRecommendationsTool::new(yahoo.clone())));
    registry.register(Arc::new(StockFundamentalsTool::new(yahoo.clone())));
    registry.register(Arc::new(CompanyNewsTool::new(yahoo)));

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_registry_lists_tools() {
        let registry = create_default_registry(&AdvisorConfig::default()).unwrap();
        assert_eq!(
            registry.list(),
            vec![
                ANALYST_RECOMMENDATIONS,
                COMPANY_NEWS,
                STOCK_FUNDAMENTALS,
                STOCK_PRICE,
                WEB_SEARCH
            ]
        );
        assert!(registry.get("backtester").is_none());
        assert!(matches!(
            registry.require("backtester"),
            Err(AdvisorError::ToolNotFound(_))
        ));
    }

    #[test]
    fn test_require_ticker() {
        let input = ToolInput {
            tool_name: STOCK_PRICE.to_string(),
            parameters: json!({ "symbol": "tsla" }),
        };
        assert_eq!(require_ticker(&input).unwrap().as_str(), "TSLA");

        let input = ToolInput {
            tool_name: STOCK_PRICE.to_string(),
            parameters: json!({ "symbol": "Tesla Inc" }),
        };
        assert!(matches!(
            require_ticker(&input),
            Err(AdvisorError::InvalidToolInput(_))
        ));

        let input = ToolInput {
            tool_name: STOCK_PRICE.to_string(),
            parameters: json!("TSLA"),
        };
        assert!(matches!(
            require_ticker(&input),
            Err(AdvisorError::InvalidToolInput(_))
        ));
    }
}
