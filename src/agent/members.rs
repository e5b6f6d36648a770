//! Team members the orchestrator delegates to
//!
//! Each member owns a role and a fixed set of tools. Members never fail:
//! whatever they could not fetch shows up as a failed finding in the report.

use crate::execution::ExecutionEngine;
use crate::models::{AgentReport, FindingStatus, Source, Ticker};
use crate::tools::{
    ANALYST_RECOMMENDATIONS, COMPANY_NEWS, STOCK_FUNDAMENTALS, STOCK_PRICE, WEB_SEARCH,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub const WEB_SEARCH_AGENT: &str = "Web Search Agent";
pub const FINANCE_AGENT: &str = "Finance AI Agent";

/// Tools the finance agent runs for every ticker, in order
pub const FINANCE_TOOLS: &[&str] = &[
    STOCK_PRICE,
    ANALYST_RECOMMENDATIONS,
    STOCK_FUNDAMENTALS,
    COMPANY_NEWS,
];

/// What a member is asked to look into
#[derive(Debug, Clone)]
pub struct MemberTask {
    pub query: String,
    pub tickers: Vec<Ticker>,
}

#[async_trait]
pub trait MemberAgent: Send + Sync {
    fn name(&self) -> &'static str;
    fn role(&self) -> &'static str;
    async fn run(&self, task: &MemberTask) -> AgentReport;
}

//
// ================= Web Search Agent =================
//

pub struct WebSearchAgent {
    engine: Arc<ExecutionEngine>,
    max_results: usize,
}

impl WebSearchAgent {
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self {
            engine,
            max_results: 5,
        }
    }
}

#[async_trait]
impl MemberAgent for WebSearchAgent {
    fn name(&self) -> &'static str {
        WEB_SEARCH_AGENT
    }

    fn role(&self) -> &'static str {
        "Search the web for the information"
    }

    async fn run(&self, task: &MemberTask) -> AgentReport {
        let mut report = AgentReport::new(self.name());

        let finding = self
            .engine
            .execute(
                WEB_SEARCH,
                &task.query,
                json!({ "query": task.query, "max_results": self.max_results }),
            )
            .await;

        if finding.status == FindingStatus::Success {
            report.sources.extend(search_sources(&finding.data));
        }
        report.findings.push(finding);

        info!(
            agent = self.name(),
            sources = report.sources.len(),
            "Web search complete"
        );
        report
    }
}

fn search_sources(data: &Value) -> Vec<Source> {
    let mut sources = Vec::new();

    if let Some(url) = data.pointer("/abstract/url").and_then(Value::as_str) {
        if !url.is_empty() {
            let source_name = data
                .pointer("/abstract/source")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty());
            let heading = data.get("heading").and_then(Value::as_str).unwrap_or("");
            let title = match source_name {
                Some(name) if !heading.is_empty() => format!("{}: {}", name, heading),
                Some(name) => name.to_string(),
                None => heading.to_string(),
            };
            sources.push(Source {
                title,
                url: url.to_string(),
            });
        }
    }

    if let Some(results) = data.get("results").and_then(Value::as_array) {
        for result in results {
            if let (Some(text), Some(url)) = (
                result.get("text").and_then(Value::as_str),
                result.get("url").and_then(Value::as_str),
            ) {
                sources.push(Source {
                    title: text.to_string(),
                    url: url.to_string(),
                });
            }
        }
    }

    sources
}

//
// ================= Finance Agent =================
//

pub struct FinanceAgent {
    engine: Arc<ExecutionEngine>,
}

impl FinanceAgent {
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl MemberAgent for FinanceAgent {
    fn name(&self) -> &'static str {
        FINANCE_AGENT
    }

    fn role(&self) -> &'static str {
        "Provides current stock prices, analyst recommendations, company fundamentals, and news for a given stock ticker symbol"
    }

    async fn run(&self, task: &MemberTask) -> AgentReport {
        let mut report = AgentReport::new(self.name());

        for ticker in &task.tickers {
            for tool_name in FINANCE_TOOLS {
                let finding = self
                    .engine
                    .execute(tool_name, ticker.as_str(), json!({ "symbol": ticker }))
                    .await;

                if finding.status == FindingStatus::Success {
                    if *tool_name == STOCK_PRICE {
                        report.sources.push(Source {
                            title: format!("Yahoo Finance: {}", ticker),
                            url: format!("https://finance.yahoo.com/quote/{}", ticker),
                        });
                    }
                    if *tool_name == COMPANY_NEWS {
                        report.sources.extend(news_sources(&finding.data));
                    }
                }

                report.findings.push(finding);
            }
        }

        info!(
            agent = self.name(),
            tickers = task.tickers.len(),
            successful = report.successful_findings(),
            total = report.findings.len(),
            "Finance data gathered"
        );
        report
    }
}

fn news_sources(data: &Value) -> Vec<Source> {
    data.get("articles")
        .and_then(Value::as_array)
        .map(|articles| {
            articles
                .iter()
                .filter_map(|a| {
                    Some(Source {
                        title: a.get("title")?.as_str()?.to_string(),
                        url: a.get("link")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
