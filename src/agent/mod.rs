//! Query orchestrator - the coordinating agent of the team
//!
//! INPUT → PLAN → DELEGATE → SYNTHESIZE → PERSIST
//!
//! The coordinator resolves tickers, hands work to its members, renders
//! what they found into one context document and asks the language model
//! to answer from it. Each successful answer is written to the Q&A log.

use crate::config::AdvisorConfig;
use crate::context::{collect_sources, context_digest, render_context};
use crate::error::AdvisorError;
use crate::execution::ExecutionEngine;
use crate::llm::{build_language_model, CompletionRequest, LanguageModel};
use crate::models::{AdvisorAnswer, AgentReport, NewQaLog, Ticker};
use crate::planner::{IntentPlanner, Planner};
use crate::store::{build_store, QaLogStore};
use crate::text::strip_ansi_codes;
use crate::ticker::extract_tickers;
use crate::tools::{create_default_registry, ToolRegistry};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

pub mod members;

pub use members::{FinanceAgent, MemberAgent, MemberTask, WebSearchAgent};

/// Substituted when the model returns nothing printable
pub const NO_RESPONSE: &str = "No response received from the agent.";

pub const DEFAULT_MAX_TICKERS: usize = 5;
pub const DEFAULT_MAX_QUERY_CHARS: usize = 2000;

const COORDINATOR_INSTRUCTIONS: &[&str] = &[
    "You are a financial research coordinator leading a web search agent and a finance agent.",
    "Answer the user's question using the research context gathered by your team.",
    "Always include sources when providing information from searches.",
    "Use tables to display financial data.",
    "When several companies are involved, cover each one and then combine the results into a single, comprehensive response.",
    "If a data point is marked unavailable, say so instead of guessing a value.",
    "Do not invent prices, ratios or news that are not in the context.",
];

pub struct Orchestrator {
    model: Arc<dyn LanguageModel>,
    planner: Box<dyn Planner>,
    web_agent: Box<dyn MemberAgent>,
    finance_agent: Box<dyn MemberAgent>,
    store: Arc<dyn QaLogStore>,
    max_tickers: usize,
    max_query_chars: usize,
}

impl Orchestrator {
    /// Team with the default planner and members sharing one tool registry
    pub fn new(
        model: Arc<dyn LanguageModel>,
        tool_registry: Arc<ToolRegistry>,
        store: Arc<dyn QaLogStore>,
    ) -> Self {
        let engine = Arc::new(ExecutionEngine::new(tool_registry));

        Self {
            model,
            planner: Box::new(IntentPlanner::new()),
            web_agent: Box::new(WebSearchAgent::new(Arc::clone(&engine))),
            finance_agent: Box::new(FinanceAgent::new(engine)),
            store,
            max_tickers: DEFAULT_MAX_TICKERS,
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
        }
    }

    /// Wire up the full team from configuration
    pub fn from_config(config: &AdvisorConfig) -> Result<Self> {
        let registry = Arc::new(create_default_registry(config)?);
        let model = build_language_model(config)?;
        let store = build_store(config);

        Ok(Self::new(model, registry, store).with_limits(config.max_tickers, config.max_query_chars))
    }

    pub fn with_limits(mut self, max_tickers: usize, max_query_chars: usize) -> Self {
        self.max_tickers = max_tickers.max(1);
        self.max_query_chars = max_query_chars.max(1);
        self
    }

    pub fn with_members(
        mut self,
        web_agent: Box<dyn MemberAgent>,
        finance_agent: Box<dyn MemberAgent>,
    ) -> Self {
        self.web_agent = web_agent;
        self.finance_agent = finance_agent;
        self
    }

    pub fn store(&self) -> &Arc<dyn QaLogStore> {
        &self.store
    }

    pub fn provider(&self) -> &str {
        self.model.provider()
    }

    /// Answer one question end to end
    pub async fn ask(&self, query: &str) -> Result<AdvisorAnswer> {
        let start_time = Instant::now();
        let query = self.validate(query)?;
        let mut reasoning_trace = vec!["INPUT: Query received".to_string()];

        info!(
            provider = self.model.provider(),
            query_chars = query.chars().count(),
            "Orchestrator: answering query"
        );

        // === PLAN ===
        let tickers = extract_tickers(query, self.max_tickers);
        let delegation = self.planner.plan(query, &tickers);

        debug!(?delegation, "Delegation planned");
        reasoning_trace.push(format!(
            "PLAN: web search {}, tickers [{}]",
            if delegation.web_search { "yes" } else { "no" },
            join_tickers(&delegation.tickers)
        ));

        // === DELEGATE ===
        let task = MemberTask {
            query: query.to_string(),
            tickers: delegation.tickers.clone(),
        };

        let mut delegated: Vec<&dyn MemberAgent> = Vec::new();
        if delegation.web_search {
            delegated.push(self.web_agent.as_ref());
        }
        if delegation.uses_finance() {
            delegated.push(self.finance_agent.as_ref());
        }

        let mut reports: Vec<AgentReport> = Vec::with_capacity(delegated.len());
        for member in &delegated {
            reports.push(member.run(&task).await);
        }

        for report in &reports {
            reasoning_trace.push(format!(
                "DELEGATE: {} - {} / {} findings succeeded",
                report.agent_name,
                report.successful_findings(),
                report.findings.len()
            ));
        }

        // === SYNTHESIZE ===
        let context = render_context(&reports);
        let digest = context_digest(&context);
        let request = CompletionRequest::new(
            system_instruction(&delegated),
            build_prompt(query, &delegation.tickers, &context),
        );

        let completion = self.model.generate(&request).await.map_err(|e| {
            error!(
                provider = self.model.provider(),
                model = self.model.model(),
                error = %e,
                "Answer synthesis failed"
            );
            match e {
                AdvisorError::LlmUnavailable(message) => {
                    AdvisorError::LlmError(format!("provider unavailable after retries: {}", message))
                }
                other => other,
            }
        })?;

        let mut answer = strip_ansi_codes(&completion.text).trim().to_string();
        if answer.is_empty() {
            answer = NO_RESPONSE.to_string();
        }

        reasoning_trace.push(format!(
            "SYNTHESIZE: {}/{} answered from {} bytes of context",
            self.model.provider(),
            self.model.model(),
            context.len()
        ));

        // === PERSIST ===
        let log = self
            .store
            .record(NewQaLog {
                query: query.to_string(),
                response: answer.clone(),
                provider: self.model.provider().to_string(),
                context_digest: digest,
            })
            .await
            .map_err(|e| match e {
                AdvisorError::DatabaseError(_) => e,
                other => AdvisorError::DatabaseError(other.to_string()),
            })?;

        reasoning_trace.push(format!("PERSIST: Q&A log {}", log.log_id));

        info!(
            log_id = %log.log_id,
            reports = reports.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Orchestrator: answer complete"
        );

        Ok(AdvisorAnswer {
            answer,
            log_id: log.log_id,
            provider: log.provider,
            tickers: delegation.tickers,
            sources: collect_sources(&reports),
            reasoning_trace,
            created_at: log.timestamp,
        })
    }

    fn validate<'a>(&self, query: &'a str) -> Result<&'a str> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AdvisorError::EmptyQuery);
        }

        let chars = query.chars().count();
        if chars > self.max_query_chars {
            return Err(AdvisorError::InvalidQuery(format!(
                "query is {} characters, the limit is {}",
                chars, self.max_query_chars
            )));
        }

        Ok(query)
    }
}

fn join_tickers(tickers: &[Ticker]) -> String {
    tickers
        .iter()
        .map(Ticker::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Coordinator instructions followed by the role of each member that worked on the question
fn system_instruction(members: &[&dyn MemberAgent]) -> String {
    let mut lines: Vec<String> = COORDINATOR_INSTRUCTIONS
        .iter()
        .map(|line| line.to_string())
        .collect();

    if !members.is_empty() {
        lines.push("Your team members for this question:".to_string());
        for member in members {
            lines.push(format!("- {}: {}", member.name(), member.role()));
        }
    }

    lines.join("\n")
}

fn build_prompt(query: &str, tickers: &[Ticker], context: &str) -> String {
    let tickers = if tickers.is_empty() {
        "none identified".to_string()
    } else {
        join_tickers(tickers)
    };
    let context = if context.is_empty() {
        "_no research context was gathered_"
    } else {
        context
    };

    format!(
        "QUESTION:\n{}\n\nTICKERS:\n{}\n\nCONTEXT:\n{}\n",
        query, tickers, context
    )
}
