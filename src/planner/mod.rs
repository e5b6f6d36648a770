//! Delegation planner
//!
//! Decides which team members work on a query. Planning is deterministic:
//! the finance agent gets every extracted ticker and the web search agent is
//! brought in for open questions or anything that needs current context.

use crate::models::Ticker;
use serde::{Deserialize, Serialize};

/// Which members to consult for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub web_search: bool,
    pub tickers: Vec<Ticker>,
}

impl Delegation {
    pub fn uses_finance(&self) -> bool {
        !self.tickers.is_empty()
    }
}

pub trait Planner: Send + Sync {
    fn plan(&self, query: &str, tickers: &[Ticker]) -> Delegation;
}

/// Words and two-word phrases that call for web context even when tickers are known
const WEB_CONTEXT_KEYWORDS: &[&str] = &[
    // News flow
    "news", "headline", "headlines", "latest", "recent", "recently", "today",
    "this week", "announce", "announced", "announcement",
    // Sentiment
    "sentiment", "opinion", "opinions", "analysts say", "rumor", "rumors", "rumour", "rumours",
    // Explanations
    "why", "reason", "reasons", "what happened", "cause", "caused", "causes",
    // Forward looking
    "outlook", "forecast", "forecasts", "expect", "expected", "expects", "expectations",
    "future", "guidance",
    // Macro
    "macro", "economy", "inflation", "interest rate", "interest rates", "fed",
    "federal reserve", "recession", "tariff", "tariffs", "regulation", "regulations",
];

/// Keyword planner
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentPlanner;

impl IntentPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Whole-word match, so "because" does not count as "cause"
    fn needs_web_context(query: &str) -> bool {
        let lowered = query.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        WEB_CONTEXT_KEYWORDS.iter().any(|keyword| {
            let phrase: Vec<&str> = keyword.split(' ').collect();
            words.windows(phrase.len()).any(|window| window == phrase.as_slice())
        })
    }
}

impl Planner for IntentPlanner {
    fn plan(&self, query: &str, tickers: &[Ticker]) -> Delegation {
        Delegation {
            web_search: tickers.is_empty() || Self::needs_web_context(query),
            tickers: tickers.to_vec(),
        }
    }
}
