//! Core data models for the financial advisor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Q&A Log =================
//

/// One persisted question/answer exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaLog {
    pub log_id: Uuid,
    pub query: String,
    pub response: String,
    pub provider: String,
    pub context_digest: String,
    pub timestamp: DateTime<Utc>,
}

/// A Q&A log before the store assigns identity and timestamp
#[derive(Debug, Clone)]
pub struct NewQaLog {
    pub query: String,
    pub response: String,
    pub provider: String,
    pub context_digest: String,
}

//
// ================= Ticker =================
//

/// Upper-case exchange symbol, e.g. `TSLA`, `BRK-B`, `RELIANCE.NS`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Option<Self> {
        let symbol = raw.trim().trim_start_matches('$').to_uppercase();

        let (base, suffix) = match symbol.split_once(['.', '-']) {
            Some((base, suffix)) => (base, Some(suffix)),
            None => (symbol.as_str(), None),
        };

        let base_ok = !base.is_empty()
            && base.len() <= 10
            && base.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            && base.chars().any(|c| c.is_ascii_uppercase());
        let suffix_ok = suffix.map_or(true, |s| {
            !s.is_empty() && s.len() <= 3 && s.chars().all(|c| c.is_ascii_uppercase())
        });

        (base_ok && suffix_ok).then_some(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Ticker {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Ticker::parse(&value).ok_or_else(|| format!("invalid ticker symbol: {}", value))
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

//
// ================= Agent Reports =================
//

/// A citation surfaced to the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Success,
    Failed,
}

/// One tool result gathered by a member agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub tool_name: String,
    /// Ticker or search query the tool was run for
    pub subject: String,
    pub status: FindingStatus,
    pub data: serde_json::Value,
    pub execution_time_ms: u64,
}

impl Finding {
    pub fn error_message(&self) -> Option<&str> {
        match self.status {
            FindingStatus::Failed => self.data.get("error").and_then(|v| v.as_str()),
            FindingStatus::Success => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent_name: String,
    pub findings: Vec<Finding>,
    pub sources: Vec<Source>,
}

impl AgentReport {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            findings: Vec::new(),
            sources: Vec::new(),
        }
    }

    pub fn successful_findings(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.status == FindingStatus::Success)
            .count()
    }
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorAnswer {
    pub answer: String,
    pub log_id: Uuid,
    pub provider: String,
    pub tickers: Vec<Ticker>,
    pub sources: Vec<Source>,
    pub reasoning_trace: Vec<String>,
    pub created_at: DateTime<Utc>,
}
