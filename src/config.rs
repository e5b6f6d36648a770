//! Runtime configuration
//!
//! Everything is read from the process environment after `.env` has been
//! loaded. Lookups go through a closure so tests can supply their own map.

use crate::error::AdvisorError;
use crate::Result;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GROQ_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://api.duckduckgo.com";

/// Which hosted model answers questions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    Groq,
}

impl FromStr for LlmProvider {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            "groq" | "llama" | "llama3" => Ok(LlmProvider::Groq),
            other => Err(AdvisorError::ConfigError(format!(
                "Unknown LLM_PROVIDER '{}' (expected 'gemini' or 'groq')",
                other
            ))),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LlmProvider::Gemini => "gemini",
            LlmProvider::Groq => "groq",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub provider: LlmProvider,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub groq_api_key: Option<String>,
    pub groq_model: String,

    pub database_url: Option<String>,
    pub database_max_connections: u32,

    pub host: String,
    pub port: u16,

    pub yahoo_base_url: String,
    pub search_base_url: String,
    pub http_timeout: Duration,

    pub llm_max_retries: u32,
    pub max_tickers: usize,
    pub max_query_chars: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            groq_api_key: None,
            groq_model: DEFAULT_GROQ_MODEL.to_string(),
            database_url: None,
            database_max_connections: 5,
            host: "127.0.0.1".to_string(),
            port: 8001,
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            search_base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(30),
            llm_max_retries: 2,
            max_tickers: 5,
            max_query_chars: 2000,
        }
    }
}

impl AdvisorConfig {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let provider = match get(&["LLM_PROVIDER"]) {
            Some(value) => value.parse()?,
            None => defaults.provider,
        };

        Ok(Self {
            provider,
            gemini_api_key: get(&["GOOGLE_API_KEY", "GEMINI_API_KEY"]),
            gemini_model: get(&["GEMINI_MODEL"]).unwrap_or(defaults.gemini_model),
            groq_api_key: get(&["GROQ_API_KEY"]),
            groq_model: get(&["GROQ_MODEL"]).unwrap_or(defaults.groq_model),
            database_url: get(&["DATABASE_URL", "POSTGRES_URL"]),
            database_max_connections: parse_positive_or(
                get(&["DATABASE_MAX_CONNECTIONS"]),
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            host: get(&["HOST"]).unwrap_or(defaults.host),
            port: parse_or(get(&["PORT", "API_PORT"]), "PORT", defaults.port)?,
            yahoo_base_url: get(&["YAHOO_FINANCE_BASE_URL"])
                .unwrap_or(defaults.yahoo_base_url)
                .trim_end_matches('/')
                .to_string(),
            search_base_url: get(&["SEARCH_BASE_URL"])
                .unwrap_or(defaults.search_base_url)
                .trim_end_matches('/')
                .to_string(),
            http_timeout: Duration::from_secs(parse_positive_or(
                get(&["HTTP_TIMEOUT_SECS"]),
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
            llm_max_retries: parse_or(
                get(&["LLM_MAX_RETRIES"]),
                "LLM_MAX_RETRIES",
                defaults.llm_max_retries,
            )?,
            max_tickers: parse_positive_or(
                get(&["MAX_TICKERS"]),
                "MAX_TICKERS",
                defaults.max_tickers,
            )?,
            max_query_chars: defaults.max_query_chars,
        })
    }

    /// Model id for the selected provider
    pub fn model(&self) -> &str {
        match self.provider {
            LlmProvider::Gemini => &self.gemini_model,
            LlmProvider::Groq => &self.groq_model,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw.parse().map_err(|_| {
            AdvisorError::ConfigError(format!("{} has an invalid value: '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

/// Like [`parse_or`], for settings where zero would disable the feature
fn parse_positive_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
{
    let parsed = parse_or(value, key, default)?;
    if parsed <= T::default() {
        return Err(AdvisorError::ConfigError(format!(
            "{} must be greater than zero",
            key
        )));
    }
    Ok(parsed)
}
