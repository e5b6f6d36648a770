//! Multi-Agent Financial Advisor
//!
//! Answers natural-language financial questions with a small team of agents:
//! - a web search agent that gathers background with sources
//! - a finance agent that pulls prices, analyst views, fundamentals and news
//! - a coordinator that asks Gemini or Groq to answer from what they found
//!
//! Every answer is logged with a digest of the context it was grounded on.
//!
//! PIPELINE:
//! INPUT → PLAN → DELEGATE → SYNTHESIZE → PERSIST

pub mod agent;
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod html;
pub mod llm;
pub mod models;
pub mod planner;
pub mod store;
pub mod text;
pub mod ticker;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use agent::Orchestrator;
pub use config::AdvisorConfig;
pub use error::AdvisorError;
pub use models::*;
