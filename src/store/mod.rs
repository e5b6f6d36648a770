//! Q&A log persistence
//!
//! Every answered question is written once and never changed. Postgres is
//! used when a database URL is configured, otherwise logs live in memory.

use crate::config::AdvisorConfig;
use crate::models::{NewQaLog, QaLog};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

pub mod postgres;

pub use postgres::PgQaLogStore;

pub const MAX_RECENT_LIMIT: usize = 100;

#[async_trait]
pub trait QaLogStore: Send + Sync {
    /// Persist one exchange, assigning its id and timestamp
    async fn record(&self, log: NewQaLog) -> Result<QaLog>;

    async fn get(&self, log_id: Uuid) -> Result<Option<QaLog>>;

    /// Newest first; `limit` is clamped to `1..=100`
    async fn recent(&self, limit: usize) -> Result<Vec<QaLog>>;

    fn backend(&self) -> &'static str;
}

pub(crate) fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_RECENT_LIMIT)
}

//
// ================= In-memory =================
//

#[derive(Default)]
struct LogEntries {
    /// Insertion order, oldest first
    logs: Vec<QaLog>,
    by_id: HashMap<Uuid, usize>,
}

#[derive(Default)]
pub struct InMemoryQaLogStore {
    entries: RwLock<LogEntries>,
}

impl InMemoryQaLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.logs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.logs.is_empty()
    }
}

#[async_trait]
impl QaLogStore for InMemoryQaLogStore {
    async fn record(&self, log: NewQaLog) -> Result<QaLog> {
        let mut entries = self.entries.write().await;

        // Stamped under the lock: timestamps follow insertion order
        let entry = QaLog {
            log_id: Uuid::new_v4(),
            query: log.query,
            response: log.response,
            provider: log.provider,
            context_digest: log.context_digest,
            timestamp: Utc::now(),
        };

        let position = entries.logs.len();
        entries.by_id.insert(entry.log_id, position);
        entries.logs.push(entry.clone());
        Ok(entry)
    }

    async fn get(&self, log_id: Uuid) -> Result<Option<QaLog>> {
        let entries = self.entries.read().await;
        Ok(entries
            .by_id
            .get(&log_id)
            .and_then(|&position| entries.logs.get(position))
            .cloned())
    }

    /// Newest first by insertion order, so logs stamped in the same instant keep their order
    async fn recent(&self, limit: usize) -> Result<Vec<QaLog>> {
        let entries = self.entries.read().await;
        Ok(entries
            .logs
            .iter()
            .rev()
            .take(clamp_limit(limit))
            .cloned()
            .collect())
    }

    fn backend(&self) -> &'static str {
        "in-memory"
    }
}

/// Postgres when configured, in-memory otherwise
pub fn build_store(config: &AdvisorConfig) -> Arc<dyn QaLogStore> {
    if let Some(url) = &config.database_url {
        match PgQaLogStore::connect_lazy(url, config.database_max_connections) {
            Ok(store) => {
                info!("Q&A log backend: postgres");
                return Arc::new(store);
            }
            Err(error) => {
                warn!(
                    %error,
                    "Failed to initialize postgres Q&A log, falling back to in-memory"
                );
            }
        }
    }

    info!("Q&A log backend: in-memory");
    Arc::new(InMemoryQaLogStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn new_log(query: &str) -> NewQaLog {
        NewQaLog {
            query: query.to_string(),
            response: format!("answer to {}", query),
            provider: "gemini".to_string(),
            context_digest: "00".repeat(32),
        }
    }

    #[tokio::test]
    async fn test_record_and_get() {
        let store = InMemoryQaLogStore::new();
        let saved = store.record(new_log("TSLA price?")).await.unwrap();

        let loaded = store.get(saved.log_id).await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.response, "answer to TSLA price?");
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let store = InMemoryQaLogStore::new();
        for q in ["first", "second", "third"] {
            store.record(new_log(q)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let recent = store.recent(2).await.unwrap();
        let queries: Vec<&str> = recent.iter().map(|l| l.query.as_str()).collect();
        assert_eq!(queries, vec!["third", "second"]);
    }

    #[tokio::test]
    async fn test_recent_keeps_insertion_order_within_same_instant() {
        let store = InMemoryQaLogStore::new();
        let queries: Vec<String> = (0..50).map(|i| format!("question {}", i)).collect();
        for q in &queries {
            store.record(new_log(q)).await.unwrap();
        }

        let recent = store.recent(MAX_RECENT_LIMIT).await.unwrap();
        let got: Vec<&str> = recent.iter().map(|l| l.query.as_str()).collect();
        let expected: Vec<&str> = queries.iter().rev().map(String::as_str).collect();
        assert_eq!(got, expected);

        assert!(recent.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_recent_limit_is_clamped() {
        let store = InMemoryQaLogStore::new();
        store.record(new_log("a")).await.unwrap();
        store.record(new_log("b")).await.unwrap();

        assert_eq!(store.recent(0).await.unwrap().len(), 1);
        assert_eq!(store.recent(10_000).await.unwrap().len(), 2);
        assert_eq!(clamp_limit(10_000), MAX_RECENT_LIMIT);
    }

    #[test]
    fn test_build_store_without_database() {
        let store = build_store(&AdvisorConfig::default());
        assert_eq!(store.backend(), "in-memory");
    }
}
