use std::sync::Arc;

use tracing::warn;

use crate::model::QueryLogEntry;
use crate::store::KnowledgeStore;

/// Appends one log entry per resolved query. A failed write never fails the request.
#[derive(Clone)]
pub struct QueryLogger {
    store: Arc<dyn KnowledgeStore>,
}

impl QueryLogger {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Returns whether the entry was persisted.
    pub fn record(&self, original_query: &str, response: &str, score: f32) -> bool {
        match self
            .store
            .log_query(QueryLogEntry::new(original_query, response, score))
        {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, query = original_query, "failed to persist query log");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FaqbotError, Result};
    use crate::model::{FaqPatch, FaqRecord};
    use crate::store::MemoryStore;

    struct ReadOnlyStore;

    impl KnowledgeStore for ReadOnlyStore {
        fn get_all_faqs(&self) -> Result<Vec<FaqRecord>> {
            Ok(Vec::new())
        }
        fn get_faq(&self, _id: &str) -> Result<Option<FaqRecord>> {
            Ok(None)
        }
        fn add_faq(&self, faq: FaqRecord) -> Result<FaqRecord> {
            Ok(faq)
        }
        fn update_faq(&self, _id: &str, _patch: &FaqPatch) -> Result<Option<FaqRecord>> {
            Ok(None)
        }
        fn delete_faq(&self, _id: &str) -> Result<bool> {
            Ok(false)
        }
        fn log_query(&self, _entry: QueryLogEntry) -> Result<()> {
            Err(FaqbotError::KnowledgeStoreUnavailable("read-only".into()))
        }
        fn query_logs(&self) -> Result<Vec<QueryLogEntry>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn records_entry() {
        let store = Arc::new(MemoryStore::new());
        let logger = QueryLogger::new(store.clone());
        assert!(logger.record("wher is libary", "Building C.", 0.8));

        let logs = store.query_logs().expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].query, "wher is libary");
        assert_eq!(logs[0].response, "Building C.");
    }

    #[test]
    fn write_failure_is_swallowed() {
        let logger = QueryLogger::new(Arc::new(ReadOnlyStore));
        assert!(!logger.record("q", "r", 0.0));
    }
}
