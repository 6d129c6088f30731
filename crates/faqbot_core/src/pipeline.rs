use std::sync::Arc;

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::embed::make_embedder;
use crate::error::Result;
use crate::greeting::GreetingTable;
use crate::logger::QueryLogger;
use crate::model::{FaqRecord, Outcome, RankedMatch, Resolution};
use crate::normalize::SpellCorrector;
use crate::policy::{faq_at, ResolutionPolicy};
use crate::retrieval::{Ranker, SemanticRanker};
use crate::store::KnowledgeStore;

/// One scored FAQ from [`QueryPipeline::scores`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScoredFaq {
    pub index: usize,
    pub score: f32,
    pub faq_id: String,
    pub question: String,
}

/// Spell correction, greeting shortcut, ranking, policy and logging for one query.
/// Holds no per-request state, so one instance serves any number of calls.
pub struct QueryPipeline {
    corrector: SpellCorrector,
    greetings: GreetingTable,
    ranker: Box<dyn Ranker>,
    policy: ResolutionPolicy,
    store: Arc<dyn KnowledgeStore>,
    logger: QueryLogger,
}

impl QueryPipeline {
    pub fn new(
        corrector: SpellCorrector,
        greetings: GreetingTable,
        ranker: Box<dyn Ranker>,
        policy: ResolutionPolicy,
        store: Arc<dyn KnowledgeStore>,
    ) -> Self {
        let logger = QueryLogger::new(store.clone());
        Self {
            corrector,
            greetings,
            ranker,
            policy,
            store,
            logger,
        }
    }

    /// Builds the pipeline described by `config`, loading its embedder once.
    pub fn from_config(config: &PipelineConfig, store: Arc<dyn KnowledgeStore>) -> Result<Self> {
        let ranker = SemanticRanker::new(make_embedder(config)?);
        Self::with_ranker(config, Box::new(ranker), store)
    }

    pub fn with_ranker(
        config: &PipelineConfig,
        ranker: Box<dyn Ranker>,
        store: Arc<dyn KnowledgeStore>,
    ) -> Result<Self> {
        config.validate()?;
        let mut corrector = SpellCorrector::new(&config.custom_words);
        if let Some(path) = &config.dictionary_path {
            corrector.load_dictionary_file(path)?;
        }
        Ok(Self::new(
            corrector,
            GreetingTable::new(&config.greetings),
            ranker,
            ResolutionPolicy::from_config(config),
            store,
        ))
    }

    pub fn store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    /// Resolves `query` and logs it under its original, uncorrected text.
    pub fn answer(&self, query: &str) -> Result<Resolution> {
        let resolution = self.resolve(query)?;
        self.logger
            .record(query, &resolution.answer, resolution.confidence);
        Ok(resolution)
    }

    /// Resolution without logging.
    pub fn resolve(&self, query: &str) -> Result<Resolution> {
        let corrected = self.corrector.correct(query);

        if let Some(reply) = self.greetings.match_greeting(&corrected) {
            debug!(query = %corrected, "greeting shortcut");
            return Ok(Resolution::new(reply, 1.0, Outcome::Greeting));
        }

        let faqs = self.store.get_all_faqs()?;
        let resolution = self.policy.resolve(self.ranker.as_ref(), &corrected, &faqs)?;
        info!(
            outcome = ?resolution.outcome,
            confidence = resolution.confidence,
            faqs = faqs.len(),
            "query resolved"
        );
        Ok(resolution)
    }

    /// Every FAQ scored against the corrected query, best first.
    pub fn scores(&self, query: &str) -> Result<Vec<ScoredFaq>> {
        let corrected = self.corrector.correct(query);
        let faqs = self.store.get_all_faqs()?;
        let corpus: Vec<String> = faqs.iter().map(FaqRecord::corpus_text).collect();
        let ranked = self.ranker.rank(&corrected, &corpus)?;
        ranked
            .into_iter()
            .map(|RankedMatch { index, score }| {
                let faq = faq_at(&faqs, index)?;
                Ok(ScoredFaq {
                    index,
                    score,
                    faq_id: faq.id.clone(),
                    question: faq.question.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaqbotError;
    use crate::model::{FaqPatch, QueryLogEntry};
    use crate::policy::{EMPTY_KNOWLEDGE_ANSWER, NO_MATCH_ANSWER, SUGGESTION_PREAMBLE};
    use crate::retrieval::order_by_score;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingRanker {
        calls: Arc<AtomicUsize>,
    }

    impl Ranker for CountingRanker {
        fn rank(&self, _query: &str, corpus: &[String]) -> Result<Vec<RankedMatch>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(order_by_score(corpus.iter().map(|_| 0.0)))
        }
    }

    struct FailingRanker;

    impl Ranker for FailingRanker {
        fn rank(&self, _query: &str, _corpus: &[String]) -> Result<Vec<RankedMatch>> {
            Err(FaqbotError::EmbeddingOracleFailure("model offline".into()))
        }
    }

    struct UnreadableStore;

    impl KnowledgeStore for UnreadableStore {
        fn get_all_faqs(&self) -> Result<Vec<FaqRecord>> {
            Err(FaqbotError::KnowledgeStoreUnavailable("connection refused".into()))
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
            Err(FaqbotError::KnowledgeStoreUnavailable("connection refused".into()))
        }
        fn query_logs(&self) -> Result<Vec<QueryLogEntry>> {
            Ok(Vec::new())
        }
    }

    /// Serves FAQs from memory but refuses every log write.
    struct LogRejectingStore {
        inner: MemoryStore,
    }

    impl KnowledgeStore for LogRejectingStore {
        fn get_all_faqs(&self) -> Result<Vec<FaqRecord>> {
            self.inner.get_all_faqs()
        }
        fn get_faq(&self, id: &str) -> Result<Option<FaqRecord>> {
            self.inner.get_faq(id)
        }
        fn add_faq(&self, faq: FaqRecord) -> Result<FaqRecord> {
            self.inner.add_faq(faq)
        }
        fn update_faq(&self, id: &str, patch: &FaqPatch) -> Result<Option<FaqRecord>> {
            self.inner.update_faq(id, patch)
        }
        fn delete_faq(&self, id: &str) -> Result<bool> {
            self.inner.delete_faq(id)
        }
        fn log_query(&self, _entry: QueryLogEntry) -> Result<()> {
            Err(FaqbotError::KnowledgeStoreUnavailable("disk full".into()))
        }
        fn query_logs(&self) -> Result<Vec<QueryLogEntry>> {
            self.inner.query_logs()
        }
    }

    /// Points at a FAQ index past the end of any corpus.
    struct StrayRanker;

    impl Ranker for StrayRanker {
        fn rank(&self, _query: &str, corpus: &[String]) -> Result<Vec<RankedMatch>> {
            Ok(vec![RankedMatch {
                index: corpus.len(),
                score: 0.9,
            }])
        }
    }

    fn campus_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_faqs(vec![
            FaqRecord::new("Where is the library?", "Building C."),
            FaqRecord::new("When do classes start?", "September."),
            FaqRecord::new("How do I pay fees online?", "Portal, then Finance."),
        ]))
    }

    fn pipeline(store: Arc<MemoryStore>) -> QueryPipeline {
        QueryPipeline::from_config(&PipelineConfig::default(), store).expect("pipeline")
    }

    #[test]
    fn greetings_skip_ranking_and_score_one() {
        let ranker = CountingRanker::default();
        let calls = ranker.calls.clone();
        let store = campus_store();
        let pipeline = QueryPipeline::with_ranker(
            &PipelineConfig::default(),
            Box::new(ranker),
            store.clone(),
        )
        .expect("pipeline");

        let replies: Vec<Resolution> = ["Hello!", "hello", "HELLO."]
            .iter()
            .map(|q| pipeline.answer(q).expect("answer"))
            .collect();

        assert!(replies.iter().all(|r| r.outcome == Outcome::Greeting));
        assert!(replies.iter().all(|r| r.confidence == 1.0));
        assert!(replies.iter().all(|r| r.answer == replies[0].answer));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.query_logs().expect("logs").len(), 3);
    }

    #[test]
    fn empty_knowledge_never_ranks_but_logs() {
        let ranker = CountingRanker::default();
        let calls = ranker.calls.clone();
        let store = Arc::new(MemoryStore::new());
        let pipeline = QueryPipeline::with_ranker(
            &PipelineConfig::default(),
            Box::new(ranker),
            store.clone(),
        )
        .expect("pipeline");

        let r = pipeline.answer("where is the library").expect("answer");
        assert_eq!(r.answer, EMPTY_KNOWLEDGE_ANSWER);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.query_logs().expect("logs").len(), 1);
    }

    #[test]
    fn stored_question_is_a_direct_hit() {
        let store = campus_store();
        let pipeline = pipeline(store.clone());
        let r = pipeline.answer("Where is the library?").expect("answer");
        assert_eq!(r.outcome, Outcome::DirectHit);
        assert_eq!(r.answer, "Building C.");
        assert!(r.confidence >= 0.65);
    }

    #[test]
    fn log_keeps_original_query_text() {
        let store = campus_store();
        let pipeline = pipeline(store.clone());
        let r = pipeline.answer("Wher is the librery?").expect("answer");

        let logs = store.query_logs().expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].query, "Wher is the librery?");
        assert_eq!(logs[0].response, r.answer);
        assert_eq!(logs[0].score, r.confidence);
    }

    #[test]
    fn partial_overlap_offers_suggestions() {
        let pipeline = pipeline(campus_store());
        let r = pipeline.answer("library fees").expect("answer");
        assert_eq!(r.outcome, Outcome::Suggestions);
        assert!(r.answer.starts_with(SUGGESTION_PREAMBLE));
        assert!(r.answer.contains("- Where is the library?"));
        assert!(r.answer.contains("- How do I pay fees online?"));
        assert!(r.confidence > 0.1 && r.confidence < 0.65);
    }

    #[test]
    fn unrelated_query_apologizes() {
        let pipeline = pipeline(campus_store());
        let r = pipeline.answer("quantum chromodynamics").expect("answer");
        assert_eq!(r.outcome, Outcome::NoMatch);
        assert_eq!(r.answer, NO_MATCH_ANSWER);
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn empty_query_flows_through() {
        let pipeline = pipeline(campus_store());
        let r = pipeline.answer("   ").expect("answer");
        assert_eq!(r.outcome, Outcome::NoMatch);
    }

    #[test]
    fn repeated_queries_resolve_identically() {
        let pipeline = pipeline(campus_store());
        let first = pipeline.resolve("library fees").expect("resolve");
        let second = pipeline.resolve("library fees").expect("resolve");
        assert_eq!(first, second);
    }

    #[test]
    fn store_read_failure_is_surfaced() {
        let pipeline =
            QueryPipeline::from_config(&PipelineConfig::default(), Arc::new(UnreadableStore))
                .expect("pipeline");
        assert!(matches!(
            pipeline.answer("where is the library"),
            Err(FaqbotError::KnowledgeStoreUnavailable(_))
        ));
    }

    #[test]
    fn oracle_failure_is_surfaced_without_logging() {
        let store = campus_store();
        let pipeline = QueryPipeline::with_ranker(
            &PipelineConfig::default(),
            Box::new(FailingRanker),
            store.clone(),
        )
        .expect("pipeline");
        assert!(matches!(
            pipeline.answer("where is the library"),
            Err(FaqbotError::EmbeddingOracleFailure(_))
        ));
        assert!(store.query_logs().expect("logs").is_empty());
    }

    #[test]
    fn scores_cover_every_faq() {
        let pipeline = pipeline(campus_store());
        let scores = pipeline.scores("where is the library").expect("scores");
        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].question, "Where is the library?");
        assert!(scores.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn log_write_failure_still_returns_the_answer() {
        let store = Arc::new(LogRejectingStore {
            inner: MemoryStore::with_faqs(vec![
                FaqRecord::new("Where is the library?", "Building C."),
                FaqRecord::new("When do classes start?", "September."),
            ]),
        });
        let pipeline =
            QueryPipeline::from_config(&PipelineConfig::default(), store).expect("pipeline");

        let expected = pipeline.resolve("Where is the library?").expect("resolve");
        let answered = pipeline.answer("Where is the library?").expect("answer");
        assert_eq!(answered, expected);
        assert_eq!(answered.outcome, Outcome::DirectHit);
        assert_eq!(answered.answer, "Building C.");

        let greeting = pipeline.answer("hello").expect("answer");
        assert_eq!(greeting.outcome, Outcome::Greeting);
        assert_eq!(greeting.confidence, 1.0);
    }

    #[test]
    fn scores_reject_out_of_range_ranker_index() {
        let pipeline = QueryPipeline::with_ranker(
            &PipelineConfig::default(),
            Box::new(StrayRanker),
            campus_store(),
        )
        .expect("pipeline");
        assert!(matches!(
            pipeline.scores("where is the library"),
            Err(FaqbotError::EmbeddingOracleFailure(_))
        ));
        assert!(matches!(
            pipeline.answer("where is the library"),
            Err(FaqbotError::EmbeddingOracleFailure(_))
        ));
    }
}
