//! End-to-end question answering
//!
//! route -> plan -> expand -> execute -> fuse -> synthesize

use super::{
    Passage, QueryLog, RetrievalExecutor, RetrievalPlanner, RetrievalStep, SemanticPassPolicy,
    SourceFairReranker,
};
use crate::catalog::KnowledgeBaseCatalog;
use crate::config::{Config, RetrievalConfig};
use crate::db::Database;
use crate::error::{Result, SecDocsError};
use crate::index::{IndexCache, IndexHandle, ParserRegistry};
use crate::llm::{
    AnswerSynthesizer, HttpEmbedder, HttpQueryExpander, HttpReranker, LLMClient, QueryExpander,
    Reranker, SourceRouter, VLLMClient,
};
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Answer text when the router selects nothing
pub const NO_SOURCE_MESSAGE: &str = "I could not determine which documents to search.";

fn no_passages_message(sources: &[String]) -> String {
    format!(
        "I found the right documents ({}), but could not retrieve specific information.",
        sources.join(", ")
    )
}

/// How a query ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Answered,
    NoSourceSelected,
    NoPassagesRetrieved,
}

/// Result of one `answer` call
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub answer: String,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// Fused passages as handed to synthesis
    pub context: String,
    pub outcome: AnswerOutcome,
    pub selected_sources: Vec<String>,
    pub passages: Vec<Passage>,
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

/// Routing and planning output, before any retrieval
#[derive(Debug, Clone, Serialize)]
pub struct QueryPlan {
    pub selected_sources: Vec<String>,
    /// `None` when no step needed expansion
    pub expanded_terms: Option<Vec<String>>,
    pub steps: Vec<RetrievalStep>,
}

/// Retrieval orchestration engine
pub struct RagEngine {
    catalog: Arc<KnowledgeBaseCatalog>,
    cache: Arc<IndexCache>,
    router: SourceRouter,
    planner: RetrievalPlanner,
    expander: Arc<dyn QueryExpander>,
    executor: RetrievalExecutor,
    fusion: SourceFairReranker,
    rerank_top_n: usize,
    synthesizer: AnswerSynthesizer,
    query_log_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl RagEngine {
    /// Engine over explicit collaborators.
    ///
    /// `classifier` serves routing, expansion and reranking; `synthesis`
    /// writes the final answer and may be a larger model.
    pub fn new(
        catalog: Arc<KnowledgeBaseCatalog>,
        cache: Arc<IndexCache>,
        classifier: Arc<dyn LLMClient>,
        synthesis: Arc<dyn LLMClient>,
        retrieval: &RetrievalConfig,
    ) -> Result<Self> {
        let planner = RetrievalPlanner::new(catalog.clone())?
            .with_policy(SemanticPassPolicy::new(retrieval.semantic_pass_min_tokens));

        let expander = Arc::new(
            HttpQueryExpander::new(classifier.clone()).with_terms(retrieval.expansion_terms),
        );

        let executor = RetrievalExecutor::new(cache.clone())
            .with_limits(retrieval.metadata_top_k, retrieval.semantic_top_k)
            .with_concurrency(retrieval.max_concurrent_steps);

        let reranker = Arc::new(HttpReranker::new(classifier.clone()).with_top_n(retrieval.rerank_top_n));

        Ok(Self {
            router: SourceRouter::new(classifier, catalog.clone()),
            catalog,
            cache,
            planner,
            expander,
            executor,
            fusion: SourceFairReranker::new(reranker).with_top_n(retrieval.rerank_top_n),
            rerank_top_n: retrieval.rerank_top_n,
            synthesizer: AnswerSynthesizer::new(synthesis),
            query_log_dir: None,
            timeout: retrieval.query_timeout_secs.map(Duration::from_secs),
        })
    }

    /// Engine backed by the SQLite store and OpenAI-compatible services in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = Arc::new(config.catalog()?);

        let classifier = Arc::new(VLLMClient::new(config.classifier.clone())?);
        let synthesis = Arc::new(VLLMClient::new(config.synthesis.clone())?);

        let embedder = Arc::new(HttpEmbedder::new(classifier.clone()));
        let db = Database::open(config.database_path(), embedder)?;
        db.initialize()?;

        let cache = Arc::new(IndexCache::new(
            catalog.clone(),
            Arc::new(db),
            ParserRegistry::with_defaults(),
            config.docs_dir.clone(),
        ));

        Ok(Self::new(catalog, cache, classifier, synthesis, &config.retrieval)?
            .with_query_log_dir(config.query_log_dir.clone()))
    }

    pub fn with_expander(mut self, expander: Arc<dyn QueryExpander>) -> Self {
        self.expander = expander;
        self
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.fusion = SourceFairReranker::new(reranker).with_top_n(self.rerank_top_n);
        self
    }

    pub fn with_query_log_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.query_log_dir = dir;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Arc<KnowledgeBaseCatalog> {
        &self.catalog
    }

    /// Answer a natural-language question.
    ///
    /// "No source" and "no passages" are ordinary results; only a failed
    /// routing call, a failed synthesis or the deadline produce an error.
    pub async fn answer(&self, query: &str) -> Result<QueryResult> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.answer_inner(query))
                .await
                .map_err(|_| SecDocsError::Timeout(limit.as_secs()))?,
            None => self.answer_inner(query).await,
        }
    }

    /// Route and plan without retrieving anything
    pub async fn plan(&self, query: &str) -> Result<QueryPlan> {
        let query = validate_query(query)?;
        self.build_plan(query, &mut QueryLog::disabled()).await
    }

    /// Open or build indices ahead of the first query
    pub async fn build(&self, source: Option<&str>) -> Result<Vec<Arc<IndexHandle>>> {
        let names: Vec<String> = match source {
            Some(name) => {
                let kb = self
                    .catalog
                    .resolve(name)
                    .ok_or_else(|| SecDocsError::SourceNotFound(name.to_string()))?;
                vec![kb.name.clone()]
            }
            None => self.catalog.names().into_iter().map(String::from).collect(),
        };

        let mut handles = Vec::with_capacity(names.len());
        for name in &names {
            handles.push(self.cache.get(name).await?);
        }
        Ok(handles)
    }

    async fn build_plan(&self, query: &str, log: &mut QueryLog) -> Result<QueryPlan> {
        let decision = self.router.route(query).await?;
        log.routing(&decision);

        let selected_sources = decision.sources;
        let mut steps = self.planner.plan_all(query, &selected_sources)?;

        let mut expanded_terms = None;
        if steps.iter().any(RetrievalStep::is_semantic) {
            let terms = self.expander.expand(query).await;
            log.expansion(query, &terms);
            steps = steps.into_iter().map(|s| s.with_terms(&terms)).collect();
            expanded_terms = Some(terms);
        }

        log.plan(&steps);

        Ok(QueryPlan {
            selected_sources,
            expanded_terms,
            steps,
        })
    }

    async fn answer_inner(&self, query: &str) -> Result<QueryResult> {
        let query = validate_query(query)?;
        let start = Instant::now();
        let mut log = QueryLog::for_dir(self.query_log_dir.as_deref());
        log.start(query);

        tracing::info!("Answering: {}", query);

        let plan = match self.build_plan(query, &mut log).await {
            Ok(plan) => plan,
            Err(e) => {
                log.error(&e.to_string());
                return Err(e);
            }
        };

        if plan.selected_sources.is_empty() {
            tracing::info!("No knowledge base selected");
            let result = QueryResult {
                answer: NO_SOURCE_MESSAGE.to_string(),
                elapsed: start.elapsed(),
                context: String::new(),
                outcome: AnswerOutcome::NoSourceSelected,
                selected_sources: vec![],
                passages: vec![],
            };
            log.final_response(&result.answer, result.elapsed);
            return Ok(result);
        }

        tracing::info!(
            "Executing {} step(s) across {:?}",
            plan.steps.len(),
            plan.selected_sources
        );

        let passages = self.executor.execute_plan(&plan.steps).await;
        log.retrieved(&passages);

        if passages.is_empty() {
            let result = QueryResult {
                answer: no_passages_message(&plan.selected_sources),
                elapsed: start.elapsed(),
                context: String::new(),
                outcome: AnswerOutcome::NoPassagesRetrieved,
                selected_sources: plan.selected_sources,
                passages: vec![],
            };
            log.final_response(&result.answer, result.elapsed);
            return Ok(result);
        }

        let fused = self
            .fusion
            .rerank(query, passages, &plan.selected_sources)
            .await;
        log.reranked(&fused);

        let context = AnswerSynthesizer::assemble_context(&fused);
        let prompt = AnswerSynthesizer::build_prompt(query, &context);
        log.final_prompt(&prompt);

        let answer = match self.synthesizer.synthesize_prompt(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                log.error(&e.to_string());
                return Err(e);
            }
        };

        let elapsed = start.elapsed();
        log.final_response(&answer, elapsed);
        tracing::info!("Answered in {:.2}s from {} passages", elapsed.as_secs_f64(), fused.len());

        Ok(QueryResult {
            answer,
            elapsed,
            context,
            outcome: AnswerOutcome::Answered,
            selected_sources: plan.selected_sources,
            passages: fused,
        })
    }
}

fn validate_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(SecDocsError::InvalidInput("query is empty".to_string()));
    }
    Ok(query)
}
