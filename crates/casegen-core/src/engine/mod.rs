//! The generation engine: context → prompt → model → parse → enrich →
//! coverage → learn.
//!
//! Collaborators are injected, so the same engine runs against real HTTP
//! services or in-test fakes. Entry points never return `Err`; failures are
//! reported inside [`GenerationResponse`].

mod availability;
pub mod prompts;
mod request;

pub use availability::{Availability, AvailabilityFlag};
pub use request::{
    DetailLevel, ErrorDetails, ErrorKind, GenerationRequest, GenerationResponse, Stage,
};

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, GenerationConfig};
use crate::context::{ContextBundle, ContextProvider, KnowledgeContextProvider, NoContext};
use crate::coverage::{CoverageAnalyzer, CoveragePolicy, CoverageReport};
use crate::knowledge::{FileKnowledgeStore, KnowledgeStore};
use crate::llm::{LLMError, Provider, LLM};
use crate::model::{DataMap, TestCase};
use crate::parser::{excerpt, parse_response};
use crate::testdata::{HttpTestDataClient, TestDataClient};

use prompts::{build_gap_prompt, build_generation_prompt, build_refinement_prompt, SYSTEM_PROMPT};

/// Orchestrates one generation per call; holds no per-request state.
pub struct GenerationEngine {
    llm: Arc<dyn LLM>,
    context: Arc<dyn ContextProvider>,
    test_data: Option<Arc<dyn TestDataClient>>,
    knowledge: Option<Arc<dyn KnowledgeStore>>,
    availability: Arc<AvailabilityFlag>,
    analyzer: CoverageAnalyzer,
    config: GenerationConfig,
}

/// A failed stage, carried back to the entry point.
struct StageFailure {
    stage: Stage,
    kind: ErrorKind,
    message: String,
}

/// What a finished model call is turned into.
struct Job<'a> {
    prompt: String,
    entity_type: Option<&'a str>,
    domain_context: Option<&'a DataMap>,
    requirements: Option<&'a [String]>,
    policy: Option<CoveragePolicy>,
    limit: Option<usize>,
    feedback: Option<&'a str>,
    /// Cases analyzed alongside the new ones but not returned.
    existing: &'a [TestCase],
}

impl GenerationEngine {
    /// Creates an engine with no context, test data or knowledge.
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self {
            llm,
            context: Arc::new(NoContext),
            test_data: None,
            knowledge: None,
            availability: Arc::new(AvailabilityFlag::new()),
            analyzer: CoverageAnalyzer::default(),
            config: GenerationConfig::default(),
        }
    }

    /// Wires every collaborator from configuration.
    pub fn from_config(config: &Config) -> Result<Self, LLMError> {
        let llm: Arc<dyn LLM> = Arc::from(Provider::from_config(&config.llm).build_with(&config.llm)?);
        let mut engine = Self::new(llm)
            .with_config(config.generation.clone())
            .with_analyzer(CoverageAnalyzer::new(config.coverage.clone()));

        if config.knowledge.enabled {
            let store: Arc<dyn KnowledgeStore> =
                Arc::new(FileKnowledgeStore::from_config(&config.knowledge));
            engine = engine
                .with_context_provider(Arc::new(KnowledgeContextProvider::new(
                    Arc::clone(&store),
                    config.knowledge.similar_limit,
                )))
                .with_knowledge_store(store);
        }

        if let Some(endpoint) = &config.test_data.endpoint {
            engine = engine.with_test_data_client(Arc::new(HttpTestDataClient::new(endpoint)));
        }

        Ok(engine)
    }

    pub fn with_context_provider(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = context;
        self
    }

    pub fn with_test_data_client(mut self, client: Arc<dyn TestDataClient>) -> Self {
        self.test_data = Some(client);
        self
    }

    pub fn with_knowledge_store(mut self, store: Arc<dyn KnowledgeStore>) -> Self {
        self.knowledge = Some(store);
        self
    }

    /// Shares an availability flag, e.g. between several engines of a process.
    pub fn with_availability(mut self, flag: Arc<AvailabilityFlag>) -> Self {
        self.availability = flag;
        self
    }

    pub fn with_analyzer(mut self, analyzer: CoverageAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn availability(&self) -> &AvailabilityFlag {
        &self.availability
    }

    /// Generates new test cases for a requirement.
    pub async fn generate(&self, request: GenerationRequest) -> GenerationResponse {
        let started = Instant::now();
        if let Err(message) = request.validate(self.config.max_count) {
            return self.rejected(started, message);
        }
        info!(
            entity_type = %request.entity_type,
            count = request.count,
            "Generating test cases"
        );

        enter(Stage::GatherContext);
        let context = self.gather_context(&request).await;

        enter(Stage::BuildPrompt);
        let prompt = build_generation_prompt(&request, &context);

        let policy = context.coverage_policy.clone().unwrap_or_else(|| {
            CoveragePolicy::for_request(&request.test_types, request.count, request.include_edge_cases)
        });
        let requirement = [request.requirement.clone()];

        self.run(
            Job {
                prompt,
                entity_type: Some(&request.entity_type),
                domain_context: request.domain_context.as_ref(),
                requirements: None,
                policy: Some(policy),
                limit: Some(request.count),
                feedback: None,
                existing: &[],
            },
            Some(requirement.as_slice()),
            started,
        )
        .await
    }

    /// Rewrites existing test cases according to feedback.
    pub async fn refine(&self, test_cases: &[TestCase], feedback: &str) -> GenerationResponse {
        let started = Instant::now();
        if test_cases.is_empty() {
            return self.rejected(started, "No test cases to refine".to_string());
        }
        if feedback.trim().is_empty() {
            return self.rejected(started, "Feedback must not be empty".to_string());
        }
        info!(count = test_cases.len(), "Refining test cases");

        enter(Stage::BuildPrompt);
        let entity_type = test_cases.iter().find_map(TestCase::entity_type);

        self.run(
            Job {
                prompt: build_refinement_prompt(test_cases, feedback),
                entity_type,
                domain_context: test_cases.iter().find_map(|t| t.domain_context.as_ref()),
                requirements: None,
                policy: None,
                limit: None,
                feedback: Some(feedback),
                existing: &[],
            },
            None,
            started,
        )
        .await
    }

    /// Generates test cases for requirements the existing set misses.
    pub async fn fill_gaps(
        &self,
        requirements: &[String],
        existing_tests: &[TestCase],
    ) -> GenerationResponse {
        let started = Instant::now();
        if requirements.iter().all(|r| r.trim().is_empty()) {
            return self.rejected(started, "At least one requirement is needed".to_string());
        }

        let before = self.analyzer.analyze(existing_tests, Some(requirements), None);
        let uncovered = before
            .requirement_coverage
            .as_ref()
            .map(|r| r.uncovered_requirements.clone())
            .unwrap_or_default();
        if uncovered.is_empty() {
            info!("Every requirement is already covered");
            return self.respond(
                started,
                Vec::new(),
                before,
                vec!["Every requirement is already covered; nothing generated".to_string()],
            );
        }
        info!(uncovered = uncovered.len(), "Filling coverage gaps");

        enter(Stage::BuildPrompt);
        let entity_type = existing_tests.iter().find_map(TestCase::entity_type);
        // With several gaps an unlinked case cannot be attributed to any one of them
        let attach = (uncovered.len() == 1).then_some(uncovered.as_slice());

        self.run(
            Job {
                prompt: build_gap_prompt(&uncovered, &before.gaps, existing_tests),
                entity_type,
                domain_context: None,
                requirements: Some(requirements),
                policy: None,
                limit: None,
                feedback: None,
                existing: existing_tests,
            },
            attach,
            started,
        )
        .await
    }

    /// Runs every request independently and concurrently.
    pub async fn generate_batch(&self, requests: Vec<GenerationRequest>) -> Vec<GenerationResponse> {
        join_all(requests.into_iter().map(|request| self.generate(request))).await
    }

    /// Generate → Parse → Enrich → AnalyzeCoverage → Learn → Respond.
    ///
    /// `attach` lists requirements linked to new cases that mention none.
    async fn run(&self, job: Job<'_>, attach: Option<&[String]>, started: Instant) -> GenerationResponse {
        enter(Stage::Generate);
        let raw = match self.call_llm(&job.prompt).await {
            Ok(raw) => raw,
            Err(failure) => {
                warn!(stage = %failure.stage, error = %failure.message, "Generation failed");
                return GenerationResponse::failure(
                    self.llm.name(),
                    elapsed_ms(started),
                    failure.message,
                    ErrorDetails {
                        kind: failure.kind,
                        stage: Some(failure.stage),
                    },
                    Vec::new(),
                );
            }
        };

        enter(Stage::Parse);
        let outcome = parse_response(&raw);
        let mut warnings = outcome.warnings;
        if outcome.used_fallback {
            warnings.push(format!(
                "Response excerpt: {}",
                excerpt(&raw, self.config.error_context_length)
            ));
        }
        let mut test_cases = outcome.test_cases;
        if let Some(limit) = job.limit {
            if test_cases.len() > limit {
                warnings.push(format!(
                    "Model returned {} test cases, keeping the first {}",
                    test_cases.len(),
                    limit
                ));
                test_cases.truncate(limit);
            }
        }

        enter(Stage::Enrich);
        self.enrich(&mut test_cases, &job, attach).await;

        enter(Stage::AnalyzeCoverage);
        let report = if job.existing.is_empty() {
            self.analyzer
                .analyze(&test_cases, job.requirements, job.policy.as_ref())
        } else {
            let combined: Vec<TestCase> =
                job.existing.iter().chain(test_cases.iter()).cloned().collect();
            self.analyzer
                .analyze(&combined, job.requirements, job.policy.as_ref())
        };

        enter(Stage::Learn);
        self.learn(&test_cases, job.feedback).await;

        self.respond(started, test_cases, report, warnings)
    }

    async fn gather_context(&self, request: &GenerationRequest) -> ContextBundle {
        match self
            .context
            .gather(
                &request.entity_type,
                request.workflow.as_deref(),
                &request.requirement,
            )
            .await
        {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(error = %e, "Context gathering failed; continuing without context");
                ContextBundle::default()
            }
        }
    }

    async fn call_llm(&self, prompt: &str) -> Result<String, StageFailure> {
        let system = self.config.system_prompt.as_deref().unwrap_or(SYSTEM_PROMPT);
        let timeout = self.config.timeout();

        let failure = |kind, message| StageFailure {
            stage: Stage::Generate,
            kind,
            message,
        };

        match tokio::time::timeout(timeout, self.llm.complete_with_system(system, prompt)).await {
            Err(_) => Err(failure(
                ErrorKind::Timeout,
                format!("LLM call timed out after {}s", timeout.as_secs()),
            )),
            Ok(Err(e)) => Err(failure(ErrorKind::LlmFailure, format!("LLM call failed: {}", e))),
            Ok(Ok(raw)) if raw.trim().is_empty() => Err(failure(
                ErrorKind::EmptyResponse,
                "LLM returned an empty response".to_string(),
            )),
            Ok(Ok(raw)) => Ok(raw),
        }
    }

    /// Attaches domain context, requirements and sample data.
    async fn enrich(&self, test_cases: &mut [TestCase], job: &Job<'_>, attach: Option<&[String]>) {
        for case in test_cases.iter_mut() {
            if let Some(requirements) = job.requirements {
                for requirement in requirements {
                    if case.mentions(requirement)
                        && !case.metadata.related_requirements.contains(requirement)
                    {
                        case.metadata.related_requirements.push(requirement.clone());
                    }
                }
            }
            if case.metadata.related_requirements.is_empty() {
                if let Some(attach) = attach {
                    case.metadata.related_requirements.extend(attach.iter().cloned());
                }
            }

            let mut context = case.domain_context.take().unwrap_or_default();
            if let Some(extra) = job.domain_context {
                for (key, value) in extra {
                    context.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
            if let Some(entity_type) = job.entity_type {
                context
                    .entry("entity_type".to_string())
                    .or_insert_with(|| Value::String(entity_type.to_string()));
            }
            case.domain_context = (!context.is_empty()).then_some(context);

            if case.test_data.is_none() {
                case.test_data = self.sample_data(case).await;
            }
        }
    }

    /// Asks the test-data agent for a sample unless the breaker has tripped.
    async fn sample_data(&self, case: &TestCase) -> Option<DataMap> {
        let client = self.test_data.as_ref()?;
        let entity_type = case.entity_type()?;
        if !self.availability.is_usable() {
            return None;
        }

        let context = case.domain_context.clone().unwrap_or_default();
        match client.generate_sample(entity_type, &context).await {
            Ok(sample) => {
                self.availability.mark_available();
                sample.map(|value| match value {
                    Value::Object(map) => map.into_iter().collect(),
                    other => DataMap::from([("sample".to_string(), other)]),
                })
            }
            Err(e) => {
                if self.availability.mark_unavailable() {
                    warn!(error = %e, "Test data agent failed; disabling it for this process");
                }
                None
            }
        }
    }

    async fn learn(&self, test_cases: &[TestCase], feedback: Option<&str>) {
        let Some(store) = &self.knowledge else {
            return;
        };

        let mut stored = 0;
        for case in test_cases {
            match store.store(case, feedback).await {
                Ok(_) => stored += 1,
                Err(e) => warn!(title = %case.title, error = %e, "Failed to learn test case"),
            }
        }
        debug!(stored, "Learned test cases");
    }

    fn respond(
        &self,
        started: Instant,
        test_cases: Vec<TestCase>,
        report: CoverageReport,
        warnings: Vec<String>,
    ) -> GenerationResponse {
        enter(Stage::Respond);
        let generation_time_ms = elapsed_ms(started);
        info!(count = test_cases.len(), generation_time_ms, "Generation complete");

        GenerationResponse {
            success: true,
            count: test_cases.len(),
            test_cases,
            generation_time_ms,
            llm_provider: self.llm.name(),
            test_type_distribution: report.test_type_distribution.clone(),
            priority_distribution: report.priority_distribution.clone(),
            suggestions: report.recommendations.clone(),
            coverage_summary: Some(report),
            warnings,
            error: None,
            error_details: None,
        }
    }

    fn rejected(&self, started: Instant, message: String) -> GenerationResponse {
        warn!(error = %message, "Rejected generation request");
        GenerationResponse::failure(
            self.llm.name(),
            elapsed_ms(started),
            message,
            ErrorDetails {
                kind: ErrorKind::InvalidRequest,
                stage: None,
            },
            Vec::new(),
        )
    }
}

fn enter(stage: Stage) {
    debug!(stage = %stage, "Entering stage");
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
