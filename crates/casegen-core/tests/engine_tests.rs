use async_trait::async_trait;
use casegen_core::config::GenerationConfig;
use casegen_core::context::{ContextBundle, ContextError, ContextProvider};
use casegen_core::engine::{Availability, AvailabilityFlag, ErrorKind};
use casegen_core::knowledge::{FileKnowledgeStore, KnowledgeError, KnowledgeMatch, KnowledgeStore};
use casegen_core::model::DataMap;
use casegen_core::testdata::{TestDataClient, TestDataError};
use casegen_core::{
    GenerationEngine, GenerationRequest, LLMError, Priority, Stage, TestCase, TestStep, TestType,
    LLM,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TWO_CASES: &str = r#"```json
[
  {
    "title": "Login with valid password",
    "test_type": "functional",
    "priority": "high",
    "steps": [
      {"step_number": 1, "action": "Open login page", "expected_result": "Form shown"},
      {"step_number": 2, "action": "Submit valid password", "expected_result": "Dashboard shown"}
    ]
  },
  {
    "title": "Login with empty password",
    "test_type": "edge_case",
    "priority": "medium",
    "steps": ["Submit empty password - Validation error shown"]
  }
]
```"#;

/// LLM double that replays one canned answer and records prompts.
struct FakeLlm {
    reply: Result<String, String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(TWO_CASES.to_string()),
            delay: Some(delay),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LLM for FakeLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
        self.complete_with_system("", prompt).await
    }

    async fn complete_with_system(&self, _system: &str, prompt: &str) -> Result<String, LLMError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(|message| LLMError::ApiError {
            status: 500,
            message,
        })
    }

    fn name(&self) -> String {
        "fake/model".to_string()
    }
}

struct FailingContext;

#[async_trait]
impl ContextProvider for FailingContext {
    async fn gather(
        &self,
        _entity_type: &str,
        _workflow: Option<&str>,
        _requirement: &str,
    ) -> Result<ContextBundle, ContextError> {
        Err(ContextError::Unavailable("context service down".to_string()))
    }
}

struct FixedContext(ContextBundle);

#[async_trait]
impl ContextProvider for FixedContext {
    async fn gather(
        &self,
        _entity_type: &str,
        _workflow: Option<&str>,
        _requirement: &str,
    ) -> Result<ContextBundle, ContextError> {
        Ok(self.0.clone())
    }
}

/// Test-data double counting its calls.
struct FakeTestData {
    sample: Option<Value>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeTestData {
    fn new(sample: Option<Value>, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            sample,
            fail,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TestDataClient for FakeTestData {
    async fn generate_sample(
        &self,
        _entity_type: &str,
        _context: &DataMap,
    ) -> Result<Option<Value>, TestDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TestDataError::Network("connection refused".to_string()));
        }
        Ok(self.sample.clone())
    }
}

struct BrokenKnowledge;

#[async_trait]
impl KnowledgeStore for BrokenKnowledge {
    async fn find_similar(
        &self,
        _query: &str,
        _entity_type: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<KnowledgeMatch>, KnowledgeError> {
        Err(KnowledgeError::Unavailable("disk full".to_string()))
    }

    async fn store(
        &self,
        _test_case: &TestCase,
        _feedback: Option<&str>,
    ) -> Result<String, KnowledgeError> {
        Err(KnowledgeError::Unavailable("disk full".to_string()))
    }

    async fn update_usage(&self, _id: &str) -> Result<(), KnowledgeError> {
        Err(KnowledgeError::Unavailable("disk full".to_string()))
    }
}

fn login_request() -> GenerationRequest {
    GenerationRequest::new("Users can log in with a password", "user").with_count(2)
}

fn existing_case(title: &str, requirement: &str) -> TestCase {
    let step = TestStep::new(1, "Run it", "It passes").unwrap();
    let mut case = TestCase::new(title, "", TestType::Functional, Priority::Medium, vec![step]).unwrap();
    case.metadata.related_requirements = vec![requirement.to_string()];
    case
}

#[tokio::test]
async fn test_generate_success() {
    let llm = FakeLlm::replying(TWO_CASES);
    let engine = GenerationEngine::new(llm.clone());

    let response = engine.generate(login_request().with_workflow("sign-in")).await;

    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.count, 2);
    assert_eq!(response.test_cases.len(), 2);
    assert_eq!(response.llm_provider, "fake/model");
    assert!(response.error.is_none());
    assert_eq!(response.test_type_distribution[&TestType::EdgeCase], 1);
    assert_eq!(response.priority_distribution[&Priority::High], 1);

    let summary = response.coverage_summary.unwrap();
    assert_eq!(summary.total_tests, 2);
    assert_eq!(summary.edge_case_coverage_percentage, 50.0);

    for case in &response.test_cases {
        assert_eq!(case.entity_type(), Some("user"));
        assert_eq!(
            case.metadata.related_requirements,
            vec!["Users can log in with a password".to_string()]
        );
    }

    let prompt = llm.last_prompt();
    assert!(prompt.contains("Users can log in with a password"));
    assert!(prompt.contains("Workflow: sign-in"));
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_invalid_request_skips_llm() {
    let llm = FakeLlm::replying(TWO_CASES);
    let engine = GenerationEngine::new(llm.clone());

    let response = engine.generate(login_request().with_count(0)).await;

    assert!(!response.success);
    assert!(response.error.is_some());
    let details = response.error_details.unwrap();
    assert_eq!(details.kind, ErrorKind::InvalidRequest);
    assert_eq!(details.stage, None);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_count_above_configured_max_is_rejected() {
    let engine = GenerationEngine::new(FakeLlm::replying(TWO_CASES)).with_config(GenerationConfig {
        max_count: 3,
        ..GenerationConfig::default()
    });
    let response = engine.generate(login_request().with_count(4)).await;
    assert!(!response.success);
}

#[tokio::test]
async fn test_llm_failure_is_reported() {
    let engine = GenerationEngine::new(FakeLlm::failing("model overloaded"));

    let response = engine.generate(login_request()).await;

    assert!(!response.success);
    assert!(response.test_cases.is_empty());
    assert!(response.error.as_deref().unwrap().contains("model overloaded"));
    let details = response.error_details.unwrap();
    assert_eq!(details.kind, ErrorKind::LlmFailure);
    assert_eq!(details.stage, Some(Stage::Generate));
}

#[tokio::test]
async fn test_empty_llm_response() {
    let engine = GenerationEngine::new(FakeLlm::replying("  \n "));

    let response = engine.generate(login_request()).await;

    assert!(!response.success);
    assert_eq!(response.error_details.unwrap().kind, ErrorKind::EmptyResponse);
}

#[tokio::test]
async fn test_llm_timeout() {
    let engine = GenerationEngine::new(FakeLlm::slow(Duration::from_secs(30))).with_config(
        GenerationConfig {
            timeout_secs: 1,
            ..GenerationConfig::default()
        },
    );

    let response = engine.generate(login_request()).await;

    assert!(!response.success);
    let details = response.error_details.unwrap();
    assert_eq!(details.kind, ErrorKind::Timeout);
    assert_eq!(details.stage, Some(Stage::Generate));
}

#[tokio::test]
async fn test_unparsable_response_uses_fallback() {
    let engine = GenerationEngine::new(FakeLlm::replying("I cannot help with that."));

    let response = engine.generate(login_request()).await;

    assert!(response.success);
    assert_eq!(response.count, 1);
    assert_eq!(response.test_cases[0].title, "Generated Test Case");
    assert!(response
        .warnings
        .iter()
        .any(|w| w.contains("I cannot help with that.")));
}

#[tokio::test]
async fn test_extra_cases_are_truncated() {
    let engine = GenerationEngine::new(FakeLlm::replying(TWO_CASES));

    let response = engine.generate(login_request().with_count(1)).await;

    assert!(response.success);
    assert_eq!(response.count, 1);
    assert_eq!(response.test_cases[0].title, "Login with valid password");
    assert!(!response.warnings.is_empty());
}

#[tokio::test]
async fn test_context_failure_is_not_fatal() {
    let engine = GenerationEngine::new(FakeLlm::replying(TWO_CASES))
        .with_context_provider(Arc::new(FailingContext));

    let response = engine.generate(login_request()).await;
    assert!(response.success);
    assert_eq!(response.count, 2);
}

#[tokio::test]
async fn test_context_reaches_prompt() {
    let llm = FakeLlm::replying(TWO_CASES);
    let bundle = ContextBundle {
        domain_facts: vec!["Passwords expire after 90 days".to_string()],
        edge_case_suggestions: vec!["Try a password of exactly 8 characters".to_string()],
        ..ContextBundle::default()
    };
    let engine = GenerationEngine::new(llm.clone())
        .with_context_provider(Arc::new(FixedContext(bundle)));

    engine.generate(login_request()).await;

    let prompt = llm.last_prompt();
    assert!(prompt.contains("Passwords expire after 90 days"));
    assert!(prompt.contains("exactly 8 characters"));
}

#[tokio::test]
async fn test_domain_context_merged_into_cases() {
    let engine = GenerationEngine::new(FakeLlm::replying(TWO_CASES));
    let request = login_request().with_domain_context(DataMap::from([(
        "tenant".to_string(),
        json!("acme"),
    )]));

    let response = engine.generate(request).await;

    let context = response.test_cases[0].domain_context.as_ref().unwrap();
    assert_eq!(context["tenant"], json!("acme"));
    assert_eq!(context["entity_type"], json!("user"));
}

#[tokio::test]
async fn test_sample_data_attached() {
    let test_data = FakeTestData::new(Some(json!({"email": "ann@example.com"})), false);
    let engine = GenerationEngine::new(FakeLlm::replying(TWO_CASES))
        .with_test_data_client(test_data.clone());

    let response = engine.generate(login_request()).await;

    assert!(response.success);
    for case in &response.test_cases {
        let data = case.test_data.as_ref().unwrap();
        assert_eq!(data["email"], json!("ann@example.com"));
    }
    assert_eq!(test_data.calls.load(Ordering::SeqCst), 2);
    assert_eq!(engine.availability().get(), Availability::Available);
}

#[tokio::test]
async fn test_scalar_sample_is_wrapped() {
    let test_data = FakeTestData::new(Some(json!(42)), false);
    let engine = GenerationEngine::new(FakeLlm::replying(TWO_CASES))
        .with_test_data_client(test_data);

    let response = engine.generate(login_request()).await;
    let data = response.test_cases[0].test_data.as_ref().unwrap();
    assert_eq!(data["sample"], json!(42));
}

#[tokio::test]
async fn test_test_data_failure_trips_breaker() {
    let test_data = FakeTestData::new(None, true);
    let flag = Arc::new(AvailabilityFlag::new());
    let engine = GenerationEngine::new(FakeLlm::replying(TWO_CASES))
        .with_test_data_client(test_data.clone())
        .with_availability(flag.clone());

    let first = engine.generate(login_request()).await;
    let second = engine.generate(login_request()).await;

    assert!(first.success);
    assert!(second.success);
    assert!(first.test_cases.iter().all(|c| c.test_data.is_none()));
    assert_eq!(test_data.calls.load(Ordering::SeqCst), 1);
    assert_eq!(flag.get(), Availability::Unavailable);
}

#[tokio::test]
async fn test_preset_unavailable_flag_skips_agent() {
    let test_data = FakeTestData::new(Some(json!({"a": 1})), false);
    let engine = GenerationEngine::new(FakeLlm::replying(TWO_CASES))
        .with_test_data_client(test_data.clone())
        .with_availability(Arc::new(AvailabilityFlag::with_state(Availability::Unavailable)));

    let response = engine.generate(login_request()).await;

    assert!(response.success);
    assert_eq!(test_data.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_learn_failure_is_not_fatal() {
    let engine = GenerationEngine::new(FakeLlm::replying(TWO_CASES))
        .with_knowledge_store(Arc::new(BrokenKnowledge));

    let response = engine.generate(login_request()).await;
    assert!(response.success);
    assert_eq!(response.count, 2);
}

#[tokio::test]
async fn test_generated_cases_are_learned() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileKnowledgeStore::new(dir.path().join("entries")));
    let engine = GenerationEngine::new(FakeLlm::replying(TWO_CASES))
        .with_knowledge_store(store.clone());

    engine.generate(login_request()).await;
    engine.generate(login_request()).await;

    let entries = store.entries().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.entity_type.as_deref() == Some("user")));
}

#[tokio::test]
async fn test_refine() {
    let llm = FakeLlm::replying(TWO_CASES);
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileKnowledgeStore::new(dir.path()));
    let engine = GenerationEngine::new(llm.clone()).with_knowledge_store(store.clone());
    let existing = vec![existing_case("Login works", "REQ-1")];

    let response = engine.refine(&existing, "Add an empty password case").await;

    assert!(response.success);
    assert_eq!(response.count, 2);
    let prompt = llm.last_prompt();
    assert!(prompt.contains("Login works"));
    assert!(prompt.contains("Add an empty password case"));

    let entries = store.entries().await.unwrap();
    assert!(entries
        .iter()
        .all(|e| e.feedback == vec!["Add an empty password case".to_string()]));
}

#[tokio::test]
async fn test_refine_rejects_empty_input() {
    let llm = FakeLlm::replying(TWO_CASES);
    let engine = GenerationEngine::new(llm.clone());
    let existing = vec![existing_case("Login works", "REQ-1")];

    let no_cases = engine.refine(&[], "More cases").await;
    let no_feedback = engine.refine(&existing, "   ").await;

    assert_eq!(no_cases.error_details.unwrap().kind, ErrorKind::InvalidRequest);
    assert_eq!(no_feedback.error_details.unwrap().kind, ErrorKind::InvalidRequest);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_fill_gaps() {
    let llm = FakeLlm::replying(TWO_CASES);
    let engine = GenerationEngine::new(llm.clone());
    let existing = vec![existing_case("Login works", "REQ-1")];
    let requirements = vec!["REQ-1".to_string(), "REQ-2".to_string()];

    let response = engine.fill_gaps(&requirements, &existing).await;

    assert!(response.success);
    assert_eq!(response.count, 2);
    for case in &response.test_cases {
        assert_eq!(case.metadata.related_requirements, vec!["REQ-2".to_string()]);
    }
    let prompt = llm.last_prompt();
    assert!(prompt.contains("- REQ-2"));
    assert!(prompt.contains("- Login works"));

    let coverage = response
        .coverage_summary
        .unwrap()
        .requirement_coverage
        .unwrap();
    assert_eq!(coverage.coverage_percentage, 100.0);
}

#[tokio::test]
async fn test_fill_gaps_leaves_unlinked_cases_alone_with_several_gaps() {
    let reply = r#"[
        {"title": "Refund flow", "requirements": ["REQ-3"], "steps": ["Request refund - Refund issued"]},
        {"title": "Unrelated smoke check", "steps": ["Open app - App loads"]}
    ]"#;
    let engine = GenerationEngine::new(FakeLlm::replying(reply));
    let existing = vec![existing_case("Login works", "REQ-1")];
    let requirements: Vec<String> = ["REQ-1", "REQ-2", "REQ-3"]
        .iter()
        .map(|r| r.to_string())
        .collect();

    let response = engine.fill_gaps(&requirements, &existing).await;

    assert!(response.success);
    assert_eq!(
        response.test_cases[0].metadata.related_requirements,
        vec!["REQ-3".to_string()]
    );
    assert!(response.test_cases[1].metadata.related_requirements.is_empty());

    let coverage = response
        .coverage_summary
        .unwrap()
        .requirement_coverage
        .unwrap();
    assert_eq!(coverage.uncovered_requirements, vec!["REQ-2".to_string()]);
}

#[tokio::test]
async fn test_fill_gaps_with_nothing_missing() {
    let llm = FakeLlm::replying(TWO_CASES);
    let engine = GenerationEngine::new(llm.clone());
    let existing = vec![existing_case("Login works", "REQ-1")];

    let response = engine.fill_gaps(&["REQ-1".to_string()], &existing).await;

    assert!(response.success);
    assert_eq!(response.count, 0);
    assert!(!response.warnings.is_empty());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_generate_batch_keeps_order_and_isolates_failures() {
    let engine = GenerationEngine::new(FakeLlm::replying(TWO_CASES));
    let requests = vec![
        login_request(),
        login_request().with_count(0),
        GenerationRequest::new("Users can log out", "session").with_count(2),
    ];

    let responses = engine.generate_batch(requests).await;

    assert_eq!(responses.len(), 3);
    assert!(responses[0].success);
    assert!(!responses[1].success);
    assert!(responses[2].success);
    assert_eq!(responses[2].test_cases[0].entity_type(), Some("session"));
}
