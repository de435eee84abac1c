use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::coverage::CoverageReport;
use crate::model::{DataMap, Priority, TestCase, TestType};

/// Stages of one generation, executed strictly in order:
/// GatherContext → BuildPrompt → Generate → Parse → Enrich →
/// AnalyzeCoverage → Learn → Respond
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    GatherContext,
    BuildPrompt,
    Generate,
    Parse,
    Enrich,
    AnalyzeCoverage,
    Learn,
    Respond,
}

impl Stage {
    /// Returns the next stage, or None after `Respond`.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::GatherContext => Some(Stage::BuildPrompt),
            Stage::BuildPrompt => Some(Stage::Generate),
            Stage::Generate => Some(Stage::Parse),
            Stage::Parse => Some(Stage::Enrich),
            Stage::Enrich => Some(Stage::AnalyzeCoverage),
            Stage::AnalyzeCoverage => Some(Stage::Learn),
            Stage::Learn => Some(Stage::Respond),
            Stage::Respond => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::GatherContext => "Gather context",
            Stage::BuildPrompt => "Build prompt",
            Stage::Generate => "Generate",
            Stage::Parse => "Parse",
            Stage::Enrich => "Enrich",
            Stage::AnalyzeCoverage => "Analyze coverage",
            Stage::Learn => "Learn",
            Stage::Respond => "Respond",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How much detail the model is asked to put into each case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl DetailLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(DetailLevel::Low),
            "medium" => Some(DetailLevel::Medium),
            "high" => Some(DetailLevel::High),
            _ => None,
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            DetailLevel::Low => "Keep each test case brief: 1-3 steps, no test data.",
            DetailLevel::Medium => {
                "Give each test case 3-6 concrete steps with expected results and preconditions where relevant."
            }
            DetailLevel::High => {
                "Give each test case detailed steps with expected results, preconditions, postconditions and concrete test data."
            }
        }
    }
}

/// A request for new test cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub requirement: String,
    pub entity_type: String,
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(default)]
    pub test_types: Vec<TestType>,
    pub count: usize,
    #[serde(default = "enabled")]
    pub include_edge_cases: bool,
    #[serde(default = "enabled")]
    pub include_negative_tests: bool,
    #[serde(default)]
    pub detail_level: DetailLevel,
    #[serde(default)]
    pub domain_context: Option<DataMap>,
}

fn enabled() -> bool {
    true
}

impl GenerationRequest {
    pub fn new(requirement: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            requirement: requirement.into(),
            entity_type: entity_type.into(),
            workflow: None,
            test_types: Vec::new(),
            count: 5,
            include_edge_cases: true,
            include_negative_tests: true,
            detail_level: DetailLevel::default(),
            domain_context: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflow = Some(workflow.into());
        self
    }

    pub fn with_test_types(mut self, test_types: Vec<TestType>) -> Self {
        self.test_types = test_types;
        self
    }

    pub fn with_detail_level(mut self, detail_level: DetailLevel) -> Self {
        self.detail_level = detail_level;
        self
    }

    pub fn with_domain_context(mut self, domain_context: DataMap) -> Self {
        self.domain_context = Some(domain_context);
        self
    }

    /// Checks the request against the configured count limit.
    pub fn validate(&self, max_count: usize) -> Result<(), String> {
        if self.requirement.trim().is_empty() {
            return Err("Requirement must not be empty".to_string());
        }
        if self.entity_type.trim().is_empty() {
            return Err("Entity type must not be empty".to_string());
        }
        if self.count == 0 || self.count > max_count {
            return Err(format!(
                "Count must be between 1 and {}, got {}",
                max_count, self.count
            ));
        }
        Ok(())
    }
}

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    LlmFailure,
    Timeout,
    EmptyResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub kind: ErrorKind,
    /// Stage that failed; absent when the request itself was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

/// What every engine entry point returns, success or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub success: bool,
    pub test_cases: Vec<TestCase>,
    pub count: usize,
    pub generation_time_ms: u64,
    pub llm_provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_summary: Option<CoverageReport>,
    pub test_type_distribution: BTreeMap<TestType, usize>,
    pub priority_distribution: BTreeMap<Priority, usize>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetails>,
}

impl GenerationResponse {
    pub(crate) fn failure(
        llm_provider: String,
        generation_time_ms: u64,
        message: String,
        details: ErrorDetails,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            success: false,
            test_cases: Vec::new(),
            count: 0,
            generation_time_ms,
            llm_provider,
            coverage_summary: None,
            test_type_distribution: BTreeMap::new(),
            priority_distribution: BTreeMap::new(),
            warnings,
            suggestions: Vec::new(),
            error: Some(message),
            error_details: Some(details),
        }
    }
}
