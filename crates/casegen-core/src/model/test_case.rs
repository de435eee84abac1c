use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{
    DEFAULT_AGENT_ID, DEFAULT_AUTOMATION_STATUS, DEFAULT_TEST_CASE_VERSION, ID_SLUG_LENGTH,
};

/// Loosely structured key/value data attached to steps and test cases.
pub type DataMap = BTreeMap<String, Value>;

/// Expected result used when a free-text step carries none.
pub const DEFAULT_STEP_EXPECTATION: &str = "Step completes successfully";

/// Expected result of the synthetic step created for step-less records.
pub const DEFAULT_TEST_EXPECTATION: &str = "Test completes successfully";

/// Kind of verification a test case performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    #[default]
    Functional,
    Integration,
    Unit,
    Performance,
    Security,
    Usability,
    EdgeCase,
    Negative,
    Regression,
    Smoke,
    Acceptance,
}

impl TestType {
    pub const ALL: [TestType; 11] = [
        TestType::Functional,
        TestType::Integration,
        TestType::Unit,
        TestType::Performance,
        TestType::Security,
        TestType::Usability,
        TestType::EdgeCase,
        TestType::Negative,
        TestType::Regression,
        TestType::Smoke,
        TestType::Acceptance,
    ];

    /// Parses a free-text type name, defaulting to `Functional`.
    ///
    /// Matching ignores case and treats spaces, hyphens and underscores alike,
    /// so `"Edge Case"`, `"edge-case"` and `"EDGE_CASE"` are all `EdgeCase`.
    pub fn parse(value: &str) -> Self {
        let key: String = value
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();

        match key.as_str() {
            "functional" => TestType::Functional,
            "integration" => TestType::Integration,
            "unit" => TestType::Unit,
            "performance" | "load" => TestType::Performance,
            "security" => TestType::Security,
            "usability" | "ux" => TestType::Usability,
            "edgecase" | "edge" | "boundary" => TestType::EdgeCase,
            "negative" => TestType::Negative,
            "regression" => TestType::Regression,
            "smoke" => TestType::Smoke,
            "acceptance" | "uat" => TestType::Acceptance,
            _ => TestType::Functional,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Functional => "functional",
            TestType::Integration => "integration",
            TestType::Unit => "unit",
            TestType::Performance => "performance",
            TestType::Security => "security",
            TestType::Usability => "usability",
            TestType::EdgeCase => "edge_case",
            TestType::Negative => "negative",
            TestType::Regression => "regression",
            TestType::Smoke => "smoke",
            TestType::Acceptance => "acceptance",
        }
    }

    /// Whether the type counts towards edge-case coverage.
    pub fn is_edge(&self) -> bool {
        matches!(self, TestType::EdgeCase | TestType::Negative)
    }
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution priority, most urgent first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    /// Parses a priority name or its 1-4 rank, defaulting to `Medium`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "critical" | "1" | "p1" | "blocker" => Priority::Critical,
            "high" | "2" | "p2" => Priority::High,
            "medium" | "3" | "p3" | "normal" => Priority::Medium,
            "low" | "4" | "p4" | "minor" => Priority::Low,
            _ => Priority::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invariant violations detected while constructing steps or test cases.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Test case title must not be empty")]
    EmptyTitle,

    #[error("Test case description must not be empty")]
    EmptyDescription,

    #[error("Test case must contain at least one step")]
    NoSteps,

    #[error("Step {0} has an empty action")]
    EmptyAction(u32),

    #[error("Step {0} has an empty expected result")]
    EmptyExpectedResult(u32),

    #[error("Step numbers must run 1..n without gaps: expected {expected}, found {found}")]
    NonSequentialSteps { expected: u32, found: u32 },
}

/// A single ordered step of a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    pub step_number: u32,
    pub action: String,
    pub expected_result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_data: Option<DataMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TestStep {
    /// Creates a step, trimming both texts.
    pub fn new(
        step_number: u32,
        action: impl AsRef<str>,
        expected_result: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        let action = action.as_ref().trim();
        let expected_result = expected_result.as_ref().trim();

        if action.is_empty() {
            return Err(ValidationError::EmptyAction(step_number));
        }
        if expected_result.is_empty() {
            return Err(ValidationError::EmptyExpectedResult(step_number));
        }

        Ok(Self {
            step_number,
            action: action.to_string(),
            expected_result: expected_result.to_string(),
            test_data: None,
            validation: None,
            notes: None,
        })
    }
}

/// Provenance and bookkeeping for a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseMetadata {
    pub created_by: String,
    pub version: String,
    pub automation_status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub related_requirements: Vec<String>,
}

impl Default for TestCaseMetadata {
    fn default() -> Self {
        Self {
            created_by: DEFAULT_AGENT_ID.to_string(),
            version: DEFAULT_TEST_CASE_VERSION.to_string(),
            automation_status: DEFAULT_AUTOMATION_STATUS.to_string(),
            created_at: Utc::now(),
            related_requirements: Vec::new(),
        }
    }
}

/// The canonical, validated test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    pub description: String,
    pub test_type: TestType,
    pub priority: Priority,
    pub steps: Vec<TestStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postconditions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_data: Option<DataMap>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_context: Option<DataMap>,
    #[serde(default)]
    pub metadata: TestCaseMetadata,
}

impl TestCase {
    /// Creates a validated test case with a generated id.
    ///
    /// An empty description falls back to the title.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        test_type: TestType,
        priority: Priority,
        steps: Vec<TestStep>,
    ) -> Result<Self, ValidationError> {
        let title = title.into().trim().to_string();
        let description = description.into().trim().to_string();
        let description = if description.is_empty() {
            title.clone()
        } else {
            description
        };

        let test_case = Self {
            id: Self::generate_id(&title),
            title,
            description,
            test_type,
            priority,
            steps,
            preconditions: None,
            postconditions: None,
            test_data: None,
            tags: BTreeSet::new(),
            domain_context: None,
            metadata: TestCaseMetadata::default(),
        };

        test_case.validate()?;
        Ok(test_case)
    }

    /// Derives an id from the title.
    ///
    /// Format: `TC_<SLUG>_<suffix>` where the slug keeps alphanumerics of the
    /// title (whitespace and punctuation collapse to `_`), upper-cased and cut
    /// to 20 characters, and the suffix is taken from a time-ordered UUID so
    /// ids created back to back stay distinct.
    pub fn generate_id(title: &str) -> String {
        let mut slug = String::new();
        for c in title.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_uppercase());
            } else if !slug.is_empty() && !slug.ends_with('_') {
                slug.push('_');
            }
            if slug.len() >= ID_SLUG_LENGTH {
                break;
            }
        }
        let slug = slug.trim_end_matches('_');
        let slug = if slug.is_empty() { "CASE" } else { slug };

        // First 12 hex digits are the millisecond timestamp, the tail is random
        let uuid = Uuid::now_v7().simple().to_string();
        format!("TC_{}_{}{}", slug, &uuid[..12], &uuid[24..])
    }

    /// Checks every invariant of the test case and its steps.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        validate_steps(&self.steps)
    }

    /// Value of `domain_context.entity_type`, if present.
    pub fn entity_type(&self) -> Option<&str> {
        self.domain_context
            .as_ref()
            .and_then(|ctx| ctx.get("entity_type"))
            .and_then(Value::as_str)
    }

    pub fn has_preconditions(&self) -> bool {
        self.preconditions
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }

    pub fn has_postconditions(&self) -> bool {
        self.postconditions
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }

    pub fn has_test_data(&self) -> bool {
        self.test_data.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// Whether the linked requirements, title or description name
    /// `requirement`. Case-insensitive substring match.
    pub fn mentions(&self, requirement: &str) -> bool {
        let needle = requirement.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.metadata
            .related_requirements
            .iter()
            .any(|r| r.to_lowercase().contains(&needle))
            || self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Checks the step invariants: non-empty, numbered 1..n in order.
pub fn validate_steps(steps: &[TestStep]) -> Result<(), ValidationError> {
    if steps.is_empty() {
        return Err(ValidationError::NoSteps);
    }

    for (index, step) in steps.iter().enumerate() {
        let expected = index as u32 + 1;
        if step.step_number != expected {
            return Err(ValidationError::NonSequentialSteps {
                expected,
                found: step.step_number,
            });
        }
        if step.action.trim().is_empty() {
            return Err(ValidationError::EmptyAction(step.step_number));
        }
        if step.expected_result.trim().is_empty() {
            return Err(ValidationError::EmptyExpectedResult(step.step_number));
        }
    }

    Ok(())
}
