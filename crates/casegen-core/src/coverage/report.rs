use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Priority, TestType};

/// How a test set covers a supplied requirement list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementCoverage {
    pub total_requirements: usize,
    pub covered_requirements: usize,
    pub uncovered_requirements: Vec<String>,
    pub coverage_percentage: f64,
    /// Requirement → ids of the tests that mention it.
    pub requirement_test_map: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    pub avg_steps_per_test: f64,
    pub tests_with_preconditions: usize,
    pub tests_with_postconditions: usize,
    pub tests_with_test_data: usize,
    pub complexity_score: f64,
    pub unique_entities: BTreeSet<String>,
}

/// Result of analyzing one test set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub total_tests: usize,
    pub test_type_distribution: BTreeMap<TestType, usize>,
    pub priority_distribution: BTreeMap<Priority, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_coverage: Option<RequirementCoverage>,
    pub edge_case_coverage_percentage: f64,
    pub gaps: Vec<String>,
    pub coverage_score: f64,
    pub recommendations: Vec<String>,
    pub metrics: CoverageMetrics,
}

impl CoverageReport {
    /// One-line summary used in generation responses and CLI output.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} tests, score {:.1}, {} types, {:.1}% edge cases",
            self.total_tests,
            self.coverage_score,
            self.test_type_distribution.len(),
            self.edge_case_coverage_percentage
        );
        if let Some(req) = &self.requirement_coverage {
            summary.push_str(&format!(
                ", {}/{} requirements covered",
                req.covered_requirements, req.total_requirements
            ));
        }
        summary
    }
}

/// Difference between two analyzed test sets (current minus previous).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageDelta {
    pub test_count_delta: i64,
    pub coverage_score_delta: f64,
    pub edge_case_delta: f64,
    pub new_test_types: Vec<TestType>,
    pub removed_test_types: Vec<TestType>,
    pub priority_deltas: BTreeMap<Priority, i64>,
    pub improvements: Vec<String>,
    pub regressions: Vec<String>,
}

impl CoverageDelta {
    pub fn is_improvement(&self) -> bool {
        !self.improvements.is_empty() && self.regressions.is_empty()
    }
}
