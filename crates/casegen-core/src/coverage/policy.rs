use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Priority, TestType};

/// Target a test set is measured against when looking for gaps.
///
/// Every field is optional in serialized form; an empty policy yields no gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoveragePolicy {
    pub required_types: Vec<TestType>,
    pub min_tests: usize,
    /// Expected share (percent) of each priority.
    pub priority_distribution: BTreeMap<Priority, f64>,
    pub min_edge_case_percentage: f64,
}

impl CoveragePolicy {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Policy derived from a generation request: the requested types, the
    /// requested count, and some edge-case share when edge cases were asked for.
    pub fn for_request(types: &[TestType], count: usize, edge_cases: bool) -> Self {
        let mut required_types = types.to_vec();
        if edge_cases && !required_types.contains(&TestType::EdgeCase) {
            required_types.push(TestType::EdgeCase);
        }

        Self {
            required_types,
            min_tests: count,
            priority_distribution: BTreeMap::new(),
            min_edge_case_percentage: if edge_cases { 10.0 } else { 0.0 },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.required_types.is_empty()
            && self.min_tests == 0
            && self.priority_distribution.is_empty()
            && self.min_edge_case_percentage <= 0.0
    }
}
