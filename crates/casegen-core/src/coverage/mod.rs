//! Coverage analysis of generated test sets.
//!
//! Everything here is pure: reports are computed from the test cases alone,
//! with the heuristic weights taken from [`CoverageSettings`].

mod policy;
mod report;

pub use policy::CoveragePolicy;
pub use report::{CoverageDelta, CoverageMetrics, CoverageReport, RequirementCoverage};

use std::collections::{BTreeMap, BTreeSet};

use crate::config::CoverageSettings;
use crate::model::{Priority, TestCase, TestType};

/// Analyzes with the built-in heuristic settings.
pub fn analyze(
    tests: &[TestCase],
    requirements: Option<&[String]>,
    target: Option<&CoveragePolicy>,
) -> CoverageReport {
    CoverageAnalyzer::default().analyze(tests, requirements, target)
}

/// Compares with the built-in heuristic settings.
pub fn compare(current: &[TestCase], previous: &[TestCase]) -> CoverageDelta {
    CoverageAnalyzer::default().compare(current, previous)
}

#[derive(Debug, Clone, Default)]
pub struct CoverageAnalyzer {
    settings: CoverageSettings,
}

impl CoverageAnalyzer {
    pub fn new(settings: CoverageSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CoverageSettings {
        &self.settings
    }

    pub fn analyze(
        &self,
        tests: &[TestCase],
        requirements: Option<&[String]>,
        target: Option<&CoveragePolicy>,
    ) -> CoverageReport {
        let total_tests = tests.len();
        let test_type_distribution = count_by(tests, |t| t.test_type);
        let priority_distribution = count_by(tests, |t| t.priority);
        let requirement_coverage = requirements.map(|reqs| requirement_coverage(tests, reqs));
        let edge_case_coverage_percentage = edge_case_percentage(tests);

        let gaps = target
            .map(|policy| {
                self.identify_gaps(
                    total_tests,
                    &test_type_distribution,
                    &priority_distribution,
                    edge_case_coverage_percentage,
                    policy,
                )
            })
            .unwrap_or_default();

        let mut report = CoverageReport {
            total_tests,
            test_type_distribution,
            priority_distribution,
            requirement_coverage,
            edge_case_coverage_percentage,
            gaps,
            coverage_score: 0.0,
            recommendations: Vec::new(),
            metrics: metrics(tests),
        };
        report.coverage_score = self.coverage_score(&report);
        report.recommendations = self.recommendations(&report);
        report
    }

    /// Analyzes both sets and reports what changed from `previous` to `current`.
    pub fn compare(&self, current: &[TestCase], previous: &[TestCase]) -> CoverageDelta {
        let now = self.analyze(current, None, None);
        let before = self.analyze(previous, None, None);

        let current_types: BTreeSet<TestType> = now.test_type_distribution.keys().copied().collect();
        let previous_types: BTreeSet<TestType> =
            before.test_type_distribution.keys().copied().collect();

        let priority_deltas = Priority::ALL
            .iter()
            .map(|p| {
                let count = |dist: &BTreeMap<Priority, usize>| {
                    dist.get(p).copied().unwrap_or_default() as i64
                };
                (*p, count(&now.priority_distribution) - count(&before.priority_distribution))
            })
            .collect();

        let coverage_score_delta = now.coverage_score - before.coverage_score;
        let edge_case_delta =
            now.edge_case_coverage_percentage - before.edge_case_coverage_percentage;

        let mut improvements = Vec::new();
        let mut regressions = Vec::new();
        let trend = self.settings.trend_threshold;

        if coverage_score_delta > trend {
            improvements.push(format!(
                "Coverage score improved by {:.1} points",
                coverage_score_delta
            ));
        } else if coverage_score_delta < -trend {
            regressions.push(format!(
                "Coverage score dropped by {:.1} points",
                -coverage_score_delta
            ));
        }

        if edge_case_delta > trend {
            improvements.push(format!(
                "Edge case coverage improved by {:.1} points",
                edge_case_delta
            ));
        } else if edge_case_delta < -trend {
            regressions.push(format!(
                "Edge case coverage dropped by {:.1} points",
                -edge_case_delta
            ));
        }

        CoverageDelta {
            test_count_delta: current.len() as i64 - previous.len() as i64,
            coverage_score_delta,
            edge_case_delta,
            new_test_types: current_types.difference(&previous_types).copied().collect(),
            removed_test_types: previous_types.difference(&current_types).copied().collect(),
            priority_deltas,
            improvements,
            regressions,
        }
    }

    fn identify_gaps(
        &self,
        total: usize,
        types: &BTreeMap<TestType, usize>,
        priorities: &BTreeMap<Priority, usize>,
        edge_case_percentage: f64,
        policy: &CoveragePolicy,
    ) -> Vec<String> {
        let mut gaps = Vec::new();

        for required in &policy.required_types {
            if !types.contains_key(required) {
                gaps.push(format!("Missing required test type: {}", required));
            }
        }

        if total < policy.min_tests {
            gaps.push(format!(
                "Only {} test cases, policy requires at least {}",
                total, policy.min_tests
            ));
        }

        for (priority, expected) in &policy.priority_distribution {
            let actual = share(priorities.get(priority).copied().unwrap_or_default(), total);
            if (actual - expected).abs() > self.settings.priority_tolerance {
                gaps.push(format!(
                    "{} priority share is {:.1}%, expected about {:.1}%",
                    capitalize(priority.as_str()),
                    actual,
                    expected
                ));
            }
        }

        if edge_case_percentage < policy.min_edge_case_percentage {
            gaps.push(format!(
                "Edge case coverage is {:.1}%, policy requires at least {:.1}%",
                edge_case_percentage, policy.min_edge_case_percentage
            ));
        }

        gaps
    }

    /// Mean of the computable sub-scores, each clamped to 0..=100.
    fn coverage_score(&self, report: &CoverageReport) -> f64 {
        let total = report.total_tests;
        if total == 0 {
            return 0.0;
        }

        let s = &self.settings;
        let (high, medium, low) = priority_shares(&report.priority_distribution, total);
        let balance = 100.0
            - ((high - s.ideal_high_share).abs()
                + (medium - s.ideal_medium_share).abs()
                + (low - s.ideal_low_share).abs());

        let mut scores = vec![
            (total as f64 * 10.0).min(100.0),
            (report.test_type_distribution.len() as f64 * 20.0).min(100.0),
            balance.max(0.0),
        ];
        if let Some(req) = &report.requirement_coverage {
            scores.push(req.coverage_percentage);
        }
        scores.push(report.edge_case_coverage_percentage * s.edge_case_multiplier);

        let sum: f64 = scores.iter().map(|v| v.clamp(0.0, 100.0)).sum();
        sum / scores.len() as f64
    }

    fn recommendations(&self, report: &CoverageReport) -> Vec<String> {
        let s = &self.settings;
        let total = report.total_tests;
        let types = &report.test_type_distribution;
        let mut recs = Vec::new();

        if total < s.min_recommended_tests {
            recs.push(format!(
                "Add more test cases: {} generated, at least {} recommended",
                total, s.min_recommended_tests
            ));
        }
        if types.len() < s.min_distinct_types {
            recs.push(format!(
                "Add more test types: only {} distinct type(s) present",
                types.len()
            ));
        }
        if !types.contains_key(&TestType::EdgeCase) {
            recs.push("Add edge case tests for boundary values and unusual inputs".to_string());
        }
        if !types.contains_key(&TestType::Negative) {
            recs.push("Add negative tests for invalid input and error handling".to_string());
        }

        if total > 0 {
            let (high, _, _) = priority_shares(&report.priority_distribution, total);
            if high > s.max_high_priority_share {
                recs.push(format!(
                    "Too many high priority tests ({:.1}%); reserve high priority for critical paths",
                    high
                ));
            } else if high < s.min_high_priority_share {
                recs.push(format!(
                    "Add more high priority tests ({:.1}%) for critical functionality",
                    high
                ));
            }
        }

        if let Some(req) = &report.requirement_coverage {
            if req.coverage_percentage < s.requirement_coverage_threshold {
                recs.push(format!(
                    "Cover the remaining {} uncovered requirement(s)",
                    req.uncovered_requirements.len()
                ));
            }
        }

        if report.edge_case_coverage_percentage < s.edge_case_threshold {
            recs.push(format!(
                "Increase edge case coverage: {:.1}% is below {:.1}%",
                report.edge_case_coverage_percentage, s.edge_case_threshold
            ));
        }

        recs.extend(report.gaps.iter().map(|gap| format!("Gap: {}", gap)));
        recs
    }
}

fn count_by<K: Ord>(tests: &[TestCase], key: impl Fn(&TestCase) -> K) -> BTreeMap<K, usize> {
    let mut counts = BTreeMap::new();
    for test in tests {
        *counts.entry(key(test)).or_insert(0) += 1;
    }
    counts
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// (high, medium, low) shares; critical counts as high.
fn priority_shares(distribution: &BTreeMap<Priority, usize>, total: usize) -> (f64, f64, f64) {
    let count = |p: Priority| distribution.get(&p).copied().unwrap_or_default();
    (
        share(count(Priority::Critical) + count(Priority::High), total),
        share(count(Priority::Medium), total),
        share(count(Priority::Low), total),
    )
}

fn edge_case_percentage(tests: &[TestCase]) -> f64 {
    let edge = tests.iter().filter(|t| t.test_type.is_edge()).count();
    share(edge, tests.len())
}

fn requirement_coverage(tests: &[TestCase], requirements: &[String]) -> RequirementCoverage {
    let mut requirement_test_map = BTreeMap::new();
    let mut uncovered_requirements = Vec::new();

    for requirement in requirements {
        let ids: Vec<String> = tests
            .iter()
            .filter(|t| t.mentions(requirement))
            .map(|t| t.id.clone())
            .collect();

        if ids.is_empty() {
            uncovered_requirements.push(requirement.clone());
        }
        requirement_test_map.insert(requirement.clone(), ids);
    }

    let total_requirements = requirements.len();
    let covered_requirements = total_requirements - uncovered_requirements.len();

    RequirementCoverage {
        total_requirements,
        covered_requirements,
        uncovered_requirements,
        coverage_percentage: share(covered_requirements, total_requirements),
        requirement_test_map,
    }
}

fn metrics(tests: &[TestCase]) -> CoverageMetrics {
    let total = tests.len();
    if total == 0 {
        return CoverageMetrics::default();
    }

    let steps: usize = tests.iter().map(|t| t.steps.len()).sum();
    let avg_steps_per_test = steps as f64 / total as f64;
    let tests_with_preconditions = tests.iter().filter(|t| t.has_preconditions()).count();
    let tests_with_postconditions = tests.iter().filter(|t| t.has_postconditions()).count();
    let tests_with_test_data = tests.iter().filter(|t| t.has_test_data()).count();

    let complexity_score = (avg_steps_per_test * 10.0
        + tests_with_preconditions as f64 / total as f64 * 30.0
        + tests_with_test_data as f64 / total as f64 * 20.0)
        .min(100.0);

    CoverageMetrics {
        avg_steps_per_test,
        tests_with_preconditions,
        tests_with_postconditions,
        tests_with_test_data,
        complexity_score,
        unique_entities: tests
            .iter()
            .filter_map(|t| t.entity_type().map(str::to_string))
            .collect(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
