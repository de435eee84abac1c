//! Maps loosely keyed records onto the canonical [`TestCase`] schema.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

use super::error::MalformedInput;
use super::steps::{finalize_steps, parse_step_drafts, strip_step_marker, StepInput};
use super::value::{RawRecord, RawValue};
use crate::model::{Priority, TestCase, TestStep, TestType, DEFAULT_TEST_EXPECTATION};

/// Title used when a record names none.
pub const DEFAULT_TITLE: &str = "Test Case";

/// Canonical field names a record may carry.
pub const KNOWN_FIELDS: &[&str] = &[
    "id",
    "title",
    "description",
    "test_type",
    "priority",
    "steps",
    "preconditions",
    "postconditions",
    "expected_results",
    "tags",
    "test_data",
    "related_requirements",
    "domain_context",
    "metadata",
];

/// Converts `camelCase`, `Title Case` and `kebab-case` keys to `snake_case`.
pub(crate) fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev: Option<char> = None;

    for c in key.trim().chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase()
                && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit())
            {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
        prev = Some(c);
    }

    out.trim_end_matches('_').to_string()
}

/// Resolves a key to its canonical field name.
///
/// Unknown keys come back in snake case so callers can still look them up.
pub fn canonical_key(key: &str) -> String {
    let snake = snake_case(key);
    let canonical = match snake.as_str() {
        "name" | "test_name" | "test_case_name" | "test_title" => "title",
        "summary" | "desc" | "test_description" | "objective" => "description",
        "type" | "testtype" | "category" => "test_type",
        "prereq" | "prereqs" | "prerequisite" | "prerequisites" | "precondition"
        | "pre_condition" | "pre_conditions" => "preconditions",
        "postreq" | "postcondition" | "post_condition" | "post_conditions" => "postconditions",
        "expected" | "expect" | "expected_result" | "expected_outcome" | "expected_outcomes" => {
            "expected_results"
        }
        "test_steps" | "procedure" => "steps",
        "tag" | "labels" | "label" => "tags",
        "data" | "testdata" | "inputs" => "test_data",
        "requirements" | "requirement" | "covers" => "related_requirements",
        "test_id" | "test_case_id" | "case_id" | "tc_id" => "id",
        _ => return snake,
    };
    canonical.to_string()
}

/// Whether a (raw) key names one of the canonical fields.
pub fn is_known_field(key: &str) -> bool {
    KNOWN_FIELDS.contains(&canonical_key(key).as_str())
}

/// Converts a record, logging and discarding it when it cannot be used.
pub fn to_test_case(record: &RawRecord) -> Option<TestCase> {
    match normalize_record(record) {
        Ok(test_case) => Some(test_case),
        Err(e) => {
            warn!(error = %e, "skipping malformed test case record");
            None
        }
    }
}

/// Converts a record into a validated test case.
pub fn normalize_record(record: &RawRecord) -> Result<TestCase, MalformedInput> {
    let fields = canonicalize(record);
    if !fields.keys().any(|k| KNOWN_FIELDS.contains(&k.as_str())) {
        return Err(MalformedInput::Unrecognized);
    }

    let text = |key: &str| fields.get(key).and_then(|v| v.as_text());

    let title = text("title")
        .map(|t| first_line(&t))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let description = text("description").unwrap_or_else(|| title.clone());
    let test_type = text("test_type")
        .map(|t| TestType::parse(&t))
        .unwrap_or_default();
    let priority = text("priority")
        .map(|p| Priority::parse(&p))
        .unwrap_or_default();

    let expectations = fields
        .get("expected_results")
        .map(|v| expectation_list(v))
        .unwrap_or_default();
    let steps = build_steps(fields.get("steps").copied(), &title, &expectations)?;

    let mut test_case = TestCase::new(title, description, test_type, priority, steps)?;

    if let Some(id) = text("id") {
        test_case.id = id;
    }
    test_case.preconditions = text("preconditions");
    test_case.postconditions = text("postconditions");
    test_case.test_data = fields.get("test_data").and_then(|v| v.to_data_map());
    test_case.domain_context = fields
        .get("domain_context")
        .filter(|v| v.as_map().is_some())
        .and_then(|v| v.to_data_map());

    if let Some(tags) = fields.get("tags") {
        test_case.tags = tags.as_string_list().into_iter().collect();
    }

    if let Some(metadata) = fields.get("metadata").and_then(|v| v.as_map()) {
        apply_metadata(&mut test_case, metadata);
    }

    if let Some(requirements) = fields.get("related_requirements") {
        for requirement in requirements.as_string_list() {
            if !test_case.metadata.related_requirements.contains(&requirement) {
                test_case.metadata.related_requirements.push(requirement);
            }
        }
    }

    Ok(test_case)
}

/// Re-keys a record by canonical field name.
///
/// A key already spelled canonically beats an alias of the same field, so
/// `{"name": .., "title": ..}` keeps `title`.
fn canonicalize(record: &RawRecord) -> BTreeMap<String, &RawValue> {
    let mut fields: BTreeMap<String, &RawValue> = BTreeMap::new();
    let mut exact: Vec<String> = Vec::new();

    for (key, value) in record {
        let canonical = canonical_key(key);
        let is_exact = snake_case(key) == canonical;

        if is_exact || !fields.contains_key(&canonical) {
            if !exact.contains(&canonical) {
                fields.insert(canonical.clone(), value);
            }
            if is_exact {
                exact.push(canonical);
            }
        }
    }

    fields
}

fn build_steps(
    value: Option<&RawValue>,
    title: &str,
    expectations: &[String],
) -> Result<Vec<TestStep>, MalformedInput> {
    let drafts = value
        .and_then(StepInput::from_value)
        .map(parse_step_drafts)
        .transpose()?
        .unwrap_or_default();

    if drafts.is_empty() {
        let expected = if expectations.is_empty() {
            DEFAULT_TEST_EXPECTATION.to_string()
        } else {
            expectations.join("; ")
        };
        return Ok(vec![TestStep::new(1, title, expected)?]);
    }

    Ok(finalize_steps(drafts, expectations)?)
}

fn expectation_list(value: &RawValue) -> Vec<String> {
    let lines: Vec<String> = match value {
        RawValue::String(s) => s.lines().map(str::to_string).collect(),
        other => other
            .as_text()
            .map(|t| t.lines().map(str::to_string).collect())
            .unwrap_or_default(),
    };

    lines
        .iter()
        .map(|line| strip_step_marker(line))
        .filter(|line| !line.is_empty())
        .collect()
}

fn apply_metadata(test_case: &mut TestCase, metadata: &RawRecord) {
    for (key, value) in metadata {
        match snake_case(key).as_str() {
            "created_by" => {
                if let Some(v) = value.as_text() {
                    test_case.metadata.created_by = v;
                }
            }
            "version" => {
                if let Some(v) = value.as_text() {
                    test_case.metadata.version = v;
                }
            }
            "automation_status" => {
                if let Some(v) = value.as_text() {
                    test_case.metadata.automation_status = v;
                }
            }
            "created_at" => {
                if let Some(at) = value
                    .as_text()
                    .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
                {
                    test_case.metadata.created_at = at.with_timezone(&Utc);
                }
            }
            "related_requirements" | "requirements" => {
                test_case.metadata.related_requirements = value.as_string_list();
            }
            _ => {}
        }
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(text)
        .trim_matches('*')
        .trim()
        .to_string()
}
