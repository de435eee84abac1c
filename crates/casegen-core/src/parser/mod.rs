//! Turns raw model responses into validated test cases.
//!
//! The pipeline is: [`normalize`] (strip fences, classify) → format parser
//! (JSON/YAML, Markdown or plain-text sections) → [`normalize_record`] per
//! record. When no record survives, [`fallback`] synthesizes one test case,
//! so [`parse`] never returns an empty list.

mod error;
mod fallback;
mod normalize;
pub mod patterns;
mod record;
mod sections;
mod steps;
mod structured;
mod value;

pub use error::{MalformedInput, ParseError};
pub use fallback::{excerpt, fallback, FALLBACK_ACTION, FALLBACK_TITLE};
pub use normalize::{classify, normalize, strip_code_fence, Format};
pub use record::{canonical_key, normalize_record, to_test_case, DEFAULT_TITLE, KNOWN_FIELDS};
pub use sections::{parse_markdown, parse_plain_text};
pub use steps::{parse_steps, StepInput, STRUCTURED_STEP_EXPECTATION};
pub use structured::{parse_json, parse_yaml};
pub use value::{RawRecord, RawValue};

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::TestCase;

/// Result of parsing one model response.
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutcome {
    pub test_cases: Vec<TestCase>,
    /// Format the surviving records were read as.
    pub format: Format,
    /// Skipped records and other recovered problems.
    pub warnings: Vec<String>,
    pub used_fallback: bool,
}

/// Parses a response, never failing and never returning zero test cases.
pub fn parse(raw: &str) -> Vec<TestCase> {
    parse_response(raw).test_cases
}

/// Parses a response and reports how it went.
///
/// When the classified format yields nothing usable, the looser formats are
/// tried in turn (YAML → Markdown → plain text).
pub fn parse_response(raw: &str) -> ParseOutcome {
    let (cleaned, detected) = normalize(raw);
    debug!(format = %detected, length = cleaned.len(), "Classified model response");

    let mut warnings = Vec::new();

    for &format in candidates(detected) {
        let records = match read_records(format, &cleaned) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Format parser failed");
                warnings.push(e.to_string());
                continue;
            }
        };

        let mut test_cases = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match normalize_record(record) {
                Ok(test_case) => test_cases.push(test_case),
                Err(e) => {
                    warn!(record = index + 1, error = %e, "Skipping test case record");
                    warnings.push(format!("Skipped record {}: {}", index + 1, e));
                }
            }
        }

        if !test_cases.is_empty() {
            if format != detected {
                debug!(detected = %detected, used = %format, "Fell back to looser format");
            }
            return ParseOutcome {
                test_cases,
                format,
                warnings,
                used_fallback: false,
            };
        }
    }

    warn!("{}; synthesizing a fallback test case", ParseError::NoParsableContent);
    warnings.push(format!(
        "{}; used a generated fallback test case",
        ParseError::NoParsableContent
    ));

    ParseOutcome {
        test_cases: fallback(raw),
        format: detected,
        warnings,
        used_fallback: true,
    }
}

fn candidates(format: Format) -> &'static [Format] {
    match format {
        Format::Json => &[Format::Json],
        Format::Yaml => &[Format::Yaml, Format::Markdown, Format::PlainText],
        Format::Markdown => &[Format::Markdown, Format::PlainText],
        Format::PlainText => &[Format::PlainText],
    }
}

fn read_records(format: Format, cleaned: &str) -> Result<Vec<RawRecord>, ParseError> {
    match format {
        Format::Json => parse_json(cleaned),
        Format::Yaml => parse_yaml(cleaned),
        Format::Markdown => Ok(parse_markdown(cleaned)),
        Format::PlainText => Ok(parse_plain_text(cleaned)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, TestType};

    #[test]
    fn test_json_scenario() {
        let outcome =
            parse_response(r#"[{"title":"Login works","steps":["Enter user - Dashboard shown"]}]"#);
        assert_eq!(outcome.format, Format::Json);
        assert!(!outcome.used_fallback);
        let tc = &outcome.test_cases[0];
        assert_eq!(tc.title, "Login works");
        assert_eq!(tc.steps.len(), 1);
        assert_eq!(tc.steps[0].action, "Enter user");
        assert_eq!(tc.steps[0].expected_result, "Dashboard shown");
    }

    #[test]
    fn test_fenced_json() {
        let outcome = parse_response("```json\n{\"title\":\"X\"}\n```");
        assert_eq!(outcome.format, Format::Json);
        assert_eq!(outcome.test_cases[0].title, "X");
        assert_eq!(outcome.test_cases[0].steps.len(), 1);
    }

    #[test]
    fn test_markdown_scenario() {
        let outcome =
            parse_response("## Checkout fails\n**Priority**: high\nStep 1 - User adds item - Cart updates");
        assert_eq!(outcome.format, Format::Markdown);
        let tc = &outcome.test_cases[0];
        assert_eq!(tc.title, "Checkout fails");
        assert_eq!(tc.priority, Priority::High);
        assert_eq!(tc.steps[0].action, "User adds item");
        assert_eq!(tc.steps[0].expected_result, "Cart updates");
    }

    #[test]
    fn test_empty_input_falls_back() {
        let outcome = parse_response("");
        assert!(outcome.used_fallback);
        assert_eq!(outcome.test_cases.len(), 1);
        assert_eq!(outcome.test_cases[0].title, FALLBACK_TITLE);
    }

    #[test]
    fn test_bad_record_skipped_with_warning() {
        let raw = r#"[{"title":"Good"},{"foo":"bar"}]"#;
        let outcome = parse_response(raw);
        assert_eq!(outcome.test_cases.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_yaml_payload() {
        let raw = "- title: Search\n  type: negative\n  steps:\n    - Type query -> Results shown\n";
        let outcome = parse_response(raw);
        assert_eq!(outcome.format, Format::Yaml);
        assert_eq!(outcome.test_cases[0].test_type, TestType::Negative);
        assert_eq!(outcome.test_cases[0].steps[0].expected_result, "Results shown");
    }
}
