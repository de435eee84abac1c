use crate::config::FALLBACK_DESCRIPTION_LENGTH;
use crate::model::{Priority, TestCase, TestCaseMetadata, TestStep, TestType, DEFAULT_TEST_EXPECTATION};

pub const FALLBACK_TITLE: &str = "Generated Test Case";
pub const FALLBACK_ACTION: &str = "Execute test as described";

/// Builds the single test case returned when nothing else could be parsed.
pub fn fallback(raw: &str) -> Vec<TestCase> {
    let mut description = excerpt(raw, FALLBACK_DESCRIPTION_LENGTH);
    if description.is_empty() {
        description = FALLBACK_TITLE.to_string();
    }

    let step = TestStep {
        step_number: 1,
        action: FALLBACK_ACTION.to_string(),
        expected_result: DEFAULT_TEST_EXPECTATION.to_string(),
        test_data: None,
        validation: None,
        notes: None,
    };

    vec![TestCase {
        id: TestCase::generate_id(FALLBACK_TITLE),
        title: FALLBACK_TITLE.to_string(),
        description,
        test_type: TestType::Functional,
        priority: Priority::Medium,
        steps: vec![step],
        preconditions: None,
        postconditions: None,
        test_data: None,
        tags: Default::default(),
        domain_context: None,
        metadata: TestCaseMetadata::default(),
    }]
}

/// First `limit` characters of the trimmed text, with `...` appended when cut.
pub fn excerpt(text: &str, limit: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_for_empty_input() {
        let cases = fallback("");
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].title, FALLBACK_TITLE);
        assert_eq!(cases[0].description, FALLBACK_TITLE);
        assert_eq!(cases[0].steps[0].action, FALLBACK_ACTION);
        assert!(cases[0].validate().is_ok());
    }

    #[test]
    fn test_fallback_truncates_description() {
        let raw = "é".repeat(250);
        let cases = fallback(&raw);
        let description = &cases[0].description;
        assert!(description.ends_with("..."));
        assert_eq!(description.chars().count(), FALLBACK_DESCRIPTION_LENGTH + 3);
    }

    #[test]
    fn test_excerpt_trims_before_cutting() {
        assert_eq!(excerpt("  abc def  ", 4), "abc...");
        assert_eq!(excerpt("  abc  ", 10), "abc");
        assert_eq!(excerpt(" \n ", 10), "");
    }

    #[test]
    fn test_short_input_kept_whole() {
        assert_eq!(fallback("short note")[0].description, "short note");
    }
}
