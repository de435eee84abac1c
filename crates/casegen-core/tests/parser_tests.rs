use casegen_core::parser::{classify, normalize, FALLBACK_ACTION, FALLBACK_TITLE};
use casegen_core::{
    format_test_cases, parse, parse_response, Format, FormatOptions, OutputFormat, Priority,
    TestCase, TestStep, TestType,
};

fn sample_case() -> TestCase {
    let steps = vec![
        TestStep::new(1, "Open the login page", "Login form is shown").unwrap(),
        TestStep::new(2, "Submit valid credentials", "Dashboard is shown").unwrap(),
        TestStep::new(3, "Click log out", "Login page is shown again").unwrap(),
    ];
    let mut case = TestCase::new(
        "Login with valid credentials",
        "A registered user can log in and out",
        TestType::Functional,
        Priority::High,
        steps,
    )
    .unwrap();
    case.preconditions = Some("User account exists".to_string());
    case.metadata.related_requirements = vec!["REQ-1".to_string()];
    case
}

fn assert_contiguous(cases: &[TestCase]) {
    for case in cases {
        assert!(!case.steps.is_empty(), "{} has no steps", case.title);
        for (i, step) in case.steps.iter().enumerate() {
            assert_eq!(step.step_number as usize, i + 1, "in {}", case.title);
        }
    }
}

#[test]
fn test_never_empty() {
    let inputs = [
        "",
        "   \n\t  ",
        "\u{0}\u{1}\u{2}\u{fffd}\u{7f}\u{1b}[31m",
        "{not json",
        "[]",
        "null",
        "I cannot help with that.",
        "```\n```",
        "## \n## \n",
    ];
    for input in inputs {
        let cases = parse(input);
        assert!(!cases.is_empty(), "no test case for {:?}", input);
        assert_contiguous(&cases);
    }
}

#[test]
fn test_fallback_case_shape() {
    let outcome = parse_response("I cannot help with that.");
    assert!(outcome.used_fallback);
    assert_eq!(outcome.test_cases.len(), 1);

    let case = &outcome.test_cases[0];
    assert_eq!(case.title, FALLBACK_TITLE);
    assert_eq!(case.steps[0].action, FALLBACK_ACTION);
    assert!(case.description.starts_with("I cannot help"));
    assert!(!outcome.warnings.is_empty());
}

#[test]
fn test_steps_contiguous_across_formats() {
    let json = r#"[
        {"title": "A", "steps": [
            {"step_number": 1, "action": "Open", "expected_result": "Opened"},
            {"step_number": 2, "action": "Close", "expected_result": "Closed"}
        ]},
        {"title": "B", "steps": "1. Type name - Name shown\n2. Save - Saved\n5. Reload - Name kept"}
    ]"#;
    let markdown = "## Search\n**Steps**:\n- Type query - Results listed\n- Clear query - List empties\n\n## Sort\n3. Click header - Rows sorted";
    let plain = "Test Case 1: Upload\nStep 1: Pick a file\nStep 2: Press upload\nExpected: File listed\n\nTest Case 2: Delete\n1. Select file\n2. Press delete";

    for raw in [json, markdown, plain] {
        let cases = parse(raw);
        assert!(!cases.is_empty());
        assert_contiguous(&cases);
    }
}

#[test]
fn test_free_text_steps_are_renumbered() {
    let cases = parse(r#"{"title": "B", "steps": "3. Type name - Name shown\n7. Save - Saved"}"#);
    assert_eq!(cases[0].steps.len(), 2);
    assert_eq!(cases[0].steps[1].step_number, 2);
    assert_eq!(cases[0].steps[1].action, "Save");
}

#[test]
fn test_aliased_fields() {
    let raw = r#"{"test_cases": [{
        "name": "Reset password",
        "summary": "Reset link is sent",
        "type": "Edge Case",
        "priority": "1",
        "prerequisites": "User is logged out",
        "test_steps": ["Request reset -> Email sent"],
        "labels": ["auth", "email"],
        "requirements": ["REQ-7"]
    }]}"#;
    let outcome = parse_response(raw);
    assert_eq!(outcome.format, Format::Json);

    let case = &outcome.test_cases[0];
    assert_eq!(case.title, "Reset password");
    assert_eq!(case.description, "Reset link is sent");
    assert_eq!(case.test_type, TestType::EdgeCase);
    assert_eq!(case.priority, Priority::Critical);
    assert_eq!(case.preconditions.as_deref(), Some("User is logged out"));
    assert_eq!(case.steps[0].expected_result, "Email sent");
    assert!(case.tags.contains("auth"));
    assert_eq!(case.metadata.related_requirements, vec!["REQ-7".to_string()]);
}

#[test]
fn test_json_round_trip() {
    let original = sample_case();
    let json = format_test_cases(
        std::slice::from_ref(&original),
        OutputFormat::Json,
        FormatOptions::default(),
    )
    .unwrap();

    let outcome = parse_response(&json);
    assert_eq!(outcome.format, Format::Json);
    assert!(!outcome.used_fallback);

    let parsed = &outcome.test_cases[0];
    assert_eq!(parsed.id, original.id);
    assert_eq!(parsed.title, original.title);
    assert_eq!(parsed.test_type, original.test_type);
    assert_eq!(parsed.priority, original.priority);
    assert_eq!(parsed.steps.len(), original.steps.len());
    assert_eq!(parsed.metadata.created_at, original.metadata.created_at);
    assert_eq!(parsed.metadata.related_requirements, original.metadata.related_requirements);
}

#[test]
fn test_yaml_round_trip() {
    let original = sample_case();
    let yaml = format_test_cases(
        std::slice::from_ref(&original),
        OutputFormat::Yaml,
        FormatOptions::default(),
    )
    .unwrap();

    let outcome = parse_response(&yaml);
    assert_eq!(outcome.format, Format::Yaml);
    let parsed = &outcome.test_cases[0];
    assert_eq!(parsed.id, original.id);
    assert_eq!(parsed.title, original.title);
    assert_eq!(parsed.steps.len(), 3);
}

#[test]
fn test_classification_is_deterministic() {
    let inputs = [
        "[{\"title\": \"A\"}]",
        "- title: A\n  priority: low\n",
        "## A\n1. Do - Done",
        "Test Case 1: A",
        "",
    ];
    for raw in inputs {
        let (cleaned, first) = normalize(raw);
        assert_eq!(classify(&cleaned), first);
        assert_eq!(classify(&cleaned), classify(&cleaned));
    }
}

#[test]
fn test_prose_around_fence_is_ignored() {
    let raw = "Sure! Here are the tests:\n\n```json\n[{\"title\": \"Fenced\", \"steps\": [\"Go - Gone\"]}]\n```\n\nLet me know if you need more.";
    let outcome = parse_response(raw);
    assert_eq!(outcome.format, Format::Json);
    assert_eq!(outcome.test_cases.len(), 1);
    assert_eq!(outcome.test_cases[0].title, "Fenced");
}

#[test]
fn test_step_without_action_names_the_cause() {
    let raw = r#"[
        {"title": "Login", "steps": [
            {"expected": "Page loads"},
            {"action": "Enter user", "expected": "Dashboard shown"}
        ]},
        {"title": "Logout", "steps": ["", {"action": "Submit"}]}
    ]"#;
    let outcome = parse_response(raw);

    assert_eq!(outcome.test_cases.len(), 1);
    assert_eq!(outcome.test_cases[0].title, "Logout");
    assert_eq!(outcome.test_cases[0].steps[0].step_number, 1);
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.starts_with("Skipped record 1") && w.contains("Step 1 has an empty action")));
    assert!(!outcome.warnings.iter().any(|w| w.contains("without gaps")));
}
