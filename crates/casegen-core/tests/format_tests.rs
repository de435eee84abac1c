use casegen_core::format::FormatError;
use casegen_core::{
    format_test_cases, parse_response, Format, FormatOptions, OutputFormat, Priority, TestCase,
    TestStep, TestType,
};
use serde_json::json;

fn cases() -> Vec<TestCase> {
    let mut login = TestCase::new(
        "Login with valid credentials",
        "A registered user can log in",
        TestType::Functional,
        Priority::High,
        vec![
            TestStep::new(1, "Open the login page", "Login form is shown").unwrap(),
            TestStep::new(2, "Submit valid credentials", "Dashboard is shown").unwrap(),
        ],
    )
    .unwrap();
    login.preconditions = Some("User account exists".to_string());
    login.tags.insert("auth".to_string());
    login.metadata.related_requirements = vec!["REQ-1".to_string()];

    let empty = TestCase::new(
        "Login with empty password",
        "Validation rejects a blank password, \"quietly\"",
        TestType::EdgeCase,
        Priority::Medium,
        vec![TestStep::new(1, "Submit a blank password", "Validation error is shown").unwrap()],
    )
    .unwrap();

    vec![login, empty]
}

#[test]
fn test_markdown_parses_back() {
    let original = cases();
    let markdown =
        format_test_cases(&original, OutputFormat::Markdown, FormatOptions::default()).unwrap();
    assert!(markdown.starts_with("# Test Cases"));
    assert!(markdown.contains("## Login with valid credentials"));
    assert!(markdown.contains("1. Open the login page - Login form is shown"));

    let outcome = parse_response(&markdown);
    assert_eq!(outcome.format, Format::Markdown);
    assert!(!outcome.used_fallback);
    assert_eq!(outcome.test_cases.len(), 2);

    for (parsed, source) in outcome.test_cases.iter().zip(&original) {
        assert_eq!(parsed.id, source.id);
        assert_eq!(parsed.title, source.title);
        assert_eq!(parsed.test_type, source.test_type);
        assert_eq!(parsed.priority, source.priority);
        assert_eq!(parsed.steps.len(), source.steps.len());
        assert_eq!(parsed.steps[0].action, source.steps[0].action);
        assert_eq!(parsed.steps[0].expected_result, source.steps[0].expected_result);
    }
    assert_eq!(
        outcome.test_cases[0].preconditions.as_deref(),
        Some("User account exists")
    );
}

#[test]
fn test_test_data_survives_round_trips() {
    let mut original = cases();
    original[0].test_data = Some(
        [
            ("zip".to_string(), json!("01234")),
            ("attempts".to_string(), json!(3)),
        ]
        .into_iter()
        .collect(),
    );

    for format in [OutputFormat::Markdown, OutputFormat::Json] {
        let text = format_test_cases(&original, format, FormatOptions::default()).unwrap();
        let parsed = parse_response(&text);
        let data = parsed.test_cases[0].test_data.as_ref().unwrap();
        assert_eq!(data["zip"], json!("01234"), "in {:?}", format);
        assert_eq!(data["attempts"], json!(3), "in {:?}", format);
        assert!(!data.contains_key("value"));
    }
}

#[test]
fn test_csv_layout() {
    let csv = format_test_cases(&cases(), OutputFormat::Csv, FormatOptions::default()).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("id,title,description,test_type,priority"));
    assert!(header.ends_with("created_by,version,automation_status,created_at"));

    // multi-step cells are quoted and keep their line breaks
    assert!(csv.contains("\"1. Open the login page -> Login form is shown\n2. Submit valid credentials -> Dashboard is shown\""));
    // embedded quotes are doubled
    assert!(csv.contains("\"Validation rejects a blank password, \"\"quietly\"\"\""));
    assert!(csv.contains(",edge_case,medium,"));
}

#[test]
fn test_metadata_can_be_left_out() {
    let options = FormatOptions {
        include_metadata: false,
    };

    let json = format_test_cases(&cases(), OutputFormat::Json, options).unwrap();
    assert!(!json.contains("\"metadata\""));
    assert!(!json.contains("created_by"));

    let csv = format_test_cases(&cases(), OutputFormat::Csv, options).unwrap();
    assert!(!csv.lines().next().unwrap().contains("created_by"));

    let markdown = format_test_cases(&cases(), OutputFormat::Markdown, options).unwrap();
    assert!(!markdown.contains("**Metadata**"));
}

#[test]
fn test_json_keeps_metadata_by_default() {
    let json = format_test_cases(&cases(), OutputFormat::Json, FormatOptions::default()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 2);
    assert_eq!(value[0]["metadata"]["related_requirements"][0], "REQ-1");
    assert_eq!(value[1]["test_type"], "edge_case");
}

#[test]
fn test_empty_set() {
    let json = format_test_cases(&[], OutputFormat::Json, FormatOptions::default()).unwrap();
    assert_eq!(json, "[]");

    let csv = format_test_cases(&[], OutputFormat::Csv, FormatOptions::default()).unwrap();
    assert_eq!(csv.lines().count(), 1);
}

#[test]
fn test_unknown_format_name() {
    let err = "xml".parse::<OutputFormat>().unwrap_err();
    assert!(matches!(err, FormatError::UnknownFormat(ref name) if name == "xml"));
}
