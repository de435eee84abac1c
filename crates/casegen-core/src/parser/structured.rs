//! JSON and YAML payloads.

use super::error::ParseError;
use super::record::snake_case;
use super::value::{RawRecord, RawValue};
use super::Format;

/// Wrapper keys models put around the actual list.
const WRAPPER_KEYS: [&str; 3] = ["test_cases", "tests", "testcases"];

pub fn parse_json(text: &str) -> Result<Vec<RawRecord>, ParseError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ParseError::MalformedStructured(Format::Json, e.to_string()))?;
    Ok(records(RawValue::from_json(value)))
}

pub fn parse_yaml(text: &str) -> Result<Vec<RawRecord>, ParseError> {
    let value: serde_yaml::Value = serde_yaml::from_str(text)
        .map_err(|e| ParseError::MalformedStructured(Format::Yaml, e.to_string()))?;
    Ok(records(RawValue::from_yaml(value)))
}

/// A single mapping is a one-element list; `{"test_cases": [...]}` unwraps.
fn records(value: Option<RawValue>) -> Vec<RawRecord> {
    match value {
        Some(RawValue::Map(map)) => match unwrap_list(&map) {
            Some(items) => collect_maps(items),
            None => vec![map],
        },
        Some(RawValue::List(items)) => collect_maps(items),
        _ => Vec::new(),
    }
}

fn unwrap_list(map: &RawRecord) -> Option<Vec<RawValue>> {
    map.iter().find_map(|(key, value)| match value {
        RawValue::List(items) if WRAPPER_KEYS.contains(&snake_case(key).as_str()) => {
            Some(items.clone())
        }
        _ => None,
    })
}

fn collect_maps(items: Vec<RawValue>) -> Vec<RawRecord> {
    items
        .into_iter()
        .filter_map(|item| match item {
            RawValue::Map(map) => Some(map),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_array() {
        let records = parse_json(r#"[{"title":"A"},{"title":"B"},"noise"]"#).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_json_single_object() {
        let records = parse_json(r#"{"title":"A"}"#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_json_wrapper_key() {
        let records = parse_json(r#"{"testCases":[{"title":"A"},{"title":"B"}]}"#).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_json("{\"title\": ").unwrap_err();
        assert!(matches!(err, ParseError::MalformedStructured(Format::Json, _)));
    }

    #[test]
    fn test_yaml_list() {
        let text = "- title: A\n  priority: high\n- title: B\n";
        assert_eq!(parse_yaml(text).unwrap().len(), 2);
    }

    #[test]
    fn test_yaml_wrapper() {
        let text = "tests:\n  - title: A\n";
        assert_eq!(parse_yaml(text).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(parse_yaml("a: [unclosed\nb: -").is_err());
    }
}
