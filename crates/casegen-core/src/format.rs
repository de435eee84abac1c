//! Renders test cases for output. Pure; no I/O.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;
use std::str::FromStr;
use thiserror::Error;

use crate::model::TestCase;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown output format: {0} (expected json, yaml, markdown or csv)")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Markdown,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(FormatError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Whether provenance metadata is written out.
    pub include_metadata: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
        }
    }
}

/// Renders test cases in the requested format.
///
/// JSON and YAML output parse back through the response parser unchanged;
/// Markdown output parses back through the Markdown section parser.
pub fn format_test_cases(
    test_cases: &[TestCase],
    format: OutputFormat,
    options: FormatOptions,
) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&to_values(test_cases, options)?)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&to_values(test_cases, options)?)?),
        OutputFormat::Markdown => Ok(to_markdown(test_cases, options)),
        OutputFormat::Csv => Ok(to_csv(test_cases, options)),
    }
}

fn to_values(test_cases: &[TestCase], options: FormatOptions) -> Result<Vec<Value>, FormatError> {
    test_cases
        .iter()
        .map(|case| {
            let mut value = serde_json::to_value(case)?;
            if !options.include_metadata {
                if let Value::Object(map) = &mut value {
                    map.remove("metadata");
                }
            }
            Ok(value)
        })
        .collect()
}

fn to_markdown(test_cases: &[TestCase], options: FormatOptions) -> String {
    let mut md = String::from("# Test Cases\n");

    for case in test_cases {
        let _ = writeln!(md, "\n## {}\n", single_line(&case.title));
        let _ = writeln!(md, "**ID**: {}", case.id);
        let _ = writeln!(md, "**Type**: {}", case.test_type);
        let _ = writeln!(md, "**Priority**: {}", case.priority);
        let _ = writeln!(md, "**Description**: {}", single_line(&case.description));

        if let Some(pre) = &case.preconditions {
            let _ = writeln!(md, "**Preconditions**: {}", single_line(pre));
        }
        if let Some(post) = &case.postconditions {
            let _ = writeln!(md, "**Postconditions**: {}", single_line(post));
        }
        if !case.tags.is_empty() {
            let tags: Vec<&str> = case.tags.iter().map(String::as_str).collect();
            let _ = writeln!(md, "**Tags**: {}", tags.join(", "));
        }
        if !case.metadata.related_requirements.is_empty() {
            let _ = writeln!(
                md,
                "**Requirements**: {}",
                case.metadata.related_requirements.join(", ")
            );
        }
        if let Some(data) = &case.test_data {
            if let Ok(json) = serde_json::to_string(data) {
                let _ = writeln!(md, "**Test Data**: {}", json);
            }
        }
        if options.include_metadata {
            let _ = writeln!(
                md,
                "**Metadata**: version {}, created by {} at {}, {}",
                case.metadata.version,
                case.metadata.created_by,
                case.metadata.created_at.to_rfc3339(),
                case.metadata.automation_status
            );
        }

        md.push_str("\n### Steps\n\n");
        for step in &case.steps {
            let _ = writeln!(
                md,
                "{}. {} - {}",
                step.step_number,
                single_line(&step.action),
                single_line(&step.expected_result)
            );
        }
    }

    md
}

const CSV_HEADER: [&str; 10] = [
    "id",
    "title",
    "description",
    "test_type",
    "priority",
    "preconditions",
    "postconditions",
    "steps",
    "tags",
    "related_requirements",
];

const CSV_METADATA_HEADER: [&str; 4] = ["created_by", "version", "automation_status", "created_at"];

fn to_csv(test_cases: &[TestCase], options: FormatOptions) -> String {
    let mut header: Vec<&str> = CSV_HEADER.to_vec();
    if options.include_metadata {
        header.extend(CSV_METADATA_HEADER);
    }

    let mut csv = header.join(",");
    csv.push('\n');

    for case in test_cases {
        let steps: Vec<String> = case
            .steps
            .iter()
            .map(|s| format!("{}. {} -> {}", s.step_number, s.action, s.expected_result))
            .collect();

        let mut row = vec![
            case.id.clone(),
            case.title.clone(),
            case.description.clone(),
            case.test_type.to_string(),
            case.priority.to_string(),
            case.preconditions.clone().unwrap_or_default(),
            case.postconditions.clone().unwrap_or_default(),
            steps.join("\n"),
            case.tags.iter().cloned().collect::<Vec<_>>().join(";"),
            case.metadata.related_requirements.join(";"),
        ];
        if options.include_metadata {
            row.extend([
                case.metadata.created_by.clone(),
                case.metadata.version.clone(),
                case.metadata.automation_status.clone(),
                case.metadata.created_at.to_rfc3339(),
            ]);
        }

        let fields: Vec<String> = row.iter().map(|f| escape_csv_field(f, ',')).collect();
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }

    csv
}

fn escape_csv_field(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
