//! Response cleanup and format classification.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::patterns;

/// Payload format detected in a cleaned model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Yaml,
    Markdown,
    PlainText,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Markdown => "markdown",
            Format::PlainText => "plain text",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strips model chatter and classifies what is left.
///
/// Never fails: anything unrecognized is `PlainText`.
pub fn normalize(raw: &str) -> (String, Format) {
    let cleaned = strip_code_fence(raw);
    let format = classify(&cleaned);
    (cleaned, format)
}

/// Extracts the body of the first fenced code block, if any.
///
/// A `json` fence wins over a `yaml`/`yml` fence, which wins over an
/// untagged fence. Without a fence the trimmed input is returned.
pub fn strip_code_fence(raw: &str) -> String {
    let fences = [
        patterns::json_fence(),
        patterns::yaml_fence(),
        patterns::plain_fence(),
    ];

    for re in fences.into_iter().flatten() {
        if let Some(body) = re.captures(raw).and_then(|caps| caps.get(1)) {
            return body.as_str().trim().to_string();
        }
    }

    raw.trim().to_string()
}

/// Classifies cleaned text. Deterministic for a given input.
pub fn classify(cleaned: &str) -> Format {
    if looks_like_json(cleaned) {
        return Format::Json;
    }
    if looks_like_yaml(cleaned) {
        return Format::Yaml;
    }
    if cleaned.contains("##") || cleaned.contains("**Test Case") {
        return Format::Markdown;
    }
    Format::PlainText
}

fn looks_like_json(text: &str) -> bool {
    (text.starts_with('[') || text.starts_with('{'))
        && serde_json::from_str::<serde_json::Value>(text).is_ok()
}

fn looks_like_yaml(text: &str) -> bool {
    if !text.contains(':') || !(text.contains("\n-") || text.contains("\n  ")) {
        return false;
    }

    // A bare scalar parses as YAML too; only collections count.
    matches!(
        serde_yaml::from_str::<serde_yaml::Value>(text),
        Ok(serde_yaml::Value::Mapping(_)) | Ok(serde_yaml::Value::Sequence(_))
    )
}
