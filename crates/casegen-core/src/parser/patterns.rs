//! Regex patterns used to pick apart model responses.
//!
//! Patterns are compiled on first use. A pattern that fails to compile
//! degrades to "no match" instead of aborting the parse.

use regex::Regex;
use std::sync::OnceLock;

/// Fenced block tagged `json`.
pub const JSON_FENCE: &str = r"(?is)```[ \t]*json[ \t]*\r?\n(.*?)```";

/// Fenced block tagged `yaml` or `yml`.
pub const YAML_FENCE: &str = r"(?is)```[ \t]*ya?ml[ \t]*\r?\n(.*?)```";

/// Fenced block without a language tag.
pub const PLAIN_FENCE: &str = r"(?s)```[ \t]*\r?\n(.*?)```";

/// Line that opens a Markdown test case section.
pub const MARKDOWN_BOUNDARY: &str = r"(?i)^\s*(?:##\s+|(?:\*\*)?test[ \t]*case\b)";

/// `Test Case 3:` / `TC-3:` style marker in plain text.
pub const PLAIN_MARKER: &str = r"(?i)\b(?:test[ \t]*case|tc)(?:[ \t#_-]*\d+)?\b[ \t]*:";

/// Heading decoration stripped from a section's first line to get its title.
pub const TITLE_PREFIX: &str =
    r"(?i)^[#*\s]*(?:(?:test[ \t]*case|tc)(?:[ \t#_-]*\d+)?\b[ \t]*[:.\-]?)?[\s*]*";

/// `**Field**: value`, `**Field:** value` or a bare `**Field**`.
pub const BOLD_FIELD: &str = r"^\s*[-*]?\s*\*\*([^*]+?):?\*\*\s*:?\s*(.*)$";

/// `### Field` subheading.
pub const SUBHEADING_FIELD: &str = r"^\s*#{3,}\s*(.+?)\s*:?\s*$";

/// `Field: value` on a single line.
pub const PLAIN_FIELD: &str = r"^\s*[-*]?\s*([A-Za-z][A-Za-z _-]{0,40}?)\s*:\s*(.*)$";

/// Leading ordinal, `Step N` or bullet marker on a step line.
pub const STEP_MARKER: &str = r"(?i)^\s*(?:step\s*\d+\s*[.):\-]?|\d+\s*[.)]|[-*+•])\s*";

fn compile(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        pub fn $name() -> Option<&'static Regex> {
            static CELL: OnceLock<Option<Regex>> = OnceLock::new();
            compile(&CELL, $pattern)
        }
    };
}

cached_regex!(json_fence, JSON_FENCE);
cached_regex!(yaml_fence, YAML_FENCE);
cached_regex!(plain_fence, PLAIN_FENCE);
cached_regex!(markdown_boundary, MARKDOWN_BOUNDARY);
cached_regex!(plain_marker, PLAIN_MARKER);
cached_regex!(title_prefix, TITLE_PREFIX);
cached_regex!(bold_field, BOLD_FIELD);
cached_regex!(subheading_field, SUBHEADING_FIELD);
cached_regex!(plain_field, PLAIN_FIELD);
cached_regex!(step_marker, STEP_MARKER);
