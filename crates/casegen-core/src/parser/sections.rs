//! Markdown and plain-text responses, split into sections and accumulated
//! into records for the record normalizer.

use regex::Regex;
use std::collections::BTreeMap;

use super::patterns;
use super::record::{canonical_key, is_known_field};
use super::steps::{has_step_marker, strip_step_marker};
use super::value::{RawRecord, RawValue};

/// Splits on `## ` headings and `Test Case` lines; text before the first
/// boundary is dropped. Without any boundary the whole text is one section.
pub fn parse_markdown(text: &str) -> Vec<RawRecord> {
    let boundary = patterns::markdown_boundary();
    let is_boundary = |line: &str| boundary.is_some_and(|re: &Regex| re.is_match(line));

    let lines: Vec<&str> = text.lines().collect();
    if !lines.iter().any(|l| is_boundary(l)) {
        return section_record(None, &lines).into_iter().collect();
    }

    let mut records = Vec::new();
    let mut current: Option<(&str, Vec<&str>)> = None;

    for line in lines {
        if is_boundary(line) {
            if let Some((heading, body)) = current.take() {
                records.extend(section_record(Some(heading), &body));
            }
            current = Some((line, Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((heading, body)) = current {
        records.extend(section_record(Some(heading), &body));
    }

    records
}

/// Splits on `Test Case N:` / `TC N:` markers; text before the first marker
/// is dropped. Without any marker the whole text is one section.
pub fn parse_plain_text(text: &str) -> Vec<RawRecord> {
    let starts: Vec<usize> = patterns::plain_marker()
        .map(|re| re.find_iter(text).map(|m| m.start()).collect())
        .unwrap_or_default();

    if starts.is_empty() {
        let lines: Vec<&str> = text.lines().collect();
        return section_record(None, &lines).into_iter().collect();
    }

    let mut records = Vec::new();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let mut lines = text[start..end].lines();
        if let Some(heading) = lines.next() {
            let body: Vec<&str> = lines.collect();
            records.extend(section_record(Some(heading), &body));
        }
    }

    records
}

/// Field lines collected for one section.
#[derive(Default)]
struct SectionFields {
    fields: BTreeMap<String, Vec<String>>,
    /// Field whose header had no inline value; following lines belong to it.
    open: Option<String>,
    explicit: bool,
}

impl SectionFields {
    fn push(&mut self, key: &str, line: &str) {
        self.fields
            .entry(key.to_string())
            .or_default()
            .push(line.trim().to_string());
    }

    fn header(&mut self, key: &str, value: &str) {
        let key = canonical_key(key);
        self.explicit = true;
        if value.trim().is_empty() {
            self.fields.entry(key.clone()).or_default();
            self.open = Some(key);
        } else {
            self.push(&key, value);
            self.open = None;
        }
    }

    fn line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        if let Some((key, value)) = captures(patterns::bold_field(), line) {
            self.header(&key, &value);
            return;
        }
        if let Some((key, _)) = captures(patterns::subheading_field(), line) {
            self.header(&key, "");
            return;
        }
        if let Some((key, value)) = captures(patterns::plain_field(), line) {
            let continues_steps = self.open.as_deref() == Some("steps")
                && canonical_key(&key) == "expected_results";
            if is_known_field(&key) && !continues_steps {
                self.header(&key, &value);
                return;
            }
        }

        match self.open.clone() {
            Some(key) => self.push(&key, line),
            None if has_step_marker(line) => self.push("steps", line),
            None => self.push("description", line),
        }
    }

    fn into_record(self, title: Option<String>) -> Option<RawRecord> {
        let has_steps = self.fields.get("steps").is_some_and(|s| !s.is_empty());
        if title.is_none() && !self.explicit && !has_steps {
            return None;
        }

        let mut record = RawRecord::new();
        if let Some(title) = title {
            record.insert("title".to_string(), RawValue::String(title));
        }

        for (key, lines) in self.fields {
            let lines: Vec<String> = if matches!(key.as_str(), "tags" | "related_requirements") {
                lines.iter().map(|l| strip_step_marker(l)).collect()
            } else {
                lines
            };
            let value = match lines.len() {
                0 => continue,
                1 => RawValue::String(lines.concat()),
                _ => RawValue::List(lines.into_iter().map(RawValue::String).collect()),
            };
            // an explicit title field replaces the heading
            record.insert(key, value);
        }

        Some(record)
    }
}

fn section_record(heading: Option<&str>, body: &[&str]) -> Option<RawRecord> {
    let title = heading.and_then(heading_title);
    let mut fields = SectionFields::default();
    for line in body {
        fields.line(line);
    }
    fields.into_record(title)
}

/// Title text of a heading line, minus `#`, bold markers and any
/// `Test Case N:` prefix.
fn heading_title(heading: &str) -> Option<String> {
    let stripped = match patterns::title_prefix() {
        Some(re) => re.replace(heading, "").into_owned(),
        None => heading.to_string(),
    };
    let title = stripped.trim().trim_matches('*').trim().trim_end_matches(':').trim();
    (!title.is_empty()).then(|| title.to_string())
}

fn captures(re: Option<&Regex>, line: &str) -> Option<(String, String)> {
    let caps = re?.captures(line)?;
    let key = caps.get(1)?.as_str().trim().trim_end_matches(':').trim();
    let value = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
    Some((key.to_string(), value.to_string()))
}
