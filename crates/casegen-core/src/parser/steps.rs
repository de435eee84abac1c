//! Test step extraction from structured entries or free text.

use super::patterns;
use super::record::snake_case;
use super::value::{RawRecord, RawValue};
use crate::model::{validate_steps, DataMap, TestStep, ValidationError, DEFAULT_STEP_EXPECTATION};

/// Expected result for structured entries that name none.
pub const STRUCTURED_STEP_EXPECTATION: &str = "Step completes";

/// Delimiters splitting a free-text step into action and expected result,
/// in priority order.
const STEP_DELIMITERS: [&str; 3] = [" - ", " -> ", " : "];

/// Where steps come from.
#[derive(Debug, Clone, Copy)]
pub enum StepInput<'a> {
    /// A list as written in JSON/YAML; entries may be mappings or strings.
    Entries(&'a [RawValue]),
    /// Free text, one step per line.
    Text(&'a str),
}

impl<'a> StepInput<'a> {
    /// Picks the input kind for a record's `steps` value.
    pub fn from_value(value: &'a RawValue) -> Option<Self> {
        match value {
            RawValue::List(items) => Some(StepInput::Entries(items)),
            RawValue::String(text) | RawValue::Literal(text) => Some(StepInput::Text(text)),
            RawValue::Map(_) => None,
        }
    }
}

/// A step before numbering and defaults are settled.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct StepDraft {
    pub number: Option<u32>,
    pub action: String,
    pub expected: Option<String>,
    pub test_data: Option<DataMap>,
    pub validation: Option<String>,
    pub notes: Option<String>,
    /// Structured entries default to a shorter expectation than free text.
    pub structured: bool,
}

/// Parses steps, applying default expected results.
///
/// Free-text steps are numbered 1..n in order. Structured entries keep their
/// declared `step_number` (or their position when absent) and are rejected if
/// the numbers do not run 1..n.
pub fn parse_steps(input: StepInput<'_>) -> Result<Vec<TestStep>, ValidationError> {
    finalize_steps(parse_step_drafts(input)?, &[])
}

/// Collects step drafts without validating their numbering.
///
/// In a structured list, blank scalars are skipped without taking a position
/// and a mapping with no usable action fails with `EmptyAction`.
pub(crate) fn parse_step_drafts(input: StepInput<'_>) -> Result<Vec<StepDraft>, ValidationError> {
    match input {
        StepInput::Text(text) => Ok(parse_text_lines(text.lines())),
        StepInput::Entries(items) if items.iter().any(|i| i.as_map().is_some()) => {
            let mut drafts: Vec<StepDraft> = Vec::with_capacity(items.len());
            for item in items {
                let position = drafts.len() as u32 + 1;
                match item {
                    RawValue::Map(entry) => drafts.push(parse_entry(entry, position)?),
                    other => {
                        if let Some(mut draft) =
                            other.as_text().and_then(|text| parse_text_line(&text))
                        {
                            draft.number = Some(position);
                            drafts.push(draft);
                        }
                    }
                }
            }
            Ok(drafts)
        }
        StepInput::Entries(items) => {
            let lines: Vec<String> = items.iter().filter_map(RawValue::as_text).collect();
            Ok(parse_text_lines(lines.iter().flat_map(|l| l.lines())))
        }
    }
}

/// Turns drafts into validated steps.
///
/// `expectations` are paired by position with drafts that carry no expected
/// result of their own.
pub(crate) fn finalize_steps(
    drafts: Vec<StepDraft>,
    expectations: &[String],
) -> Result<Vec<TestStep>, ValidationError> {
    let mut steps = Vec::with_capacity(drafts.len());

    for (index, draft) in drafts.into_iter().enumerate() {
        let number = draft.number.unwrap_or(index as u32 + 1);
        let expected = draft
            .expected
            .or_else(|| expectations.get(index).cloned())
            .unwrap_or_else(|| {
                if draft.structured {
                    STRUCTURED_STEP_EXPECTATION.to_string()
                } else {
                    DEFAULT_STEP_EXPECTATION.to_string()
                }
            });

        let mut step = TestStep::new(number, &draft.action, &expected)?;
        step.test_data = draft.test_data;
        step.validation = draft.validation;
        step.notes = draft.notes;
        steps.push(step);
    }

    validate_steps(&steps)?;
    Ok(steps)
}

fn parse_entry(entry: &RawRecord, position: u32) -> Result<StepDraft, ValidationError> {
    let mut draft = StepDraft {
        structured: true,
        ..StepDraft::default()
    };
    let mut step_text = None;
    let mut fallback_action = None;

    for (key, value) in entry {
        match snake_case(key).as_str() {
            "step_number" | "number" | "step_no" | "no" | "order" => {
                draft.number = value.as_text().and_then(|n| n.parse().ok());
            }
            "action" => draft.action = value.as_text().unwrap_or_default(),
            "description" | "instruction" => fallback_action = value.as_text(),
            "step" => step_text = value.as_text(),
            "expected_result" | "expected" | "result" | "expected_outcome" => {
                draft.expected = value.as_text();
            }
            "test_data" | "data" => draft.test_data = value.to_data_map(),
            "validation" => draft.validation = value.as_text(),
            "notes" | "note" => draft.notes = value.as_text(),
            _ => {}
        }
    }

    // `step` is either the number or the action, depending on the model
    if let Some(text) = step_text {
        match text.parse::<u32>() {
            Ok(n) if draft.number.is_none() => draft.number = Some(n),
            Ok(_) => {}
            Err(_) if draft.action.is_empty() => draft.action = text,
            Err(_) => {}
        }
    }

    if draft.action.is_empty() {
        draft.action = fallback_action.ok_or(ValidationError::EmptyAction(position))?;
    }
    if draft.number.is_none() {
        draft.number = Some(position);
    }
    Ok(draft)
}

fn parse_text_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<StepDraft> {
    let mut drafts: Vec<StepDraft> = Vec::new();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // "Expected: ..." continuing the previous step
        if let Some(expected) = expected_continuation(line) {
            if let Some(last) = drafts.last_mut() {
                if last.expected.is_none() {
                    last.expected = Some(expected);
                    continue;
                }
            }
        }

        if let Some(draft) = parse_text_line(line) {
            drafts.push(draft);
        }
    }

    drafts
}

/// Parses one free-text step line, stripping ordinal markers.
pub(crate) fn parse_text_line(line: &str) -> Option<StepDraft> {
    let body = strip_step_marker(line);
    if body.is_empty() {
        return None;
    }

    let (action, expected) = split_action(&body);
    if action.is_empty() {
        return None;
    }

    Some(StepDraft {
        action,
        expected,
        ..StepDraft::default()
    })
}

/// Whether a line starts with a step ordinal, `Step N` or a bullet.
pub(crate) fn has_step_marker(line: &str) -> bool {
    patterns::step_marker().is_some_and(|re| re.is_match(line))
}

pub(crate) fn strip_step_marker(line: &str) -> String {
    match patterns::step_marker() {
        Some(re) => re.replace(line, "").trim().to_string(),
        None => line.trim().to_string(),
    }
}

fn split_action(body: &str) -> (String, Option<String>) {
    for delimiter in STEP_DELIMITERS {
        if let Some((action, expected)) = body.split_once(delimiter) {
            let expected = expected.trim();
            return (
                action.trim().to_string(),
                (!expected.is_empty()).then(|| expected.to_string()),
            );
        }
    }
    (body.trim().to_string(), None)
}

fn expected_continuation(line: &str) -> Option<String> {
    let (label, rest) = line.split_once(':')?;
    let label = label.trim().trim_matches('*').trim().to_lowercase();
    if matches!(
        label.as_str(),
        "expected" | "expected result" | "expected outcome" | "result"
    ) {
        let rest = rest.trim().trim_start_matches('*').trim();
        (!rest.is_empty()).then(|| rest.to_string())
    } else {
        None
    }
}
