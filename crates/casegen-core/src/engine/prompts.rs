use crate::context::ContextBundle;
use crate::model::{TestCase, TestType};

use super::request::GenerationRequest;

/// System prompt for every generation call.
pub const SYSTEM_PROMPT: &str = r#"You are a senior QA engineer writing manual test cases for a software system.

Write precise, independently executable test cases. Every test case must have at least one step, and every step must have an action and an expected result.

IMPORTANT: Output the test cases as valid JSON matching this exact structure:
[
  {
    "title": "Short, specific title",
    "description": "What the test verifies",
    "test_type": "functional | integration | unit | performance | security | usability | edge_case | negative | regression | smoke | acceptance",
    "priority": "critical | high | medium | low",
    "preconditions": "State required before the first step",
    "postconditions": "State expected after the last step",
    "steps": [
      {
        "step_number": 1,
        "action": "What the tester does",
        "expected_result": "What the tester observes",
        "test_data": {"field": "value"}
      }
    ],
    "tags": ["tag"],
    "related_requirements": ["REQ-1"]
  }
]

Only output the JSON, no additional text."#;

/// Builds the user prompt for a new generation.
pub fn build_generation_prompt(request: &GenerationRequest, context: &ContextBundle) -> String {
    let mut focus = Vec::new();
    if !request.test_types.is_empty() {
        let types: Vec<&str> = request.test_types.iter().map(TestType::as_str).collect();
        focus.push(format!("Cover these test types: {}.", types.join(", ")));
    }
    if request.include_edge_cases {
        focus.push("Include edge cases (boundary values, empty and oversized input).".to_string());
    }
    if request.include_negative_tests {
        focus.push("Include negative tests (invalid input, unauthorized access, failures).".to_string());
    }
    for suggestion in &context.edge_case_suggestions {
        focus.push(suggestion.clone());
    }

    let workflow = request
        .workflow
        .as_deref()
        .map(|w| format!("\nWorkflow: {w}"))
        .unwrap_or_default();

    format!(
        r#"## Requirement

{requirement}

Entity type: {entity_type}{workflow}

{context}## Instructions

Write exactly {count} test cases for this requirement.
{detail}
{focus}"#,
        requirement = request.requirement.trim(),
        entity_type = request.entity_type,
        context = context.to_prompt_section(),
        count = request.count,
        detail = request.detail_level.instructions(),
        focus = focus.join("\n"),
    )
}

/// Builds the user prompt for refining existing cases with feedback.
pub fn build_refinement_prompt(test_cases: &[TestCase], feedback: &str) -> String {
    format!(
        r#"## Existing Test Cases

{cases}

## Feedback

{feedback}

Rewrite the test cases to address the feedback. Keep cases that need no change, keep their titles stable, and return the complete revised list."#,
        cases = cases_as_json(test_cases),
        feedback = feedback.trim(),
    )
}

/// Builds the user prompt for covering what an existing set misses.
pub fn build_gap_prompt(
    uncovered_requirements: &[String],
    gaps: &[String],
    existing: &[TestCase],
) -> String {
    let bullets = |items: &[String]| {
        items
            .iter()
            .map(|i| format!("- {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let titles: Vec<String> = existing.iter().map(|t| t.title.clone()).collect();

    let mut prompt = String::new();
    if !uncovered_requirements.is_empty() {
        prompt.push_str(&format!(
            "## Uncovered Requirements\n\n{}\n\n",
            bullets(uncovered_requirements)
        ));
    }
    if !gaps.is_empty() {
        prompt.push_str(&format!("## Coverage Gaps\n\n{}\n\n", bullets(gaps)));
    }
    if !titles.is_empty() {
        prompt.push_str(&format!("## Existing Test Cases\n\n{}\n\n", bullets(&titles)));
    }
    prompt.push_str(
        "Write new test cases that close these gaps. Do not repeat existing test cases. Reference each covered requirement in related_requirements.",
    );
    prompt
}

fn cases_as_json(test_cases: &[TestCase]) -> String {
    serde_json::to_string_pretty(test_cases).unwrap_or_else(|_| {
        test_cases
            .iter()
            .map(|t| format!("- {}", t.title))
            .collect::<Vec<_>>()
            .join("\n")
    })
}
