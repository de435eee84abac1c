//! Domain context gathered before prompting the model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::coverage::CoveragePolicy;
use crate::knowledge::{KnowledgeError, KnowledgeStore};
use crate::model::TestCase;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Knowledge lookup failed: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("Context source unavailable: {0}")]
    Unavailable(String),
}

/// Everything known about a requirement's domain ahead of generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextBundle {
    pub domain_facts: Vec<String>,
    pub similar_cases: Vec<TestCase>,
    pub edge_case_suggestions: Vec<String>,
    /// Coverage target hinted by the domain, used for gap detection.
    pub coverage_policy: Option<CoveragePolicy>,
}

impl ContextBundle {
    pub fn is_empty(&self) -> bool {
        self.domain_facts.is_empty()
            && self.similar_cases.is_empty()
            && self.edge_case_suggestions.is_empty()
            && self.coverage_policy.is_none()
    }

    /// Renders the bundle as a Markdown section for the prompt.
    pub fn to_prompt_section(&self) -> String {
        let mut out = String::new();

        if !self.domain_facts.is_empty() {
            out.push_str("## Domain Context\n\n");
            for fact in &self.domain_facts {
                let _ = writeln!(out, "- {}", fact);
            }
            out.push('\n');
        }

        if !self.similar_cases.is_empty() {
            out.push_str("## Similar Existing Test Cases\n\n");
            for case in &self.similar_cases {
                let _ = writeln!(
                    out,
                    "- {} ({}, {}, {} steps)",
                    case.title,
                    case.test_type,
                    case.priority,
                    case.steps.len()
                );
            }
            out.push('\n');
        }

        if !self.edge_case_suggestions.is_empty() {
            out.push_str("## Edge Cases To Consider\n\n");
            for suggestion in &self.edge_case_suggestions {
                let _ = writeln!(out, "- {}", suggestion);
            }
            out.push('\n');
        }

        out
    }
}

/// Source of domain context. Errors are treated as "no context" by callers.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn gather(
        &self,
        entity_type: &str,
        workflow: Option<&str>,
        requirement: &str,
    ) -> Result<ContextBundle, ContextError>;
}

/// Provider that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

#[async_trait]
impl ContextProvider for NoContext {
    async fn gather(
        &self,
        _entity_type: &str,
        _workflow: Option<&str>,
        _requirement: &str,
    ) -> Result<ContextBundle, ContextError> {
        Ok(ContextBundle::default())
    }
}

/// Fills the bundle with similar cases learned earlier.
pub struct KnowledgeContextProvider {
    store: Arc<dyn KnowledgeStore>,
    limit: usize,
}

impl KnowledgeContextProvider {
    pub fn new(store: Arc<dyn KnowledgeStore>, limit: usize) -> Self {
        Self { store, limit }
    }
}

#[async_trait]
impl ContextProvider for KnowledgeContextProvider {
    async fn gather(
        &self,
        entity_type: &str,
        workflow: Option<&str>,
        requirement: &str,
    ) -> Result<ContextBundle, ContextError> {
        let mut matches = self
            .store
            .find_similar(requirement, Some(entity_type), self.limit)
            .await?;
        if matches.is_empty() {
            matches = self.store.find_similar(requirement, None, self.limit).await?;
        }
        debug!(entity_type, similar = matches.len(), "Gathered knowledge context");

        for m in &matches {
            if let Err(e) = self.store.update_usage(&m.entry.id).await {
                warn!(id = %m.entry.id, error = %e, "Failed to record knowledge usage");
            }
        }

        let mut domain_facts = vec![format!("Entity type: {}", entity_type)];
        if let Some(workflow) = workflow {
            domain_facts.push(format!("Workflow: {}", workflow));
        }

        let edge_case_suggestions = matches
            .iter()
            .filter(|m| m.entry.test_case.test_type.is_edge())
            .map(|m| format!("Previously covered: {}", m.entry.test_case.title))
            .collect();

        Ok(ContextBundle {
            domain_facts,
            similar_cases: matches.into_iter().map(|m| m.entry.test_case).collect(),
            edge_case_suggestions,
            coverage_policy: None,
        })
    }
}
