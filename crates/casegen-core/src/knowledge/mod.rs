//! Learned test cases, reused as context for later generations.
//!
//! - [`KnowledgeStore`] - backend interface consumed by the engine and the
//!   context provider
//! - [`FileKnowledgeStore`] - one JSON file per learned case
//!
//! # Layout
//!
//! ```text
//! .casegen/knowledge/
//!   entries/
//!     kn_<fingerprint>.json
//! ```

mod error;
mod file;

pub use error::KnowledgeError;
pub use file::FileKnowledgeStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::model::TestCase;

/// A stored test case with its usage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    /// SHA-256 of the normalized title and steps.
    pub fingerprint: String,
    pub test_case: TestCase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub feedback: Vec<String>,
    #[serde(default)]
    pub usage_count: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl KnowledgeEntry {
    pub fn new(test_case: TestCase, feedback: Option<&str>) -> Self {
        let fingerprint = fingerprint(&test_case);
        Self {
            id: format!("kn_{}", &fingerprint[..16]),
            entity_type: test_case.entity_type().map(str::to_string),
            fingerprint,
            test_case,
            feedback: feedback.map(|f| vec![f.to_string()]).unwrap_or_default(),
            usage_count: 0,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }
}

/// A stored entry scored against a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeMatch {
    pub entry: KnowledgeEntry,
    /// Token overlap in 0.0..=1.0.
    pub score: f64,
}

/// Backend for learned test cases.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Entries most similar to `query`, best first, optionally limited to
    /// one entity type.
    async fn find_similar(
        &self,
        query: &str,
        entity_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<KnowledgeMatch>, KnowledgeError>;

    /// Stores a test case and returns its entry id. Storing the same case
    /// twice returns the existing id.
    async fn store(
        &self,
        test_case: &TestCase,
        feedback: Option<&str>,
    ) -> Result<String, KnowledgeError>;

    /// Records that an entry was used as generation context.
    async fn update_usage(&self, id: &str) -> Result<(), KnowledgeError>;
}

/// Hex SHA-256 of a case's lower-cased title and step texts.
pub fn fingerprint(test_case: &TestCase) -> String {
    let mut hasher = Sha256::new();
    hasher.update(test_case.title.trim().to_lowercase().as_bytes());
    for step in &test_case.steps {
        hasher.update(b"\n");
        hasher.update(step.action.trim().to_lowercase().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(step.expected_result.trim().to_lowercase().as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Jaccard similarity of the word sets of two texts.
pub fn similarity(a: &str, b: &str) -> f64 {
    let left = tokens(a);
    let right = tokens(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(&right).count();
    let union = left.union(&right).count();
    shared as f64 / union as f64
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .collect()
}
