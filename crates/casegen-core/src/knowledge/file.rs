use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::KnowledgeConfig;
use crate::model::TestCase;

use super::error::KnowledgeError;
use super::{similarity, KnowledgeEntry, KnowledgeMatch, KnowledgeStore};

/// File-based knowledge store.
///
/// Each learned case is one pretty-printed JSON file named after its entry
/// id, so identical cases map to the same file.
pub struct FileKnowledgeStore {
    entries_dir: PathBuf,
}

impl FileKnowledgeStore {
    /// Creates a store keeping its entries under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            entries_dir: dir.into(),
        }
    }

    pub fn from_config(config: &KnowledgeConfig) -> Self {
        Self::new(config.entries_path())
    }

    pub fn entries_dir(&self) -> &Path {
        &self.entries_dir
    }

    fn entry_file(&self, id: &str) -> PathBuf {
        self.entries_dir.join(format!("{}.json", id))
    }

    async fn ensure_entries_dir(&self) -> Result<(), KnowledgeError> {
        fs::create_dir_all(&self.entries_dir)
            .await
            .map_err(|e| KnowledgeError::io(&self.entries_dir, e))
    }

    async fn load(&self, id: &str) -> Result<KnowledgeEntry, KnowledgeError> {
        let path = self.entry_file(id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(KnowledgeError::EntryNotFound(id.to_string()));
        }

        let json = fs::read_to_string(&path)
            .await
            .map_err(|e| KnowledgeError::io(&path, e))?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn save(&self, entry: &KnowledgeEntry) -> Result<(), KnowledgeError> {
        self.ensure_entries_dir().await?;

        let path = self.entry_file(&entry.id);
        let json = serde_json::to_string_pretty(entry)?;
        fs::write(&path, json)
            .await
            .map_err(|e| KnowledgeError::io(&path, e))
    }

    /// Loads every readable entry, skipping files that fail to parse.
    pub async fn entries(&self) -> Result<Vec<KnowledgeEntry>, KnowledgeError> {
        if !fs::try_exists(&self.entries_dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut dir = fs::read_dir(&self.entries_dir)
            .await
            .map_err(|e| KnowledgeError::io(&self.entries_dir, e))?;

        let mut entries = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| KnowledgeError::io(&self.entries_dir, e))?
        {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let parsed = match fs::read_to_string(&path).await {
                Ok(json) => serde_json::from_str::<KnowledgeEntry>(&json).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match parsed {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable knowledge entry"),
            }
        }

        Ok(entries)
    }
}

#[async_trait]
impl KnowledgeStore for FileKnowledgeStore {
    async fn find_similar(
        &self,
        query: &str,
        entity_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<KnowledgeMatch>, KnowledgeError> {
        let mut matches: Vec<KnowledgeMatch> = self
            .entries()
            .await?
            .into_iter()
            .filter(|entry| match entity_type {
                Some(wanted) => entry
                    .entity_type
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(wanted)),
                None => true,
            })
            .filter_map(|entry| {
                let text = format!("{} {}", entry.test_case.title, entry.test_case.description);
                let score = similarity(query, &text);
                (score > 0.0).then_some(KnowledgeMatch { entry, score })
            })
            .collect();

        // Best score first; ties go to the more used entry, then the id
        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.entry.usage_count.cmp(&a.entry.usage_count))
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        matches.truncate(limit);

        debug!(query, found = matches.len(), "Knowledge lookup");
        Ok(matches)
    }

    async fn store(
        &self,
        test_case: &TestCase,
        feedback: Option<&str>,
    ) -> Result<String, KnowledgeError> {
        let fresh = KnowledgeEntry::new(test_case.clone(), feedback);

        let entry = match self.load(&fresh.id).await {
            Ok(mut existing) => {
                if let Some(feedback) = feedback {
                    existing.feedback.push(feedback.to_string());
                }
                existing
            }
            Err(KnowledgeError::EntryNotFound(_)) => fresh,
            Err(e) => return Err(e),
        };

        self.save(&entry).await?;
        Ok(entry.id)
    }

    async fn update_usage(&self, id: &str) -> Result<(), KnowledgeError> {
        let mut entry = self.load(id).await?;
        entry.usage_count += 1;
        entry.last_used_at = Some(Utc::now());
        self.save(&entry).await
    }
}
