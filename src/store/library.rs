//! Prompt and style library, loaded from a JSON file into memory
//!
//! The library file holds every saved prompt (with slot/category tags and
//! use counts) plus the named styles. Queries run against the in-memory
//! copy; the file is only read once at startup.

use super::{PromptLookup, StoreResult, StyleLookup};
use crate::data::{PromptStyle, SavedPrompt};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// On-disk shape of the library file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LibraryFile {
    #[serde(default)]
    prompts: Vec<SavedPrompt>,
    #[serde(default)]
    styles: Vec<PromptStyle>,
}

pub struct PromptLibrary {
    prompts: Vec<SavedPrompt>,
    styles: Vec<PromptStyle>,
}

impl PromptLibrary {
    pub fn load(path: &Path) -> StoreResult<Self> {
        let contents = fs::read_to_string(path)?;
        let file: LibraryFile = serde_json::from_str(&contents)?;
        tracing::info!(
            "Loaded prompt library: {} prompts, {} styles",
            file.prompts.len(),
            file.styles.len()
        );
        Ok(Self {
            prompts: file.prompts,
            styles: file.styles,
        })
    }

    /// Build a library directly from rows; used by tests and tools.
    pub fn from_parts(prompts: Vec<SavedPrompt>, styles: Vec<PromptStyle>) -> Self {
        Self { prompts, styles }
    }

    pub fn prompts(&self) -> &[SavedPrompt] {
        &self.prompts
    }

    fn sorted_by_use_count(&self, mut rows: Vec<SavedPrompt>) -> Vec<SavedPrompt> {
        rows.sort_by(|a, b| b.use_count.cmp(&a.use_count));
        rows
    }
}

#[async_trait]
impl PromptLookup for PromptLibrary {
    async fn search_by_text(&self, text: &str) -> StoreResult<Vec<SavedPrompt>> {
        let needle = text.to_lowercase();
        let hits = self
            .prompts
            .iter()
            .filter(|p| {
                p.text.to_lowercase().contains(&needle)
                    || p.translation
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        Ok(self.sorted_by_use_count(hits))
    }

    async fn top_n(&self, n: usize) -> StoreResult<Vec<SavedPrompt>> {
        let mut rows = self.sorted_by_use_count(self.prompts.clone());
        rows.truncate(n);
        Ok(rows)
    }

    async fn by_slot(&self, slot: &str) -> StoreResult<Vec<SavedPrompt>> {
        Ok(self
            .prompts
            .iter()
            .filter(|p| p.slot.as_deref() == Some(slot))
            .cloned()
            .collect())
    }

    async fn by_category_and_slot(
        &self,
        slot: &str,
        category: &str,
    ) -> StoreResult<Vec<SavedPrompt>> {
        Ok(self
            .prompts
            .iter()
            .filter(|p| {
                p.slot.as_deref() == Some(slot) && p.category.as_deref() == Some(category)
            })
            .cloned()
            .collect())
    }

    async fn all_slots(&self) -> StoreResult<Vec<String>> {
        let mut slots: Vec<String> = Vec::new();
        for p in &self.prompts {
            if let Some(slot) = &p.slot {
                if !slots.contains(slot) {
                    slots.push(slot.clone());
                }
            }
        }
        Ok(slots)
    }

    async fn by_id(&self, id: i64) -> StoreResult<Option<SavedPrompt>> {
        Ok(self.prompts.iter().find(|p| p.id == id).cloned())
    }
}

#[async_trait]
impl StyleLookup for PromptLibrary {
    async fn search_by_name(&self, name: &str) -> StoreResult<Vec<PromptStyle>> {
        let needle = name.to_lowercase();
        Ok(self
            .styles
            .iter()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}
