//! Template history, persisted as a JSON log in the data directory
//!
//! Every roll of a changed template appends one entry. Entries keep enough
//! of each item to resolve it again later (library id, or category+slot);
//! the whole file is rewritten on save, newest entry first.

use super::{HistoryStore, StoreResult};
use crate::data::{HistoryItem, TemplateHistory, TemplateItem};
use async_trait::async_trait;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct TemplateHistoryFile {
    path: PathBuf,
    entries: Mutex<Vec<TemplateHistory>>,
}

impl TemplateHistoryFile {
    /// Open the history file, starting empty if it does not exist yet.
    pub fn open(path: PathBuf) -> StoreResult<Self> {
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Vec::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn write(&self, entries: &[TemplateHistory]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for TemplateHistoryFile {
    async fn save_template(&self, items: &[TemplateItem]) -> StoreResult<()> {
        let entry = TemplateHistory {
            saved_at: Utc::now(),
            items: items.iter().map(HistoryItem::from_item).collect(),
        };
        let mut entries = self.entries.lock().expect("history lock poisoned");
        entries.insert(0, entry);
        self.write(&entries)?;
        tracing::debug!("Saved template to history ({} entries)", entries.len());
        Ok(())
    }

    async fn all_templates(&self) -> StoreResult<Vec<TemplateHistory>> {
        Ok(self.entries.lock().expect("history lock poisoned").clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Prompt;

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let store = TemplateHistoryFile::open(path.clone()).unwrap();
        let mut prompt = Prompt::new("smile");
        prompt.library_id = Some(4);
        store
            .save_template(&[
                TemplateItem::from_prompt(prompt),
                TemplateItem::from_category("length", "3hair"),
            ])
            .await
            .unwrap();
        store
            .save_template(&[TemplateItem::from_category("mouth", "4expression")])
            .await
            .unwrap();

        // Newest first, in memory and after reopening
        let templates = store.all_templates().await.unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].items.len(), 1);
        assert_eq!(templates[1].items.len(), 2);
        assert_eq!(templates[1].items[0].prompt_id, Some(4));

        let reopened = TemplateHistoryFile::open(path).unwrap();
        let templates = reopened.all_templates().await.unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].items[0].category.as_deref(), Some("mouth"));
    }

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateHistoryFile::open(dir.path().join("none.json")).unwrap();
        assert!(store.all_templates().await.unwrap().is_empty());
    }
}
