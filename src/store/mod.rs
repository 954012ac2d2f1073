//! Collaborator stores - the contracts the composition core talks to
//!
//! The core never owns persistence or network internals; it sees the prompt
//! library, the style library, template history, and translation through
//! these async traits. The implementations in this module are file-backed
//! stand-ins loaded into memory at startup; a failed call surfaces as a
//! `StoreError` and is never retried automatically.

pub mod history;
pub mod library;
pub mod translate;

pub use history::TemplateHistoryFile;
pub use library::PromptLibrary;
pub use translate::{GlossaryTranslator, Language};

use crate::data::{PromptStyle, SavedPrompt, TemplateHistory, TemplateItem};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed store data: {0}")]
    Format(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Prompt library queries.
#[async_trait]
pub trait PromptLookup: Send + Sync {
    async fn search_by_text(&self, text: &str) -> StoreResult<Vec<SavedPrompt>>;

    /// Most-used prompts, for the empty-query search fallback.
    async fn top_n(&self, n: usize) -> StoreResult<Vec<SavedPrompt>>;

    async fn by_slot(&self, slot: &str) -> StoreResult<Vec<SavedPrompt>>;

    async fn by_category_and_slot(
        &self,
        slot: &str,
        category: &str,
    ) -> StoreResult<Vec<SavedPrompt>>;

    async fn all_slots(&self) -> StoreResult<Vec<String>>;

    async fn by_id(&self, id: i64) -> StoreResult<Option<SavedPrompt>>;
}

/// Style library queries.
#[async_trait]
pub trait StyleLookup: Send + Sync {
    async fn search_by_name(&self, name: &str) -> StoreResult<Vec<PromptStyle>>;
}

/// Saved-template history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save_template(&self, items: &[TemplateItem]) -> StoreResult<()>;

    /// All saved templates, newest first.
    async fn all_templates(&self) -> StoreResult<Vec<TemplateHistory>>;
}

/// Text translation.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, from: Language, to: Language) -> StoreResult<String>;
}
