//! Template data - slots, rolled picks, and their saved-history form
//!
//! A template is an ordered list of items; each item pins an explicit
//! prompt, names a category to draw from at roll time, or carries bare text
//! (history display only). Rolling a template produces one `RolledPrompt`
//! per resolvable item.

use crate::data::prompt::Prompt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a template slot holds. Exactly one of the three, by construction.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateItemKind {
    /// An explicit prompt, used verbatim on every roll
    Prompt(Prompt),
    /// A category within a template slot, drawn at random on every roll
    Category { category: String, slot: String },
    /// Bare text, shown in history entries that no longer resolve
    Text(String),
}

/// One slot of a template.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateItem {
    /// Stable identity; rolled prompts point back at it
    pub id: String,
    pub kind: TemplateItemKind,
    /// Pins the item's previously rolled prompt against re-rolls
    pub locked: bool,
}

impl TemplateItem {
    fn new(kind: TemplateItemKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            locked: false,
        }
    }

    pub fn from_prompt(prompt: Prompt) -> Self {
        Self::new(TemplateItemKind::Prompt(prompt))
    }

    pub fn from_category(category: impl Into<String>, slot: impl Into<String>) -> Self {
        Self::new(TemplateItemKind::Category {
            category: category.into(),
            slot: slot.into(),
        })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(TemplateItemKind::Text(text.into()))
    }

    /// Label shown for this slot: prompt translation, then category name,
    /// then bare text.
    pub fn display_text(&self) -> &str {
        match &self.kind {
            TemplateItemKind::Prompt(p) => p.translation_text(),
            TemplateItemKind::Category { category, .. } => category,
            TemplateItemKind::Text(text) => text,
        }
    }

    /// Category items are the only ones a roll re-randomizes, so the only
    /// ones worth locking.
    pub fn is_category(&self) -> bool {
        matches!(self.kind, TemplateItemKind::Category { .. })
    }
}

/// A prompt produced by rolling a template.
///
/// Lives until the next roll replaces it, unless locked. `item_id` is a
/// non-owning reference into the template list; the two lists are filtered
/// independently and may disagree between edits and the next roll.
#[derive(Clone, Debug, PartialEq)]
pub struct RolledPrompt {
    pub prompt: Prompt,
    /// Id of the template item that produced this pick
    pub item_id: String,
    /// Mirrors the producing item's `locked` flag
    pub locked: bool,
    /// True when drawn from a category; explicit picks cannot be locked
    pub random_pick: bool,
}

/// Template state as the surrounding screen holds it: the slot list and the
/// latest roll result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemplateParam {
    pub template: Vec<TemplateItem>,
    pub rolled: Vec<RolledPrompt>,
}

/// One saved template in history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateHistory {
    pub saved_at: DateTime<Utc>,
    pub items: Vec<HistoryItem>,
}

/// Persisted form of a template item.
///
/// Explicit prompts are stored by library id (when they have one) so a
/// later apply can resolve them through the prompt store; category items
/// store the category+slot pair. `text` is display-only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistoryItem {
    #[serde(default)]
    pub prompt_id: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub slot: Option<String>,
}

impl HistoryItem {
    pub fn from_item(item: &TemplateItem) -> Self {
        match &item.kind {
            TemplateItemKind::Prompt(p) => Self {
                prompt_id: p.library_id,
                text: Some(p.text.clone()),
                ..Default::default()
            },
            TemplateItemKind::Category { category, slot } => Self {
                category: Some(category.clone()),
                slot: Some(slot.clone()),
                ..Default::default()
            },
            TemplateItemKind::Text(text) => Self {
                text: Some(text.clone()),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text_priority() {
        let prompt = Prompt::new("red eyes").with_translation("红眼");
        assert_eq!(TemplateItem::from_prompt(prompt).display_text(), "红眼");
        assert_eq!(
            TemplateItem::from_category("expression", "2face").display_text(),
            "expression"
        );
        assert_eq!(TemplateItem::from_text("old entry").display_text(), "old entry");
    }

    #[test]
    fn test_item_ids_are_unique() {
        let a = TemplateItem::from_category("hair", "3hair");
        let b = TemplateItem::from_category("hair", "3hair");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_history_item_conversion() {
        let mut prompt = Prompt::new("silver hair");
        prompt.library_id = Some(42);
        let entry = HistoryItem::from_item(&TemplateItem::from_prompt(prompt));
        assert_eq!(entry.prompt_id, Some(42));
        assert_eq!(entry.text.as_deref(), Some("silver hair"));
        assert!(entry.category.is_none());

        let entry =
            HistoryItem::from_item(&TemplateItem::from_category("pose", "4pose"));
        assert_eq!(entry.category.as_deref(), Some("pose"));
        assert_eq!(entry.slot.as_deref(), Some("4pose"));
        assert!(entry.prompt_id.is_none());
    }
}
