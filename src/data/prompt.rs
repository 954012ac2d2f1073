//! Prompt entities - the tagged text fragments everything else operates on
//!
//! A `Prompt` is one fragment of the composed generation prompt: text, an
//! optional translation, a weight, and the canvas region it is assigned to.
//! `SavedPrompt` is the library row the prompt store hands back; it becomes
//! a `Prompt` when added to a composition.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A prompt fragment inside a composition session.
///
/// `random_id` is assigned once at creation and is the only key used to
/// address this instance afterwards - two prompts with identical text are
/// still distinct entries.
#[derive(Clone, Debug, PartialEq)]
pub struct Prompt {
    /// Per-instance identity, minted on creation
    pub random_id: String,

    /// Prompt text as sent to the generation backend
    pub text: String,

    /// Display translation, if one is known
    pub translation: Option<String>,

    /// Emphasis weight, 0.0..=10.0
    pub weight: f32,

    /// Flat region-leaf index this prompt is assigned to
    pub region_index: i32,

    /// Library category, if this prompt came from the library
    pub category: Option<String>,

    /// Library row id, if this prompt came from the library; lets saved
    /// templates resolve the prompt again later
    pub library_id: Option<i64>,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            random_id: Uuid::new_v4().to_string(),
            text: text.into(),
            translation: None,
            weight: 0.0,
            region_index: 0,
            category: None,
            library_id: None,
        }
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    pub fn with_region(mut self, region_index: i32) -> Self {
        self.region_index = region_index;
        self
    }

    /// Translation when present, otherwise the raw text
    pub fn translation_text(&self) -> &str {
        self.translation.as_deref().unwrap_or(&self.text)
    }
}

/// A library row from the prompt store.
///
/// `id` is the store's own key (stable across sessions), unlike the
/// per-instance `random_id` a `Prompt` carries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedPrompt {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Template slot this prompt belongs to (e.g. "1quality", "2subject")
    #[serde(default)]
    pub slot: Option<String>,
    /// How often this prompt has been used; drives top-N ordering
    #[serde(default)]
    pub use_count: u32,
}

impl SavedPrompt {
    /// Instantiate a fresh session prompt from this library row.
    pub fn to_prompt(&self) -> Prompt {
        Prompt {
            random_id: Uuid::new_v4().to_string(),
            text: self.text.clone(),
            translation: self.translation.clone(),
            weight: 0.0,
            region_index: 0,
            category: self.category.clone(),
            library_id: Some(self.id),
        }
    }
}

/// A named bundle of prompts from the style store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptStyle {
    pub name: String,
    pub prompts: Vec<SavedPrompt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_unique() {
        let a = Prompt::new("1girl");
        let b = Prompt::new("1girl");
        assert_ne!(a.random_id, b.random_id);
    }

    #[test]
    fn test_translation_text_fallback() {
        let plain = Prompt::new("masterpiece");
        assert_eq!(plain.translation_text(), "masterpiece");

        let translated = Prompt::new("masterpiece").with_translation("杰作");
        assert_eq!(translated.translation_text(), "杰作");
    }

    #[test]
    fn test_saved_prompt_instantiation() {
        let row = SavedPrompt {
            id: 7,
            text: "silver hair".to_string(),
            translation: Some("银发".to_string()),
            category: Some("hair".to_string()),
            slot: Some("3hair".to_string()),
            use_count: 3,
        };

        let p1 = row.to_prompt();
        let p2 = row.to_prompt();
        assert_eq!(p1.text, "silver hair");
        assert_eq!(p1.category.as_deref(), Some("hair"));
        assert_eq!(p1.weight, 0.0);
        // Each instantiation is a distinct session entry
        assert_ne!(p1.random_id, p2.random_id);
    }
}
