//! Translation contract and the offline glossary implementation
//!
//! The shipped translator resolves phrases against the library's own
//! text/translation pairs in both directions; an unmatched phrase comes
//! back unchanged. Network translation backends plug in behind the same
//! `Translator` trait.

use super::{StoreResult, Translator};
use crate::data::SavedPrompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    English,
    Chinese,
    Japanese,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Chinese => "zh",
            Language::Japanese => "ja",
        }
    }

    /// Resolve a config language code, falling back to Chinese (the
    /// default display language).
    pub fn from_code(code: &str) -> Language {
        match code {
            "en" => Language::English,
            "ja" => Language::Japanese,
            _ => Language::Chinese,
        }
    }
}

pub struct GlossaryTranslator {
    entries: HashMap<String, String>,
}

impl GlossaryTranslator {
    pub fn from_library(prompts: &[SavedPrompt]) -> Self {
        let mut entries = HashMap::new();
        for p in prompts {
            if let Some(translation) = &p.translation {
                entries.insert(p.text.to_lowercase(), translation.clone());
                entries.insert(translation.clone(), p.text.clone());
            }
        }
        Self { entries }
    }
}

#[async_trait]
impl Translator for GlossaryTranslator {
    async fn translate(&self, text: &str, from: Language, to: Language) -> StoreResult<String> {
        if from == to {
            return Ok(text.to_string());
        }
        match self.entries.get(&text.to_lowercase()) {
            Some(hit) => Ok(hit.clone()),
            None => {
                tracing::debug!("No glossary entry for {:?} ({} -> {})", text, from.code(), to.code());
                Ok(text.to_string())
            }
        }
    }
}
