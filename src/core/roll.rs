//! Template roll engine
//!
//! Owns the template (ordered slots) and the latest roll result, resolves
//! category slots to concrete prompts by uniform random draw, and keeps
//! locked picks stable across re-rolls. A template that changed since the
//! last persist is saved to history as a side effect of rolling.

use crate::data::{
    Prompt, RolledPrompt, SavedPrompt, TemplateHistory, TemplateItem, TemplateItemKind,
    TemplateParam,
};
use crate::store::{HistoryStore, PromptLookup, StoreError};
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RollError {
    #[error("prompt store failed: {0}")]
    Store(#[from] StoreError),
}

/// Where the roll tab currently is. Transitions mirror the screen: rolling
/// always lands back in `Generated`, the two edit modes are entered and
/// left explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateMode {
    /// Nothing rolled yet
    Idle,
    /// A roll result is on screen
    Generated,
    /// Toggling per-item locks; no new rolls
    LockEdit,
    /// Removing items from the result
    Edit,
}

pub struct RollSession {
    prompts: Arc<dyn PromptLookup>,
    history: Arc<dyn HistoryStore>,

    pub param: TemplateParam,
    mode: TemplateMode,

    /// Template changed since it was last written to history
    dirty: bool,

    // Slot browsing state for building templates
    pub slots: Vec<String>,
    pub selected_slot: Option<String>,
    pub categories: Vec<String>,
    pub selected_category: Option<String>,
    slot_prompts: Vec<SavedPrompt>,
}

/// Slots sort by their leading numeric prefix; slots without one go last.
fn slot_sort_key(slot: &str) -> u32 {
    let digits: String = slot.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(9999)
}

impl RollSession {
    pub fn new(prompts: Arc<dyn PromptLookup>, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            prompts,
            history,
            param: TemplateParam::default(),
            mode: TemplateMode::Idle,
            dirty: false,
            slots: Vec::new(),
            selected_slot: None,
            categories: Vec::new(),
            selected_category: None,
            slot_prompts: Vec::new(),
        }
    }

    pub fn mode(&self) -> TemplateMode {
        self.mode
    }

    pub fn begin_lock_edit(&mut self) {
        self.mode = TemplateMode::LockEdit;
    }

    pub fn begin_edit(&mut self) {
        self.mode = TemplateMode::Edit;
    }

    pub fn end_edit(&mut self) {
        self.mode = TemplateMode::Generated;
    }

    pub fn add_prompt_item(&mut self, prompt: Prompt) {
        self.param.template.push(TemplateItem::from_prompt(prompt));
        self.dirty = true;
    }

    pub fn add_category_item(&mut self, category: &str, slot: &str) {
        self.param
            .template
            .push(TemplateItem::from_category(category, slot));
        self.dirty = true;
    }

    /// Drop a template item. Its already-rolled prompt, if any, stays in
    /// the result list until the next roll.
    pub fn remove_item(&mut self, id: &str) {
        self.param.template.retain(|item| item.id != id);
        self.dirty = true;
    }

    /// Drop a rolled prompt from the result. The template item that
    /// produced it is untouched.
    pub fn remove_rolled(&mut self, random_id: &str) {
        self.param.rolled.retain(|g| g.prompt.random_id != random_id);
    }

    /// Roll the template.
    ///
    /// Locked items keep their previous pick untouched; explicit items pass
    /// their prompt through; category items draw uniformly from the store.
    /// An empty category skips its slot with a warning. The result replaces
    /// the previous one only after every slot resolved - a store failure
    /// aborts and leaves the old result in place.
    pub async fn roll(&mut self) -> Result<(), RollError> {
        // Rolling leaves any edit mode behind
        if self.mode != TemplateMode::Idle {
            self.mode = TemplateMode::Generated;
        }

        let mut pickup: Vec<RolledPrompt> = Vec::new();
        for item in &self.param.template {
            let prior = self
                .param
                .rolled
                .iter()
                .find(|g| g.item_id == item.id);
            if item.locked {
                if let Some(prev) = prior {
                    let mut kept = prev.clone();
                    kept.locked = true;
                    pickup.push(kept);
                    continue;
                }
            }
            match &item.kind {
                TemplateItemKind::Prompt(prompt) => {
                    pickup.push(RolledPrompt {
                        prompt: prompt.clone(),
                        item_id: item.id.clone(),
                        locked: false,
                        random_pick: false,
                    });
                }
                TemplateItemKind::Category { category, slot } => {
                    let candidates = self.prompts.by_category_and_slot(slot, category).await?;
                    if candidates.is_empty() {
                        warn!("No prompts for category {:?} in slot {:?}; skipping", category, slot);
                        continue;
                    }
                    let pick = &candidates[rand::thread_rng().gen_range(0..candidates.len())];
                    pickup.push(RolledPrompt {
                        prompt: pick.to_prompt(),
                        item_id: item.id.clone(),
                        locked: false,
                        random_pick: true,
                    });
                }
                // Bare-text items only exist for history display
                TemplateItemKind::Text(_) => {}
            }
        }
        self.param.rolled = pickup;
        self.mode = TemplateMode::Generated;

        if self.dirty {
            self.history.save_template(&self.param.template).await?;
            self.dirty = false;
        }
        Ok(())
    }

    /// Flip the lock on a rolled prompt and its template item together.
    ///
    /// Explicit picks are never lockable (re-rolling them changes nothing).
    /// Returns whether anything was toggled.
    pub fn toggle_lock(&mut self, random_id: &str) -> bool {
        let Some(rolled) = self
            .param
            .rolled
            .iter_mut()
            .find(|g| g.prompt.random_id == random_id)
        else {
            return false;
        };
        if !rolled.random_pick {
            return false;
        }
        rolled.locked = !rolled.locked;
        let locked = rolled.locked;
        let item_id = rolled.item_id.clone();
        if let Some(item) = self.param.template.iter_mut().find(|i| i.id == item_id) {
            item.locked = locked;
            self.dirty = true;
        }
        true
    }

    /// Replace the template wholesale from a history entry.
    ///
    /// Entries resolve through the store by prompt id, or by category+slot
    /// (category wins when both are present); entries resolving to neither
    /// are dropped silently.
    pub async fn apply_history(&mut self, entry: &TemplateHistory) -> Result<(), RollError> {
        let mut items: Vec<TemplateItem> = Vec::new();
        for saved in &entry.items {
            let mut item: Option<TemplateItem> = None;
            if let Some(id) = saved.prompt_id.filter(|&id| id != 0) {
                if let Some(row) = self.prompts.by_id(id).await? {
                    item = Some(TemplateItem::from_prompt(row.to_prompt()));
                }
            }
            if let (Some(category), Some(slot)) = (&saved.category, &saved.slot) {
                item = Some(TemplateItem::from_category(category, slot));
            }
            if let Some(item) = item {
                items.push(item);
            }
        }
        debug!(
            "Applied history template: {} of {} entries resolved",
            items.len(),
            entry.items.len()
        );
        self.param.template = items;
        self.dirty = true;
        Ok(())
    }

    /// Load the slot list, numerically ordered, and select the first one.
    pub async fn load_slots(&mut self) -> Result<(), RollError> {
        let mut slots = self.prompts.all_slots().await?;
        slots.sort_by_key(|s| slot_sort_key(s));
        self.slots = slots;
        if let Some(first) = self.slots.first().cloned() {
            self.select_slot(&first).await?;
        }
        Ok(())
    }

    /// Switch the browser to a slot: loads its prompts, derives the
    /// category list, and selects the first category.
    pub async fn select_slot(&mut self, slot: &str) -> Result<(), RollError> {
        let rows = self.prompts.by_slot(slot).await?;
        let mut categories: Vec<String> = Vec::new();
        for row in &rows {
            if let Some(category) = &row.category {
                if !categories.contains(category) {
                    categories.push(category.clone());
                }
            }
        }
        self.selected_slot = Some(slot.to_string());
        self.selected_category = categories.first().cloned();
        self.categories = categories;
        self.slot_prompts = rows;
        Ok(())
    }

    pub fn select_category(&mut self, category: &str) {
        self.selected_category = Some(category.to_string());
    }

    /// Prompts of the selected slot filtered to the selected category.
    pub fn display_prompts(&self) -> Vec<&SavedPrompt> {
        self.slot_prompts
            .iter()
            .filter(|p| p.category == self.selected_category)
            .collect()
    }
}
