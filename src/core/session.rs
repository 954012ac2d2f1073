//! Compose session - the single owner of one prompt-editing screen
//!
//! Holds the selected prompt list, the current selection, and the regional
//! prompting state. Every mutation is keyed by a prompt's `random_id` or a
//! region node's id; region edits go through the tree model and re-derive
//! the divider text and region count afterwards.

use crate::data::{Prompt, Region, RegionError, RegionPromptParam, RolledPrompt};
use tracing::debug;

/// How a roll result is sent into the prompt list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendMode {
    /// Drop the target region's existing prompts first
    Replace,
    /// Keep them and prepend the new ones
    Add,
}

pub struct ComposeSession {
    pub prompts: Vec<Prompt>,

    /// `random_id` of the prompt open in the editor pane
    pub current: Option<String>,

    /// Multi-select ids while select mode is active
    pub selected_ids: Vec<String>,

    pub region: RegionPromptParam,
    region_tree: Region,
}

impl ComposeSession {
    pub fn new(prompts: Vec<Prompt>, region: RegionPromptParam) -> Self {
        let mut region_tree = Region::parse(&region.divider_text);
        region_tree.reindex(region.use_common);
        let mut session = Self {
            prompts,
            current: None,
            selected_ids: Vec::new(),
            region,
            region_tree,
        };
        session.region.region_count = session.region_tree.leaf_count();
        // Open the first prompt in the editor, as the screen does
        session.current = session.prompts.first().map(|p| p.random_id.clone());
        session
    }

    pub fn region_tree(&self) -> &Region {
        &self.region_tree
    }

    fn prompt_mut(&mut self, random_id: &str) -> Option<&mut Prompt> {
        self.prompts.iter_mut().find(|p| p.random_id == random_id)
    }

    pub fn current_prompt(&self) -> Option<&Prompt> {
        let id = self.current.as_deref()?;
        self.prompts.iter().find(|p| p.random_id == id)
    }

    // ----- selection -----

    pub fn select(&mut self, random_id: &str) {
        if self.prompts.iter().any(|p| p.random_id == random_id) {
            self.current = Some(random_id.to_string());
        }
    }

    pub fn toggle_multi_select(&mut self, random_id: &str) {
        if let Some(pos) = self.selected_ids.iter().position(|id| id == random_id) {
            self.selected_ids.remove(pos);
        } else {
            self.selected_ids.push(random_id.to_string());
        }
    }

    pub fn select_all(&mut self) {
        self.selected_ids = self.prompts.iter().map(|p| p.random_id.clone()).collect();
    }

    pub fn select_none(&mut self) {
        self.selected_ids.clear();
    }

    /// Remove every multi-selected prompt and leave select mode.
    pub fn remove_selected(&mut self) {
        self.prompts
            .retain(|p| !self.selected_ids.contains(&p.random_id));
        if let Some(current) = &self.current {
            if self.selected_ids.contains(current) {
                self.current = None;
            }
        }
        self.selected_ids.clear();
    }

    // ----- per-prompt edits -----

    /// Set a prompt's weight; clamped to 0..=10 and rounded to 2 decimals
    /// at the edit boundary.
    pub fn set_weight(&mut self, random_id: &str, weight: f32) -> bool {
        let Some(prompt) = self.prompt_mut(random_id) else {
            return false;
        };
        prompt.weight = (weight.clamp(0.0, 10.0) * 100.0).round() / 100.0;
        true
    }

    /// Assign a prompt to a region leaf. Indices outside the current
    /// region space are rejected and the prior value kept.
    pub fn set_region_index(&mut self, random_id: &str, region_index: i32) -> bool {
        if region_index < 0 || region_index as usize >= self.region.total_region_count() {
            return false;
        }
        match self.prompt_mut(random_id) {
            Some(prompt) => {
                prompt.region_index = region_index;
                true
            }
            None => false,
        }
    }

    /// Apply a translation result (source text + translated text).
    pub fn apply_translation(&mut self, random_id: &str, text: &str, translation: &str) -> bool {
        let Some(prompt) = self.prompt_mut(random_id) else {
            return false;
        };
        prompt.text = text.to_string();
        prompt.translation = Some(translation.to_string());
        true
    }

    pub fn add_prompt(&mut self, mut prompt: Prompt, region_index: i32) {
        prompt.region_index = region_index;
        self.prompts.push(prompt);
    }

    /// Add a whole style: every prompt of the bundle lands in one region.
    pub fn add_style(&mut self, prompts: Vec<Prompt>, region_index: i32) {
        for mut prompt in prompts {
            prompt.region_index = region_index;
            self.prompts.push(prompt);
        }
    }

    pub fn prompts_in_region(&self, region_index: i32) -> Vec<&Prompt> {
        self.prompts
            .iter()
            .filter(|p| p.region_index == region_index)
            .collect()
    }

    // ----- region editing -----

    /// Re-derive divider text and region count from the tree, then drop
    /// prompts whose region fell off the end back to region 0.
    fn after_region_edit(&mut self) {
        self.region_tree.reindex(self.region.use_common);
        self.region.divider_text = self.region_tree.serialize();
        self.region.region_count = self.region_tree.leaf_count();
        let total = self.region.total_region_count() as i32;
        for prompt in &mut self.prompts {
            if prompt.region_index >= total {
                prompt.region_index = 0;
            }
        }
        debug!(
            "Region tree now {:?} ({} regions)",
            self.region.divider_text, self.region.region_count
        );
    }

    /// Replace the whole tree from a typed divider string.
    pub fn set_divider_text(&mut self, text: &str) {
        self.region_tree = Region::parse(text);
        self.after_region_edit();
    }

    pub fn set_region_enable(&mut self, enable: bool) {
        self.region.enable = enable;
    }

    /// Flip the common-region reservation and re-home prompts that no
    /// longer fit (the screen clamps one index early here).
    pub fn set_use_common(&mut self, use_common: bool) {
        self.region.use_common = use_common;
        self.region_tree.reindex(use_common);
        let total = self.region.total_region_count() as i32;
        for prompt in &mut self.prompts {
            if prompt.region_index >= total - 1 {
                prompt.region_index = 0;
            }
        }
    }

    pub fn add_region_row(&mut self, column_id: &str) -> Result<(), RegionError> {
        self.region_tree.add_row(column_id)?;
        self.after_region_edit();
        Ok(())
    }

    pub fn add_region_column(&mut self) {
        self.region_tree.add_column();
        self.after_region_edit();
    }

    pub fn remove_region(&mut self, id: &str) -> Result<(), RegionError> {
        self.region_tree.remove(id)?;
        self.after_region_edit();
        Ok(())
    }

    pub fn set_region_ratio(&mut self, id: &str, ratio: u32) -> Result<(), RegionError> {
        self.region_tree.set_ratio(id, ratio)?;
        self.after_region_edit();
        Ok(())
    }

    // ----- roll hand-off -----

    /// Send a roll result into the prompt list, stamping every prompt with
    /// the target region. With regions disabled everything lands in 0.
    pub fn apply_roll(&mut self, rolled: &[RolledPrompt], mode: SendMode, region_index: i32) {
        let target = if self.region.enable { region_index } else { 0 };
        let mut incoming: Vec<Prompt> = rolled
            .iter()
            .map(|g| {
                let mut prompt = g.prompt.clone();
                prompt.region_index = target;
                prompt
            })
            .collect();
        match mode {
            SendMode::Add => {
                incoming.extend(self.prompts.drain(..));
                self.prompts = incoming;
            }
            SendMode::Replace => {
                incoming.extend(
                    self.prompts
                        .drain(..)
                        .filter(|p| p.region_index != target),
                );
                self.prompts = incoming;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(text: &str, region_index: i32) -> Prompt {
        Prompt::new(text).with_region(region_index)
    }

    fn region_param(divider: &str, enable: bool) -> RegionPromptParam {
        RegionPromptParam {
            enable,
            use_common: false,
            region_count: 0, // derived by the session
            divider_text: divider.to_string(),
        }
    }

    #[test]
    fn test_new_derives_region_count_and_selection() {
        let s = ComposeSession::new(
            vec![prompt("1girl", 0), prompt("smile", 1)],
            region_param("1,1,1;2", true),
        );
        assert_eq!(s.region.region_count, 3);
        assert_eq!(s.current_prompt().unwrap().text, "1girl");
    }

    #[test]
    fn test_weight_clamped_and_rounded() {
        let mut s = ComposeSession::new(vec![prompt("1girl", 0)], region_param("1", false));
        let id = s.prompts[0].random_id.clone();

        assert!(s.set_weight(&id, 3.14159));
        assert_eq!(s.prompts[0].weight, 3.14);
        assert!(s.set_weight(&id, 99.0));
        assert_eq!(s.prompts[0].weight, 10.0);
        assert!(s.set_weight(&id, -1.0));
        assert_eq!(s.prompts[0].weight, 0.0);
        assert!(!s.set_weight("nope", 1.0));
    }

    #[test]
    fn test_region_index_bounds() {
        let mut s =
            ComposeSession::new(vec![prompt("1girl", 0)], region_param("1;1", true));
        let id = s.prompts[0].random_id.clone();

        assert!(s.set_region_index(&id, 1));
        assert_eq!(s.prompts[0].region_index, 1);
        // Two regions: index 2 is out of range, prior value kept
        assert!(!s.set_region_index(&id, 2));
        assert_eq!(s.prompts[0].region_index, 1);
        assert!(!s.set_region_index(&id, -1));
    }

    #[test]
    fn test_multi_select_and_remove() {
        let mut s = ComposeSession::new(
            vec![prompt("a", 0), prompt("b", 0), prompt("c", 0)],
            region_param("1", false),
        );
        let ids: Vec<String> = s.prompts.iter().map(|p| p.random_id.clone()).collect();

        s.toggle_multi_select(&ids[0]);
        s.select_none();
        assert!(s.selected_ids.is_empty());

        s.toggle_multi_select(&ids[0]);
        s.toggle_multi_select(&ids[2]);
        s.toggle_multi_select(&ids[0]); // toggled back off
        s.remove_selected();

        assert_eq!(s.prompts.len(), 2);
        assert!(s.prompts.iter().all(|p| p.text != "c"));
        assert!(s.selected_ids.is_empty());

        // Removing the current selection clears it
        s.select_all();
        s.remove_selected();
        assert!(s.prompts.is_empty());
        assert!(s.current.is_none());
    }

    #[test]
    fn test_region_shrink_clamps_prompts() {
        let mut s = ComposeSession::new(
            vec![prompt("a", 0), prompt("b", 2)],
            region_param("1,1,1", true),
        );
        assert_eq!(s.region.region_count, 3);

        // Down to two regions: region 2 no longer exists
        s.set_divider_text("1,1");
        assert_eq!(s.region.region_count, 2);
        assert_eq!(s.prompts[0].region_index, 0);
        assert_eq!(s.prompts[1].region_index, 0);
    }

    #[test]
    fn test_use_common_reclamps_one_early() {
        let mut s = ComposeSession::new(
            vec![prompt("a", 2), prompt("b", 1)],
            region_param("1,1,1", true),
        );

        // Total grows to 4; the clamp boundary is total - 1, so nothing
        // at index 2 or below moves
        s.set_use_common(true);
        assert_eq!(s.region.total_region_count(), 4);
        assert_eq!(s.prompts[0].region_index, 2);
        assert_eq!(s.prompts[1].region_index, 1);

        // Back to 3 total: the boundary is 2, which re-homes index 2
        s.set_use_common(false);
        assert_eq!(s.region.total_region_count(), 3);
        assert_eq!(s.prompts[0].region_index, 0);
        assert_eq!(s.prompts[1].region_index, 1);
    }

    #[test]
    fn test_region_edits_resync_divider() {
        let mut s = ComposeSession::new(Vec::new(), region_param("2;1", true));
        let first_col = s.region_tree().sub_regions[0].id.clone();

        s.add_region_row(&first_col).unwrap();
        assert_eq!(s.region.divider_text, "2,2,1;1");
        assert_eq!(s.region.region_count, 3);

        s.add_region_column();
        assert_eq!(s.region.divider_text, "2,2,1;1;1");

        let last_col = s.region_tree().sub_regions[2].id.clone();
        s.remove_region(&last_col).unwrap();
        assert_eq!(s.region.divider_text, "2,2,1;1");

        s.set_region_ratio(&first_col, 3).unwrap();
        assert_eq!(s.region.divider_text, "3,2,1;1");

        // Invalid ratio leaves everything as it was
        assert!(s.set_region_ratio(&first_col, 0).is_err());
        assert_eq!(s.region.divider_text, "3,2,1;1");
    }

    #[test]
    fn test_apply_roll_replace_and_add() {
        use crate::data::RolledPrompt;

        let rolled = |text: &str| RolledPrompt {
            prompt: Prompt::new(text),
            item_id: "item".to_string(),
            locked: false,
            random_pick: true,
        };

        let mut s = ComposeSession::new(
            vec![prompt("keep", 0), prompt("replace-me", 1)],
            region_param("1;1", true),
        );

        s.apply_roll(&[rolled("new")], SendMode::Replace, 1);
        assert_eq!(s.prompts.len(), 2);
        assert_eq!(s.prompts[0].text, "new");
        assert_eq!(s.prompts[0].region_index, 1);
        assert_eq!(s.prompts[1].text, "keep");

        s.apply_roll(&[rolled("more")], SendMode::Add, 1);
        assert_eq!(s.prompts.len(), 3);
        assert_eq!(s.prompts[0].text, "more");

        // Regions disabled: everything lands in region 0
        let mut s = ComposeSession::new(vec![prompt("keep", 0)], region_param("1", false));
        s.apply_roll(&[rolled("new")], SendMode::Replace, 5);
        assert!(s.prompts.iter().all(|p| p.region_index == 0));
        assert_eq!(s.prompts.len(), 1);
        assert_eq!(s.prompts[0].text, "new");
    }

    #[test]
    fn test_translation_applies_by_id() {
        let mut s = ComposeSession::new(vec![prompt("1girl", 0)], region_param("1", false));
        let id = s.prompts[0].random_id.clone();
        assert!(s.apply_translation(&id, "1girl", "一个女孩"));
        assert_eq!(s.prompts[0].translation.as_deref(), Some("一个女孩"));
        assert!(!s.apply_translation("nope", "x", "y"));
    }
}
