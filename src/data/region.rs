//! Region tree - the canvas partition model behind regional prompting
//!
//! A divider string like `"2,1,1;1"` splits the canvas into weighted columns
//! (separated by `;`), each split into weighted rows. The tree has exactly
//! two levels below the root: root -> Column -> Row. Rows are the leaves;
//! after re-indexing each row carries a flat region index that prompts are
//! assigned to.
//!
//! The divider mini-language must stay exactly reproducible: `serialize` is
//! the inverse of `parse` for well-formed input, and every structural edit
//! re-derives the divider text through it.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Orientation of a tree node. Columns are the top-level children of the
/// root, rows are their leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionLayout {
    Column,
    Row,
}

impl RegionLayout {
    fn prefix(self) -> &'static str {
        match self {
            RegionLayout::Column => "Column",
            RegionLayout::Row => "Row",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    #[error("no region with id {0}")]
    UnknownId(String),
    #[error("cannot remove the last region")]
    LastRegion,
    #[error("ratio must be a positive integer")]
    InvalidRatio,
}

/// One node of the region tree.
///
/// The root is a synthetic Column holding the real columns; only row nodes
/// ever receive a flat `index`. Ids are stable for the lifetime of the node
/// and are the only handle edits use.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Flat leaf index, -1 until assigned by `reindex`
    pub index: i32,

    /// Relative size weight among siblings
    pub ratio: u32,

    pub layout: RegionLayout,

    /// Rows under a column; empty for rows themselves
    pub sub_regions: Vec<Region>,

    /// Stable identity, `<layout>_<6 random alphanumerics>`
    pub id: String,
}

fn fresh_id(layout: RegionLayout) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{}_{}", layout.prefix(), suffix)
}

/// A malformed token is worth one share, never an error.
fn parse_ratio(token: &str) -> u32 {
    match token.parse::<u32>() {
        Ok(r) if r > 0 => r,
        _ => 1,
    }
}

impl Region {
    fn node(layout: RegionLayout, ratio: u32) -> Self {
        Self {
            index: -1,
            ratio,
            layout,
            sub_regions: Vec::new(),
            id: fresh_id(layout),
        }
    }

    fn column(ratio: u32) -> Self {
        Self::node(RegionLayout::Column, ratio)
    }

    fn row(ratio: u32) -> Self {
        Self::node(RegionLayout::Row, ratio)
    }

    /// Parse a divider string into a region tree.
    ///
    /// Column specs are separated by `;`, ratios inside a column by `,`.
    /// With more than one column spec, the first number of each spec is the
    /// column's own ratio - a spec with only that number also gets a single
    /// implicit row of the same ratio. With a single spec (no `;`), every
    /// number is a row ratio and the column keeps ratio 1.
    pub fn parse(input: &str) -> Region {
        let mut root = Region::column(1);
        let multi_column = input.contains(';');

        for col_part in input.split(';') {
            let tokens: Vec<&str> = col_part.split(',').collect();
            let mut column = Region::column(1);

            for (idx, token) in tokens.iter().enumerate() {
                if multi_column && idx == 0 {
                    column.ratio = parse_ratio(token);
                    if tokens.len() == 1 {
                        column.sub_regions.push(Region::row(column.ratio));
                    }
                    continue;
                }
                column.sub_regions.push(Region::row(parse_ratio(token)));
            }
            root.sub_regions.push(column);
        }
        root
    }

    /// Serialize back to divider text; inverse of `parse`.
    ///
    /// A column with a single row collapses to that row's ratio as a bare
    /// number. Otherwise the column ratio leads the row ratios, except when
    /// the tree has exactly one column, where no column ratio is written.
    pub fn serialize(&self) -> String {
        let multi_column = self.sub_regions.len() > 1;
        self.sub_regions
            .iter()
            .map(|column| {
                if column.sub_regions.len() == 1 {
                    return column.sub_regions[0].ratio.to_string();
                }
                let rows = column
                    .sub_regions
                    .iter()
                    .map(|row| row.ratio.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                if multi_column {
                    format!("{},{}", column.ratio, rows)
                } else {
                    rows
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Assign flat leaf indices in column-major, row-minor order.
    ///
    /// With `use_common` the counter starts at 0 so index 0 stays reserved
    /// for the common region and the first leaf receives 1; otherwise the
    /// first leaf receives 0. Ratios, ids, and layout are untouched.
    pub fn reindex(&mut self, use_common: bool) {
        let mut current = if use_common { 0 } else { -1 };
        for column in &mut self.sub_regions {
            for row in &mut column.sub_regions {
                current += 1;
                row.index = current;
            }
        }
    }

    /// Number of leaf regions (rows across all columns).
    pub fn leaf_count(&self) -> usize {
        self.sub_regions.iter().map(|c| c.sub_regions.len()).sum()
    }

    /// Find a node by id at either level.
    pub fn find(&self, id: &str) -> Option<&Region> {
        for column in &self.sub_regions {
            if column.id == id {
                return Some(column);
            }
            if let Some(row) = column.sub_regions.iter().find(|r| r.id == id) {
                return Some(row);
            }
        }
        None
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Region> {
        for column in &mut self.sub_regions {
            if column.id == id {
                return Some(column);
            }
            if let Some(row) = column.sub_regions.iter_mut().find(|r| r.id == id) {
                return Some(row);
            }
        }
        None
    }

    /// Column owning a row, resolved by search rather than a back-pointer.
    pub fn parent_of(&self, row_id: &str) -> Option<&Region> {
        self.sub_regions
            .iter()
            .find(|column| column.sub_regions.iter().any(|r| r.id == row_id))
    }

    /// Append a default row (ratio 1) to the named column.
    pub fn add_row(&mut self, column_id: &str) -> Result<(), RegionError> {
        let column = self
            .sub_regions
            .iter_mut()
            .find(|c| c.id == column_id)
            .ok_or_else(|| RegionError::UnknownId(column_id.to_string()))?;
        column.sub_regions.push(Region::row(1));
        Ok(())
    }

    /// Append a new column holding a single default row.
    pub fn add_column(&mut self) {
        let mut column = Region::column(1);
        column.sub_regions.push(Region::row(1));
        self.sub_regions.push(column);
    }

    /// Remove a node by id.
    ///
    /// Removing the only row of a column removes the whole column - a column
    /// without rows must not exist. Removing the last remaining leaf of the
    /// tree is rejected: at least one column with one row always remains.
    pub fn remove(&mut self, id: &str) -> Result<(), RegionError> {
        if let Some(pos) = self
            .sub_regions
            .iter()
            .position(|c| c.sub_regions.iter().any(|r| r.id == id))
        {
            if self.sub_regions[pos].sub_regions.len() > 1 {
                // Only this row goes; the column keeps its siblings.
                self.sub_regions[pos].sub_regions.retain(|r| r.id != id);
                return Ok(());
            }
            // Last row of its column: the whole column goes with it.
            return self.remove_column_at(pos);
        }
        if let Some(pos) = self.sub_regions.iter().position(|c| c.id == id) {
            return self.remove_column_at(pos);
        }
        Err(RegionError::UnknownId(id.to_string()))
    }

    /// Drop a whole column, refusing to empty the tree.
    fn remove_column_at(&mut self, pos: usize) -> Result<(), RegionError> {
        if self.leaf_count() <= self.sub_regions[pos].sub_regions.len() {
            return Err(RegionError::LastRegion);
        }
        self.sub_regions.remove(pos);
        Ok(())
    }

    /// Set the ratio of a node. Zero is rejected and the prior value kept.
    pub fn set_ratio(&mut self, id: &str, ratio: u32) -> Result<(), RegionError> {
        if ratio == 0 {
            return Err(RegionError::InvalidRatio);
        }
        let node = self
            .find_mut(id)
            .ok_or_else(|| RegionError::UnknownId(id.to_string()))?;
        node.ratio = ratio;
        Ok(())
    }
}

/// Regional prompting parameters as the surrounding screen holds them.
///
/// The parsed tree is the canonical structure; `divider_text` is its
/// serialized form and `region_count` is derived from it, never stored
/// independently.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RegionPromptParam {
    pub enable: bool,
    /// Reserve leaf index 0 as the region shared across all others
    pub use_common: bool,
    pub region_count: usize,
    pub divider_text: String,
}

impl Default for RegionPromptParam {
    fn default() -> Self {
        Self {
            enable: false,
            use_common: false,
            region_count: 1,
            divider_text: "1".to_string(),
        }
    }
}

impl RegionPromptParam {
    /// Region indices addressable by prompts, common region included.
    pub fn total_region_count(&self) -> usize {
        if self.use_common {
            self.region_count + 1
        } else {
            self.region_count
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_indices(root: &Region) -> Vec<i32> {
        root.sub_regions
            .iter()
            .flat_map(|c| c.sub_regions.iter().map(|r| r.index))
            .collect()
    }

    fn leaf_ratios(root: &Region) -> Vec<Vec<u32>> {
        root.sub_regions
            .iter()
            .map(|c| c.sub_regions.iter().map(|r| r.ratio).collect())
            .collect()
    }

    #[test]
    fn test_parse_multi_column() {
        // "2,1;1": column of ratio 2 with one explicit row, then a bare
        // column that seeds its own implicit row
        let root = Region::parse("2,1;1");
        assert_eq!(root.sub_regions.len(), 2);
        assert_eq!(root.sub_regions[0].ratio, 2);
        assert_eq!(root.sub_regions[0].sub_regions.len(), 1);
        assert_eq!(root.sub_regions[0].sub_regions[0].ratio, 1);
        assert_eq!(root.sub_regions[1].ratio, 1);
        assert_eq!(root.sub_regions[1].sub_regions.len(), 1);
        assert_eq!(root.sub_regions[1].sub_regions[0].ratio, 1);
    }

    #[test]
    fn test_parse_single_column() {
        // No ';': every number is a row ratio, none is consumed as a
        // column ratio
        let root = Region::parse("1,2,3");
        assert_eq!(root.sub_regions.len(), 1);
        assert_eq!(root.sub_regions[0].ratio, 1);
        assert_eq!(leaf_ratios(&root), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_parse_malformed_tokens_default_to_one() {
        let root = Region::parse("x,2,-3;abc");
        assert_eq!(leaf_ratios(&root), vec![vec![1, 2, 1], vec![1]]);
        assert_eq!(root.sub_regions[1].ratio, 1);

        // Zero is not a valid share either
        let root = Region::parse("0,0");
        assert_eq!(leaf_ratios(&root), vec![vec![1, 1]]);
    }

    #[test]
    fn test_parse_empty_input_yields_one_region() {
        let root = Region::parse("");
        assert_eq!(root.sub_regions.len(), 1);
        assert_eq!(root.leaf_count(), 1);
    }

    #[test]
    fn test_reindex_flat_order() {
        let mut root = Region::parse("1,2,3");
        root.reindex(false);
        assert_eq!(leaf_indices(&root), vec![0, 1, 2]);

        let mut root = Region::parse("2,1;1");
        root.reindex(false);
        assert_eq!(leaf_indices(&root), vec![0, 1]);
    }

    #[test]
    fn test_reindex_use_common_reserves_zero() {
        let mut root = Region::parse("1,1;2");
        root.reindex(true);
        // Index 0 belongs to the common region, leaves start at 1
        assert_eq!(leaf_indices(&root), vec![1, 2, 3]);
    }

    #[test]
    fn test_reindex_preserves_everything_else() {
        let mut root = Region::parse("2,3;4");
        let ids: Vec<String> = root
            .sub_regions
            .iter()
            .flat_map(|c| c.sub_regions.iter().map(|r| r.id.clone()))
            .collect();
        let ratios = leaf_ratios(&root);
        root.reindex(false);
        let ids_after: Vec<String> = root
            .sub_regions
            .iter()
            .flat_map(|c| c.sub_regions.iter().map(|r| r.id.clone()))
            .collect();
        assert_eq!(ids, ids_after);
        assert_eq!(ratios, leaf_ratios(&root));
    }

    #[test]
    fn test_serialize_round_trip() {
        for input in ["1", "1,2,3", "2;1", "2,1,3;1;4,2,2", "3;1;2"] {
            let root = Region::parse(input);
            assert_eq!(root.serialize(), input, "round trip of {input:?}");
        }
    }

    #[test]
    fn test_serialize_repairs_malformed_input() {
        // Bad tokens come back as 1, everything else survives
        let root = Region::parse("2,x,3;1");
        assert_eq!(root.serialize(), "2,1,3;1");
    }

    #[test]
    fn test_serialize_single_row_column_uses_row_ratio() {
        // A lone single-row column writes its row's ratio
        let root = Region::parse("5");
        assert_eq!(root.serialize(), "5");
    }

    #[test]
    fn test_add_row_and_column() {
        let mut root = Region::parse("2;1");
        let first_col = root.sub_regions[0].id.clone();
        root.add_row(&first_col).unwrap();
        assert_eq!(root.leaf_count(), 3);
        // The new row took the default ratio
        assert_eq!(root.serialize(), "2,2,1;1");

        root.add_column();
        assert_eq!(root.leaf_count(), 4);
        assert_eq!(root.serialize(), "2,2,1;1;1");

        assert!(matches!(
            root.add_row("Column_nope"),
            Err(RegionError::UnknownId(_))
        ));
    }

    #[test]
    fn test_remove_row_then_collapses_column() {
        let mut root = Region::parse("1,1,2;3");
        let col = root.sub_regions[0].id.clone();
        let rows: Vec<String> = root.sub_regions[0]
            .sub_regions
            .iter()
            .map(|r| r.id.clone())
            .collect();

        // Two rows in the column: removing one keeps the column
        root.remove(&rows[0]).unwrap();
        assert_eq!(root.leaf_count(), 2);
        assert!(root.find(&col).is_some());

        // Removing the column's last remaining row takes the column with it
        root.remove(&rows[1]).unwrap();
        assert!(root.find(&col).is_none());
        assert_eq!(root.sub_regions.len(), 1);
    }

    #[test]
    fn test_remove_column_takes_rows() {
        let mut root = Region::parse("1,1,2;3");
        let col = root.sub_regions[0].id.clone();
        root.remove(&col).unwrap();
        assert_eq!(root.leaf_count(), 1);
        assert_eq!(root.serialize(), "3");
    }

    #[test]
    fn test_remove_last_region_rejected() {
        let mut root = Region::parse("4");
        let row = root.sub_regions[0].sub_regions[0].id.clone();
        assert_eq!(root.remove(&row), Err(RegionError::LastRegion));
        let col = root.sub_regions[0].id.clone();
        assert_eq!(root.remove(&col), Err(RegionError::LastRegion));
        // Tree untouched either way
        assert_eq!(root.leaf_count(), 1);
    }

    #[test]
    fn test_set_ratio() {
        let mut root = Region::parse("2;1");
        let col = root.sub_regions[0].id.clone();
        let row = root.sub_regions[1].sub_regions[0].id.clone();

        root.set_ratio(&col, 5).unwrap();
        root.set_ratio(&row, 3).unwrap();
        assert_eq!(root.serialize(), "5;3");

        assert_eq!(root.set_ratio(&col, 0), Err(RegionError::InvalidRatio));
        // Prior value retained after the rejected edit
        assert_eq!(root.find(&col).unwrap().ratio, 5);
    }

    #[test]
    fn test_parent_lookup() {
        let root = Region::parse("1,2;3");
        let row = root.sub_regions[0].sub_regions[1].id.clone();
        let parent = root.parent_of(&row).unwrap();
        assert_eq!(parent.id, root.sub_regions[0].id);
        assert!(root.parent_of("Row_nope").is_none());
    }

    #[test]
    fn test_total_region_count() {
        let mut param = RegionPromptParam {
            region_count: 3,
            ..Default::default()
        };
        assert_eq!(param.total_region_count(), 3);
        param.use_common = true;
        assert_eq!(param.total_region_count(), 4);
    }
}
