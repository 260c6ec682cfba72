//! Per-section output table
//!
//! One row per retained patch: fixed metadata columns followed by one float
//! column per canonical region id. The table owns the retained patch
//! collection so rows and patches can never drift apart after QC.

use crate::labeling::LabelTable;
use crate::spatial::Patch;

/// Fixed metadata columns preceding the region columns
pub const META_COLUMNS: [&str; 8] = [
    "patch_index",
    "id",
    "min_x",
    "min_y",
    "brain_id",
    "section_id",
    "check_bg",
    "no_geojson",
];

/// Output table for one section
#[derive(Debug, Clone)]
pub struct SectionTable {
    patches: Vec<Patch>,
    patch_indices: Vec<usize>,
    check_bg: Vec<u8>,
    labels: LabelTable,
    no_geojson: bool,
}

impl SectionTable {
    /// Assemble the table from QC survivors
    ///
    /// `patch_indices` are the original grid construction indices of the
    /// retained patches; all three per-row vectors must share a length with
    /// the label table.
    pub(crate) fn new(
        patches: Vec<Patch>,
        patch_indices: Vec<usize>,
        labels: LabelTable,
        no_geojson: bool,
    ) -> Self {
        let check_bg = vec![0; patches.len()];
        Self {
            patches,
            patch_indices,
            check_bg,
            labels,
            no_geojson,
        }
    }

    /// Number of retained rows
    pub fn row_count(&self) -> usize {
        self.patches.len()
    }

    /// Retained patches in row order
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// The region-ratio half of the table
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Original grid index of a row's patch
    pub fn patch_index(&self, row: usize) -> Option<usize> {
        self.patch_indices.get(row).copied()
    }

    /// True when the section had no usable annotation document
    pub fn no_geojson(&self) -> bool {
        self.no_geojson
    }

    /// Background-check flag for a row
    pub fn check_bg(&self, row: usize) -> Option<u8> {
        self.check_bg.get(row).copied()
    }

    /// Overwrite the background-check flags, one per row
    pub fn set_background_flags(&mut self, flags: Vec<u8>) {
        if flags.len() == self.patches.len() {
            self.check_bg = flags;
        }
    }

    /// Full column header: metadata columns then region ids
    pub fn header(&self) -> Vec<String> {
        META_COLUMNS
            .iter()
            .map(|&c| c.to_owned())
            .chain(self.labels.columns().iter().map(|id| id.as_str().to_owned()))
            .collect()
    }

    /// One row rendered as strings in header order
    pub fn row_values(&self, row: usize) -> Option<Vec<String>> {
        let patch = self.patches.get(row)?;
        let patch_index = self.patch_indices.get(row)?;
        let check_bg = self.check_bg.get(row)?;
        let mut values = vec![
            patch_index.to_string(),
            patch.id(),
            patch.min_x.to_string(),
            patch.min_y.to_string(),
            patch.brain_id.to_string(),
            patch.section_id.to_string(),
            check_bg.to_string(),
            u8::from(self.no_geojson).to_string(),
        ];
        values.extend(self.labels.ratios().row(row).iter().map(f64::to_string));
        Some(values)
    }
}
