//! Quality-control pass over the label table and patch collection
//!
//! A patch whose label ratios sum past the rejection boundary is structurally
//! invalid (regions cannot cover more than the patch); a patch slightly over
//! full coverage is renormalized; anything at or under full coverage is left
//! alone, since incomplete coverage legitimately happens at tissue borders
//! and background.

use crate::io::error::{Result, invalid_parameter};
use crate::labeling::table::LabelTable;
use crate::spatial::Patch;

/// Default coverage tolerance above full coverage
pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// Outcome counts of one QC pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QcReport {
    /// Rows kept in the table
    pub retained: usize,
    /// Rows renormalized to total exactly 1
    pub rescaled: usize,
    /// Rows removed together with their patches
    pub rejected: usize,
}

/// Reject or renormalize patches based on aggregate label coverage
///
/// For each row total `t`:
/// - `t > 1 + tolerance`: the patch and its row are removed together
/// - `1 < t <= 1 + tolerance`: every nonzero ratio is divided by `t`
/// - `t <= 1`: untouched
///
/// Running the pass twice is a no-op: after one pass no row total exceeds 1.
///
/// # Errors
///
/// Returns an `InvalidParameter` error for a negative tolerance or when the
/// patch collection and table have drifted out of alignment.
pub fn qc_pass(
    patches: &mut Vec<Patch>,
    table: &mut LabelTable,
    tolerance: f64,
) -> Result<QcReport> {
    if !(tolerance >= 0.0 && tolerance.is_finite()) {
        return Err(invalid_parameter(
            "tolerance",
            &tolerance,
            &"tolerance must be finite and non-negative",
        ));
    }
    if patches.len() != table.row_count() {
        return Err(invalid_parameter(
            "patches",
            &patches.len(),
            &format!(
                "patch collection and label table disagree ({} rows)",
                table.row_count()
            ),
        ));
    }

    let rejection_boundary = 1.0 + tolerance;
    let mut keep = Vec::with_capacity(patches.len());
    let mut rescaled = 0;
    for row in 0..table.row_count() {
        let total = table.row_total(row);
        if total > rejection_boundary {
            continue;
        }
        if total > 1.0 {
            table.rescale_row(row, total);
            rescaled += 1;
        }
        keep.push(row);
    }

    let rejected = patches.len() - keep.len();
    if rejected > 0 {
        // Joint atomic removal: same index set for both collections
        let mut kept_patches = Vec::with_capacity(keep.len());
        for &row in &keep {
            if let Some(patch) = patches.get(row) {
                kept_patches.push(patch.clone());
            }
        }
        *patches = kept_patches;
        table.retain_rows(&keep)?;
    }

    Ok(QcReport {
        retained: keep.len(),
        rescaled,
        rejected,
    })
}
