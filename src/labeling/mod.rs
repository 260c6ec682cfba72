//! Area-weighted label assignment, the label table, and the QC pass

/// Quality-control normalization and rejection pass
pub mod qc;
/// Dense per-section label table
pub mod table;
/// Per-patch area-ratio computation
pub mod weights;

pub use qc::{DEFAULT_TOLERANCE, QcReport, qc_pass};
pub use table::LabelTable;
pub use weights::{LabelTask, PatchLabels, label_patch, label_patches};
