//! Patch-to-region spatial labeling engine for machine-learning training data
//!
//! Tiles large gridded section images into fixed-size patches and assigns
//! every patch a weighted set of anatomical region labels derived from
//! hand-annotated region polygons: grid generation, spatial indexing,
//! region-adjacency graph construction, area-weighted label assignment, and
//! a quality-control normalization/rejection pass.

#![deny(unsafe_code)]

/// Annotation parsing and region-adjacency graph construction
pub mod graph;
/// Input/output operations, pixel stores, and error handling
pub mod io;
/// Area-weighted label assignment, the label table, and the QC pass
pub mod labeling;
/// Per-section orchestration and the output table
pub mod section;
/// Patch tiles, polygon helpers, and the spatial index
pub mod spatial;

pub use io::error::{LabelingError, Result};
