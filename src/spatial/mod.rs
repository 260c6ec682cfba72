//! Spatial primitives: patch tiles, polygon helpers, and the R-tree index
//!
//! This module contains the geometric half of the labeling engine:
//! - Patch entity and grid generation over a section extent
//! - Polygon validation, boolean operations, and affine helpers
//! - The immutable handle-addressed spatial index

/// Polygon validation, boolean operations, and affine helpers
pub mod geometry;
/// Read-only R-tree index over a fixed polygon set
pub mod index;
/// Patch entity and grid generation
pub mod patch;

pub use index::{SpatialIndex, SpatialPredicate};
pub use patch::{Patch, generate_grid};
