//! Annotation parsing and region-adjacency graph construction
//!
//! Consumes the hand-annotated region document for one section and produces
//! the normalized region geometries plus an immutable adjacency graph over
//! region ids.

/// Annotation document parsing and attribute canonicalization
pub mod annotation;
/// Region graph construction and adjacency queries
pub mod builder;

pub use annotation::{AnnotationDocument, RegionAttributes, RegionId, UNKNOWN_ATTRIBUTE};
pub use builder::{RegionGraph, RegionSet, build_region_graph, map_rotation};
