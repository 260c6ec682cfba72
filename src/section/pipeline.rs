//! Section pipeline: grid → region graph → index → labeling → QC
//!
//! Orchestrates one section end to end. The spatial index build is the hard
//! barrier between setup and the parallel labeling pass; everything labeled
//! afterwards reads shared immutable state only.

use crate::graph::{AnnotationDocument, RegionGraph, RegionSet, build_region_graph};
use crate::io::configuration::{
    DEFAULT_GRANULARITY, DEFAULT_PATCH_SIZE, DEFAULT_STRIDE,
};
use crate::io::error::{LabelingError, Result, invalid_parameter};
use crate::io::nomenclature::Nomenclature;
use crate::io::store::{PixelStore, background_flags};
use crate::labeling::{DEFAULT_TOLERANCE, LabelTable, QcReport, label_patches, qc_pass};
use crate::section::output::SectionTable;
use crate::spatial::{Patch, SpatialIndex, generate_grid};
use std::collections::HashMap;

/// Tunable parameters for one section run
#[derive(Debug, Clone, Copy)]
pub struct SectionConfig {
    /// Tile side length in pixels
    pub patch_size: u32,
    /// Spacing between successive patch origins
    pub stride: u32,
    /// QC coverage tolerance above full coverage
    pub tolerance: f64,
    /// Rounding unit for intersection discretization
    pub granularity: f64,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            stride: DEFAULT_STRIDE,
            tolerance: DEFAULT_TOLERANCE,
            granularity: DEFAULT_GRANULARITY,
        }
    }
}

impl SectionConfig {
    /// Validate parameter ranges
    ///
    /// # Errors
    ///
    /// Returns an `InvalidParameter` error for a non-positive granularity or
    /// a negative or non-finite tolerance; grid parameters are validated by
    /// the grid generator.
    pub fn validate(&self) -> Result<()> {
        if !(self.granularity > 0.0 && self.granularity.is_finite()) {
            return Err(invalid_parameter(
                "granularity",
                &self.granularity,
                &"granularity must be finite and positive",
            ));
        }
        if !(self.tolerance >= 0.0 && self.tolerance.is_finite()) {
            return Err(invalid_parameter(
                "tolerance",
                &self.tolerance,
                &"tolerance must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Everything one section run produces
#[derive(Debug)]
pub struct SectionOutput {
    /// The per-section output table plus retained patches
    pub table: SectionTable,
    /// Region adjacency graph, absent when the annotation was unusable
    pub graph: Option<RegionGraph>,
    /// QC outcome counts
    pub qc: QcReport,
}

/// Process one section from an in-memory annotation document
///
/// A malformed or absent annotation is recoverable: the section proceeds
/// with zero region labels and `no_geojson` set. Extent and parameter
/// problems are fatal for the section and propagate.
///
/// # Errors
///
/// Returns an `ImageNotFound` error for a zero extent, or an
/// `InvalidParameter` error for bad grid/QC parameters.
pub fn process_section(
    brain_id: u32,
    section_id: u32,
    extent: (u32, u32),
    annotation: Option<&str>,
    nomenclature: &Nomenclature,
    config: &SectionConfig,
) -> Result<SectionOutput> {
    config.validate()?;
    let (width, height) = extent;
    if width == 0 || height == 0 {
        return Err(LabelingError::ImageNotFound {
            brain_id,
            section_id,
            reason: "image extent unavailable; the section may not be converted yet".to_owned(),
        });
    }

    // Region graph build is independent of the grid and may fail softly
    let (regions, graph, no_geojson) = match annotation {
        None => (RegionSet::default(), None, true),
        Some(text) => match parse_and_build(text, width, height) {
            Ok((regions, graph)) => (regions, Some(graph), false),
            Err(LabelingError::InvalidAnnotation { reason }) => {
                tracing::warn!(brain_id, section_id, %reason, "section proceeds unannotated");
                (RegionSet::default(), None, true)
            }
            Err(other) => return Err(other),
        },
    };

    let mut patches = generate_grid(brain_id, section_id, width, height, config.patch_size, config.stride)?;

    // Index over [region polygons, patch polygons]; hard barrier before labeling
    let mut polygons = regions.geometries().to_vec();
    polygons.extend(patches.iter().map(Patch::polygon));
    let index = SpatialIndex::build(polygons);

    let records = label_patches(&patches, &index, &regions, config.granularity);
    let mut labels = LabelTable::from_records(nomenclature, records);

    // Remember grid indices before QC removes rows
    let grid_index: HashMap<Patch, usize> = patches
        .iter()
        .enumerate()
        .map(|(i, p)| (p.clone(), i))
        .collect();

    let qc = qc_pass(&mut patches, &mut labels, config.tolerance)?;

    let patch_indices: Vec<usize> = patches
        .iter()
        .map(|p| grid_index.get(p).copied().unwrap_or_default())
        .collect();

    let table = SectionTable::new(patches, patch_indices, labels, no_geojson);
    Ok(SectionOutput { table, graph, qc })
}

/// Process one section whose extent and background flags come from a pixel
/// store
///
/// # Errors
///
/// Returns an `ImageNotFound` error when the store has no extent, plus the
/// conditions of [`process_section`].
pub fn process_section_with_store(
    brain_id: u32,
    section_id: u32,
    store: &dyn PixelStore,
    annotation: Option<&str>,
    nomenclature: &Nomenclature,
    config: &SectionConfig,
) -> Result<SectionOutput> {
    let extent = store.extent();
    let mut output = process_section(brain_id, section_id, extent, annotation, nomenclature, config)?;
    let flags = background_flags(store, output.table.patches());
    output.table.set_background_flags(flags);
    Ok(output)
}

fn parse_and_build(text: &str, width: u32, height: u32) -> Result<(RegionSet, RegionGraph)> {
    let document = AnnotationDocument::parse(text)?;
    build_region_graph(&document, width, height)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;

    #[test]
    fn test_zero_extent_is_image_not_found() {
        let nomenclature = Nomenclature::from_ids(["1"]).unwrap();
        let err = process_section(1, 1, (0, 2048), None, &nomenclature, &SectionConfig::default())
            .unwrap_err();
        assert!(matches!(err, LabelingError::ImageNotFound { .. }));
    }

    #[test]
    fn test_missing_annotation_yields_all_zero_rows() {
        let nomenclature = Nomenclature::from_ids(["1", "2"]).unwrap();
        let output = process_section(
            1,
            7,
            (2048, 2048),
            None,
            &nomenclature,
            &SectionConfig {
                patch_size: 1024,
                stride: 1024,
                ..SectionConfig::default()
            },
        )
        .unwrap();
        assert!(output.table.no_geojson());
        assert!(output.graph.is_none());
        assert_eq!(output.table.row_count(), 4);
        for row in 0..4 {
            assert_eq!(output.table.labels().row_total(row), 0.0);
        }
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let nomenclature = Nomenclature::from_ids(["1"]).unwrap();
        let config = SectionConfig {
            granularity: 0.0,
            ..SectionConfig::default()
        };
        assert!(process_section(1, 1, (2048, 2048), None, &nomenclature, &config).is_err());
    }
}
