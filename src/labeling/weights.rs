//! Area-weighted label assignment for patches
//!
//! For each patch, candidate regions come from the shared spatial index;
//! each candidate's contribution is the area of its intersection with the
//! patch, discretized to suppress floating-point slivers, divided by the
//! patch area. A geometry fault on one region contributes ratio 0 and never
//! aborts the remaining candidates or patches.
//!
//! Per-patch work depends only on read-only shared state, so labeling is
//! dispatched over a worker pool; the indexed parallel iterator keeps result
//! order equal to grid order.

use crate::graph::{RegionId, RegionSet};
use crate::spatial::{Patch, SpatialIndex, geometry};
use geo::MultiPolygon;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Label results for one patch
///
/// `labels` preserves recording order; ratios and patch-local intersection
/// geometries are keyed by region id. Region ids outside the nomenclature
/// still appear here even though they get no table column.
#[derive(Debug, Clone, Default)]
pub struct PatchLabels {
    /// Region ids in the order they were recorded
    pub labels: Vec<RegionId>,
    /// Area ratio per region, in [0, 1] per region
    pub ratios: BTreeMap<RegionId, f64>,
    /// Intersection geometry per region, translated to patch-local
    /// coordinates
    pub geometries: BTreeMap<RegionId, MultiPolygon<f64>>,
}

impl PatchLabels {
    /// Sum of all recorded ratios
    pub fn total(&self) -> f64 {
        self.ratios.values().sum()
    }

    /// Divide every recorded ratio by `total`
    pub fn rescale(&mut self, total: f64) {
        if total <= 0.0 {
            return;
        }
        for ratio in self.ratios.values_mut() {
            *ratio /= total;
        }
    }
}

/// Read-only task descriptor for labeling one patch
///
/// Carries everything a worker needs by shared reference; no mutable state
/// crosses task boundaries.
#[derive(Clone, Copy)]
pub struct LabelTask<'a> {
    /// The patch being labeled
    pub patch: &'a Patch,
    /// Shared index over [region polygons, patch polygons]
    pub index: &'a SpatialIndex,
    /// Shared region polygons aligned to tree indices
    pub regions: &'a RegionSet,
}

/// Compute the label set for a single patch
///
/// Candidates are envelope hits restricted to region handles (handle <
/// region count). A region is recorded when its discretized intersection
/// ratio is positive and the region was not already recorded for this patch.
pub fn label_patch(task: &LabelTask<'_>, granularity: f64) -> PatchLabels {
    let mut result = PatchLabels::default();
    if task.regions.is_empty() {
        return result;
    }

    let patch_polygon = task.patch.polygon();
    let patch_area = task.patch.area();
    let region_count = task.regions.len();

    for handle in task.index.candidates(&patch_polygon) {
        if handle >= region_count {
            continue;
        }
        let (Some(region_polygon), Some(region_id)) =
            (task.regions.geometry(handle), task.regions.region_id(handle))
        else {
            continue;
        };

        let shared = match geometry::intersection(region_polygon, &patch_polygon) {
            Ok(shared) => shared,
            Err(fault) => {
                // Degenerate region geometry contributes ratio 0
                tracing::debug!(patch = %task.patch, %region_id, %fault, "intersection fault");
                continue;
            }
        };
        let discretized = geometry::discretize(&shared, granularity);
        let area = geometry::unsigned_area(&discretized);
        let ratio = area / patch_area;

        if ratio > 0.0 && !result.ratios.contains_key(region_id) {
            let local = geometry::translate(
                &discretized,
                -f64::from(task.patch.min_x),
                f64::from(task.patch.min_y),
            );
            result.labels.push(region_id.clone());
            result.ratios.insert(region_id.clone(), ratio);
            result.geometries.insert(region_id.clone(), local);
        }
    }
    result
}

/// Label every patch against the shared index and region set
///
/// Dispatches per-patch tasks over the rayon pool; the output vector is in
/// patch-construction order regardless of scheduling.
pub fn label_patches(
    patches: &[Patch],
    index: &SpatialIndex,
    regions: &RegionSet,
    granularity: f64,
) -> Vec<PatchLabels> {
    patches
        .par_iter()
        .map(|patch| {
            let task = LabelTask {
                patch,
                index,
                regions,
            };
            label_patch(&task, granularity)
        })
        .collect()
}
