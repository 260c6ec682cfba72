//! Read-only R-tree index over a fixed polygon set
//!
//! Built once from an ordered polygon list; each polygon's handle is its
//! position in that list. The tree prunes by axis-aligned envelope and an
//! exact predicate filter runs on the survivors. After construction the
//! index is immutable, so any number of worker threads may query it
//! concurrently.

use crate::io::error::Result;
use crate::spatial::geometry;
use geo::{BoundingRect, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};
use std::collections::BTreeSet;

/// Exact spatial relationship tested after envelope pruning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialPredicate {
    /// Geometries share at least one point
    Intersects,
    /// Geometries share interior area without either containing the other
    Overlaps,
    /// Geometries meet only along their boundaries
    Touches,
}

/// Envelope entry stored in the R-tree, carrying the polygon's handle
struct PolygonEnvelope {
    handle: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for PolygonEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Immutable spatial index addressable by integer handle
pub struct SpatialIndex {
    tree: RTree<PolygonEnvelope>,
    polygons: Vec<MultiPolygon<f64>>,
}

impl SpatialIndex {
    /// Build the index from an ordered polygon list
    ///
    /// Handle `i` refers to `polygons[i]` forever after. Polygons without a
    /// bounding rectangle (empty geometry) keep their handle but never match
    /// a query.
    pub fn build(polygons: Vec<MultiPolygon<f64>>) -> Self {
        let entries: Vec<PolygonEnvelope> = polygons
            .iter()
            .enumerate()
            .filter_map(|(handle, polygon)| {
                polygon.bounding_rect().map(|rect| PolygonEnvelope {
                    handle,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            polygons,
        }
    }

    /// Number of indexed polygons
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// True when no polygons are indexed
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// The polygon stored under a handle
    pub fn polygon(&self, handle: usize) -> Option<&MultiPolygon<f64>> {
        self.polygons.get(handle)
    }

    /// Handles whose envelopes intersect the query geometry's envelope
    ///
    /// This is the coarse candidate set the labeling pass starts from; exact
    /// predicate filtering is left to the caller.
    pub fn candidates(&self, geometry: &MultiPolygon<f64>) -> Vec<usize> {
        let Some(rect) = geometry.bounding_rect() else {
            return Vec::new();
        };
        if !(rect.min().x.is_finite()
            && rect.min().y.is_finite()
            && rect.max().x.is_finite()
            && rect.max().y.is_finite())
        {
            return Vec::new();
        }
        let envelope =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        let mut handles: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.handle)
            .collect();
        handles.sort_unstable();
        handles
    }

    /// Handles satisfying an exact predicate against the query geometry
    ///
    /// `Overlaps` and `Touches` tolerate degenerate input by dropping the
    /// offending candidate from the result. `Intersects` propagates geometry
    /// faults to the caller, which needs them for correctness.
    ///
    /// # Errors
    ///
    /// Returns a `GeometryOperation` error for `Intersects` queries over
    /// degenerate geometry.
    pub fn query(
        &self,
        geometry: &MultiPolygon<f64>,
        predicate: SpatialPredicate,
    ) -> Result<BTreeSet<usize>> {
        let mut matches = BTreeSet::new();
        if let Err(fault) = geometry::validate(geometry) {
            return match predicate {
                SpatialPredicate::Intersects => Err(fault),
                SpatialPredicate::Overlaps | SpatialPredicate::Touches => Ok(matches),
            };
        }
        for handle in self.candidates(geometry) {
            let Some(candidate) = self.polygons.get(handle) else {
                continue;
            };
            let hit = match predicate {
                SpatialPredicate::Intersects => {
                    geometry::validate(candidate)?;
                    geometry::intersects(geometry, candidate)
                }
                SpatialPredicate::Overlaps => {
                    geometry::overlaps(geometry, candidate).unwrap_or(false)
                }
                SpatialPredicate::Touches => {
                    geometry::touches(geometry, candidate).unwrap_or(false)
                }
            };
            if hit {
                matches.insert(handle);
            }
        }
        Ok(matches)
    }
}
