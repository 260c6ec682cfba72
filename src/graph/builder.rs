//! Region graph construction from a parsed annotation document
//!
//! Builds two things in one pass: the ordered region-polygon list aligned to
//! tree indices (reused by the labeling pass) and the adjacency graph over
//! region ids. The build is two-phase: edges are collected into a local set
//! first, then an immutable graph snapshot is constructed, so edge
//! insertion never races with readers.

use crate::graph::annotation::{AnnotationDocument, RegionAttributes, RegionId};
use crate::io::error::{Result, invalid_annotation};
use crate::spatial::geometry;
use crate::spatial::{SpatialIndex, SpatialPredicate};
use geo::MultiPolygon;
use ndarray::Array2;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{BTreeMap, BTreeSet};

/// Map the document's rotation field to the rotation applied to geometry
///
/// The annotation viewer stores the display rotation; the labeling frame
/// needs its inverse for 270 and identity otherwise.
///
/// # Errors
///
/// Returns an `InvalidAnnotation` error for any rotation outside
/// {0, 90, 180, 270}.
pub fn map_rotation(rotation: i64) -> Result<f64> {
    match rotation {
        270 => Ok(-90.0),
        90 => Ok(90.0),
        180 => Ok(180.0),
        0 => Ok(0.0),
        other => Err(invalid_annotation(format!(
            "unsupported rotation angle {other}"
        ))),
    }
}

/// Ordered region polygons aligned to spatial-index tree indices
///
/// Position `i` in the set is tree index `i`; multiple positions may share a
/// region id when a region is annotated as several polygons.
#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    geometries: Vec<MultiPolygon<f64>>,
    region_ids: Vec<RegionId>,
}

impl RegionSet {
    /// Number of region polygons (not distinct regions)
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    /// True when the section carries no region polygons
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Geometry at a tree index
    pub fn geometry(&self, tree_index: usize) -> Option<&MultiPolygon<f64>> {
        self.geometries.get(tree_index)
    }

    /// Region id at a tree index
    pub fn region_id(&self, tree_index: usize) -> Option<&RegionId> {
        self.region_ids.get(tree_index)
    }

    /// All geometries in tree-index order
    pub fn geometries(&self) -> &[MultiPolygon<f64>] {
        &self.geometries
    }
}

/// Immutable adjacency graph over region ids
///
/// One node per distinct region id regardless of how many polygons share
/// it; an undirected edge connects regions whose polygons overlap,
/// intersect, or touch. Never contains self-loops.
#[derive(Debug)]
pub struct RegionGraph {
    graph: UnGraph<RegionId, ()>,
    indices: BTreeMap<RegionId, NodeIndex>,
    attributes: BTreeMap<RegionId, RegionAttributes>,
}

impl RegionGraph {
    /// Distinct region ids, sorted ascending
    pub fn node_ids(&self) -> Vec<&RegionId> {
        self.indices.keys().collect()
    }

    /// Number of distinct regions
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of undirected adjacency edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Attribute record for a region
    pub fn attributes(&self, region_id: &RegionId) -> Option<&RegionAttributes> {
        self.attributes.get(region_id)
    }

    /// True when the two regions are connected by polygon proximity
    pub fn contains_edge(&self, a: &RegionId, b: &RegionId) -> bool {
        match (self.indices.get(a), self.indices.get(b)) {
            (Some(&ia), Some(&ib)) => self.graph.contains_edge(ia, ib),
            _ => false,
        }
    }

    /// Region ids adjacent to the given region, sorted ascending
    pub fn neighbors(&self, region_id: &RegionId) -> Vec<RegionId> {
        let Some(&index) = self.indices.get(region_id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<RegionId> = self
            .graph
            .neighbors(index)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect();
        neighbors.sort();
        neighbors
    }

    /// Symmetric 0/1 adjacency matrix over region ids sorted ascending
    ///
    /// Row and column `i` correspond to the `i`-th entry of
    /// [`RegionGraph::node_ids`].
    pub fn adjacency_matrix(&self) -> Array2<u8> {
        let ids = self.node_ids();
        let n = ids.len();
        let mut matrix = Array2::zeros((n, n));
        for (row, a) in ids.iter().enumerate() {
            for (col, b) in ids.iter().enumerate().skip(row + 1) {
                if self.contains_edge(a, b) {
                    if let Some(cell) = matrix.get_mut((row, col)) {
                        *cell = 1;
                    }
                    if let Some(cell) = matrix.get_mut((col, row)) {
                        *cell = 1;
                    }
                }
            }
        }
        matrix
    }
}

/// Build the region set and adjacency graph for one section
///
/// Applies the document rotation about the pivot (width/2, -height/2), then
/// connects regions whose polygons satisfy any of the overlap, intersect, or
/// touch predicates against a spatial index over the region geometries
/// alone. A geometry fault on a row contributes zero edges for that row and
/// the build continues.
///
/// # Errors
///
/// Returns an `InvalidAnnotation` error for an unsupported rotation angle.
pub fn build_region_graph(
    document: &AnnotationDocument,
    width: u32,
    height: u32,
) -> Result<(RegionSet, RegionGraph)> {
    let degrees = map_rotation(document.rotation)?;
    let pivot = (f64::from(width) / 2.0, -f64::from(height) / 2.0);

    let mut geometries = Vec::with_capacity(document.features.len());
    let mut region_ids = Vec::with_capacity(document.features.len());
    let mut attributes: BTreeMap<RegionId, RegionAttributes> = BTreeMap::new();
    for feature in &document.features {
        let rotated = if degrees == 0.0 {
            feature.geometry.clone()
        } else {
            geometry::rotate_about(&feature.geometry, degrees, pivot)
        };
        let region_id = feature.attributes.region_id.clone();
        attributes
            .entry(region_id.clone())
            .or_insert_with(|| feature.attributes.clone());
        geometries.push(rotated);
        region_ids.push(region_id);
    }

    let regions = RegionSet {
        geometries,
        region_ids,
    };

    // Phase one: collect the edge set
    let index = SpatialIndex::build(regions.geometries.clone());
    let mut edges: BTreeSet<(RegionId, RegionId)> = BTreeSet::new();
    for (tree_index, geometry) in regions.geometries.iter().enumerate() {
        let Some(region_id) = regions.region_id(tree_index) else {
            continue;
        };
        let mut connected = BTreeSet::new();
        if let Ok(hits) = index.query(geometry, SpatialPredicate::Overlaps) {
            connected.extend(hits);
        }
        match index.query(geometry, SpatialPredicate::Intersects) {
            Ok(hits) => connected.extend(hits),
            Err(fault) => {
                tracing::warn!(%region_id, %fault, "adjacency query failed; row contributes no edges");
                continue;
            }
        }
        if let Ok(hits) = index.query(geometry, SpatialPredicate::Touches) {
            connected.extend(hits);
        }
        connected.remove(&tree_index);
        for candidate in connected {
            let Some(other_id) = regions.region_id(candidate) else {
                continue;
            };
            if other_id != region_id {
                let edge = if region_id < other_id {
                    (region_id.clone(), other_id.clone())
                } else {
                    (other_id.clone(), region_id.clone())
                };
                edges.insert(edge);
            }
        }
    }

    // Phase two: immutable snapshot
    let mut graph = UnGraph::new_undirected();
    let mut indices = BTreeMap::new();
    for region_id in attributes.keys() {
        let node = graph.add_node(region_id.clone());
        indices.insert(region_id.clone(), node);
    }
    for (a, b) in &edges {
        if let (Some(&ia), Some(&ib)) = (indices.get(a), indices.get(b)) {
            graph.add_edge(ia, ib, ());
        }
    }

    Ok((
        regions,
        RegionGraph {
            graph,
            indices,
            attributes,
        },
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]

    use super::*;
    use serde_json::json;

    fn square_feature(id: u32, origin: (f64, f64), side: f64) -> serde_json::Value {
        let (x, y) = origin;
        json!({
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [x, y], [x + side, y], [x + side, y - side], [x, y - side], [x, y]
                ]]
            },
            "properties": { "data": { "id": id, "name": format!("region {id}") } }
        })
    }

    fn document(features: Vec<serde_json::Value>) -> AnnotationDocument {
        let doc = json!({ "rotation": 0, "features": features });
        AnnotationDocument::from_value(&doc).unwrap()
    }

    #[test]
    fn test_rotation_map_is_fixed() {
        assert_eq!(map_rotation(270).unwrap(), -90.0);
        assert_eq!(map_rotation(90).unwrap(), 90.0);
        assert_eq!(map_rotation(180).unwrap(), 180.0);
        assert_eq!(map_rotation(0).unwrap(), 0.0);
        assert!(map_rotation(45).is_err());
    }

    #[test]
    fn test_touching_regions_are_connected() {
        let doc = document(vec![
            square_feature(1, (0.0, 0.0), 4.0),
            square_feature(2, (4.0, 0.0), 4.0),
            square_feature(3, (100.0, 0.0), 4.0),
        ]);
        let (regions, graph) = build_region_graph(&doc, 16, 16).unwrap();
        assert_eq!(regions.len(), 3);
        assert_eq!(graph.node_count(), 3);
        assert!(graph.contains_edge(&RegionId::new("1"), &RegionId::new("2")));
        assert!(!graph.contains_edge(&RegionId::new("1"), &RegionId::new("3")));
    }

    #[test]
    fn test_multiple_polygons_collapse_to_one_node() {
        let doc = document(vec![
            square_feature(1, (0.0, 0.0), 4.0),
            square_feature(1, (50.0, 0.0), 4.0),
            square_feature(2, (4.0, 0.0), 4.0),
        ]);
        let (regions, graph) = build_region_graph(&doc, 16, 16).unwrap();
        assert_eq!(regions.len(), 3);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_graph_never_contains_self_loop() {
        // Two polygons with the same id that overlap each other
        let doc = document(vec![
            square_feature(1, (0.0, 0.0), 4.0),
            square_feature(1, (2.0, -2.0), 4.0),
        ]);
        let (_, graph) = build_region_graph(&doc, 16, 16).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains_edge(&RegionId::new("1"), &RegionId::new("1")));
    }

    #[test]
    fn test_adjacency_matrix_is_symmetric_over_sorted_ids() {
        let doc = document(vec![
            square_feature(2, (0.0, 0.0), 4.0),
            square_feature(1, (4.0, 0.0), 4.0),
            square_feature(3, (200.0, 0.0), 4.0),
        ]);
        let (_, graph) = build_region_graph(&doc, 16, 16).unwrap();
        let matrix = graph.adjacency_matrix();
        assert_eq!(matrix.dim(), (3, 3));
        // ids sort to [1, 2, 3]; regions 1 and 2 share an edge
        assert_eq!(matrix[[0, 1]], 1);
        assert_eq!(matrix[[1, 0]], 1);
        assert_eq!(matrix[[0, 2]], 0);
        for i in 0..3 {
            assert_eq!(matrix[[i, i]], 0);
        }
    }

    #[test]
    fn test_attributes_are_attached_to_nodes() {
        let doc = document(vec![square_feature(7, (0.0, 0.0), 4.0)]);
        let (_, graph) = build_region_graph(&doc, 16, 16).unwrap();
        let attrs = graph.attributes(&RegionId::new("7")).unwrap();
        assert_eq!(attrs.name(), "region 7");
        assert_eq!(attrs.acronym(), "unknown");
    }

    #[test]
    fn test_rotation_is_applied_about_image_pivot() {
        // A square away from the pivot moves under rotation
        let doc_text = json!({
            "rotation": 180,
            "features": [square_feature(1, (0.0, 0.0), 2.0)]
        });
        let doc = AnnotationDocument::from_value(&doc_text).unwrap();
        let (regions, _) = build_region_graph(&doc, 8, 8).unwrap();
        let rotated = regions.geometry(0).unwrap();
        // 180 degrees about (4, -4) maps (0, 0) -> (8, -8)
        let has_far_corner = rotated.iter().any(|p| {
            p.exterior()
                .0
                .iter()
                .any(|c| (c.x - 8.0).abs() < 1e-9 && (c.y + 8.0).abs() < 1e-9)
        });
        assert!(has_far_corner);
    }
}
