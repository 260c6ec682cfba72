//! Patch entity and grid generation over a section extent
//!
//! A patch is an axis-aligned square tile positioned by pixel offset. The
//! polygon lives in the Y-flipped frame used by the annotation documents, so
//! patch and region geometry can be intersected directly. Patches carry no
//! label state: label results live in a separate table keyed by the patch's
//! construction index.

use crate::io::error::{LabelingError, Result, invalid_parameter};
use crate::spatial::geometry::ring_polygon;
use geo::MultiPolygon;
use std::hash::{Hash, Hasher};

/// One square tile of a section image
///
/// Identity is the tuple (`brain_id`, `section_id`, `min_x`, `min_y`);
/// equality and hashing ignore everything else. The tile may overhang the
/// image extent; reading pixels for an overhanging tile fails, but its
/// geometry is still valid for labeling.
#[derive(Debug, Clone)]
pub struct Patch {
    /// Brain identifier
    pub brain_id: u32,
    /// Section identifier within the brain
    pub section_id: u32,
    /// Left edge in pixels
    pub min_x: u32,
    /// Top edge in pixels
    pub min_y: u32,
    /// Side length in pixels
    pub patch_size: u32,
}

impl Patch {
    /// Create a patch anchored at (`min_x`, `min_y`)
    ///
    /// # Errors
    ///
    /// Returns an `InvalidParameter` error for a zero patch size.
    pub fn new(
        brain_id: u32,
        section_id: u32,
        min_x: u32,
        min_y: u32,
        patch_size: u32,
    ) -> Result<Self> {
        if patch_size == 0 {
            return Err(invalid_parameter(
                "patch_size",
                &patch_size,
                &"patch size must be positive",
            ));
        }
        Ok(Self {
            brain_id,
            section_id,
            min_x,
            min_y,
            patch_size,
        })
    }

    /// Right edge in pixels (exclusive)
    pub const fn max_x(&self) -> u32 {
        self.min_x + self.patch_size
    }

    /// Bottom edge in pixels (exclusive)
    pub const fn max_y(&self) -> u32 {
        self.min_y + self.patch_size
    }

    /// Stable string identifier, `{brain}_{section}_{x}_{y}`
    pub fn id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.brain_id, self.section_id, self.min_x, self.min_y
        )
    }

    /// The four corners as the cross product {min_x, max_x} x {min_y, max_y}
    pub const fn corners(&self) -> [(u32, u32); 4] {
        [
            (self.min_x, self.min_y),
            (self.min_x, self.max_y()),
            (self.max_x(), self.min_y),
            (self.max_x(), self.max_y()),
        ]
    }

    /// Tile area in square pixels
    pub const fn area(&self) -> f64 {
        (self.patch_size as u64 * self.patch_size as u64) as f64
    }

    /// Closed polygon ring in the Y-flipped annotation frame
    ///
    /// Vertex order: (min_x, -max_y), (max_x, -max_y), (max_x, -min_y),
    /// (min_x, -min_y), closed back to the start.
    pub fn polygon(&self) -> MultiPolygon<f64> {
        let min_x = f64::from(self.min_x);
        let min_y = f64::from(self.min_y);
        let max_x = f64::from(self.max_x());
        let max_y = f64::from(self.max_y());
        ring_polygon(&[
            (min_x, -max_y),
            (max_x, -max_y),
            (max_x, -min_y),
            (min_x, -min_y),
            (min_x, -max_y),
        ])
    }

    /// True when both patches sit in the same section and share a corner
    ///
    /// At stride == patch size this gives 8-neighbor grid adjacency: tiles
    /// touching along an edge or at a single corner both count.
    pub fn adjacent(&self, other: &Self) -> bool {
        if self.brain_id != other.brain_id || self.section_id != other.section_id {
            return false;
        }
        let other_corners = other.corners();
        self.corners()
            .iter()
            .any(|corner| other_corners.contains(corner))
    }

    /// Pixel window of this patch as (row range, column range)
    ///
    /// # Errors
    ///
    /// Returns an `InvalidPatchSize` error when the window exceeds the given
    /// extent (width, height).
    pub fn window(&self, extent: (u32, u32)) -> Result<(std::ops::Range<u32>, std::ops::Range<u32>)> {
        let (width, height) = extent;
        if self.max_x() > width || self.max_y() > height {
            return Err(LabelingError::InvalidPatchSize {
                patch_size: self.patch_size,
                origin: (self.min_x, self.min_y),
                extent,
            });
        }
        Ok((self.min_y..self.max_y(), self.min_x..self.max_x()))
    }
}

impl PartialEq for Patch {
    fn eq(&self, other: &Self) -> bool {
        self.brain_id == other.brain_id
            && self.section_id == other.section_id
            && self.min_x == other.min_x
            && self.min_y == other.min_y
    }
}

impl Eq for Patch {}

impl Hash for Patch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.brain_id, self.section_id, self.min_x, self.min_y).hash(state);
    }
}

impl std::fmt::Display for Patch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} : ({}, {})",
            self.brain_id, self.section_id, self.min_x, self.min_y
        )
    }
}

/// Generate the ordered patch grid covering a section extent
///
/// Origins step by `stride` along x (outer loop) then y (inner loop), so the
/// construction index is stable and matches the label table's row order.
/// Tiles at the far edges may overhang the extent; for any stride no larger
/// than the patch size the union of tiles covers every pixel.
///
/// # Errors
///
/// Returns an `InvalidParameter` error for a zero extent, zero stride or
/// patch size, or a stride larger than the patch size (which would leave
/// uncovered gaps between tiles).
pub fn generate_grid(
    brain_id: u32,
    section_id: u32,
    width: u32,
    height: u32,
    patch_size: u32,
    stride: u32,
) -> Result<Vec<Patch>> {
    if width == 0 || height == 0 {
        return Err(invalid_parameter(
            "extent",
            &format!("{width}x{height}"),
            &"image extent must be positive in both dimensions",
        ));
    }
    if stride == 0 {
        return Err(invalid_parameter(
            "stride",
            &stride,
            &"stride must be positive",
        ));
    }
    if stride > patch_size {
        return Err(invalid_parameter(
            "stride",
            &stride,
            &format!("stride larger than patch size {patch_size} leaves coverage gaps"),
        ));
    }

    let mut patches = Vec::new();
    let mut x = 0;
    while x < width {
        let mut y = 0;
        while y < height {
            patches.push(Patch::new(brain_id, section_id, x, y, patch_size)?);
            y += stride;
        }
        x += stride;
    }
    Ok(patches)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;
    use crate::spatial::geometry::unsigned_area;

    #[test]
    fn test_corners_are_min_max_cross_product() {
        let patch = Patch::new(141, 349, 512, 1024, 1024).unwrap();
        let corners = patch.corners();
        for x in [512, 1536] {
            for y in [1024, 2048] {
                assert!(corners.contains(&(x, y)), "missing corner ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_polygon_lives_in_y_flipped_frame() {
        let patch = Patch::new(1, 1, 0, 0, 1024).unwrap();
        let polygon = patch.polygon();
        assert!((unsigned_area(&polygon) - patch.area()).abs() < 1e-9);
        let first = polygon
            .iter()
            .next()
            .and_then(|p| p.exterior().0.first().copied())
            .unwrap();
        assert_eq!((first.x, first.y), (0.0, -1024.0));
    }

    #[test]
    fn test_adjacency_is_symmetric_for_edge_and_corner_neighbors() {
        let a = Patch::new(1, 1, 0, 0, 1024).unwrap();
        let edge = Patch::new(1, 1, 0, 1024, 1024).unwrap();
        let corner = Patch::new(1, 1, 1024, 1024, 1024).unwrap();
        assert!(a.adjacent(&edge) && edge.adjacent(&a));
        assert!(a.adjacent(&corner) && corner.adjacent(&a));
    }

    #[test]
    fn test_patches_in_different_sections_are_never_adjacent() {
        let a = Patch::new(1, 1, 0, 0, 1024).unwrap();
        let b = Patch::new(1, 2, 0, 1024, 1024).unwrap();
        assert!(!a.adjacent(&b));
    }

    #[test]
    fn test_equality_ignores_patch_size() {
        let a = Patch::new(1, 1, 0, 0, 1024).unwrap();
        let b = Patch::new(1, 1, 0, 0, 512).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_grid_covers_extent_without_gaps() {
        let patches = generate_grid(1, 1, 2048, 2048, 1024, 512).unwrap();
        // Every pixel must fall inside at least one tile
        for (px, py) in [(0, 0), (2047, 2047), (1023, 1536), (1536, 100)] {
            assert!(
                patches.iter().any(|p| px >= p.min_x
                    && px < p.max_x()
                    && py >= p.min_y
                    && py < p.max_y()),
                "pixel ({px}, {py}) not covered"
            );
        }
    }

    #[test]
    fn test_grid_order_is_x_outer_y_inner() {
        let patches = generate_grid(1, 1, 2048, 2048, 1024, 1024).unwrap();
        let origins: Vec<(u32, u32)> = patches.iter().map(|p| (p.min_x, p.min_y)).collect();
        assert_eq!(origins, vec![(0, 0), (0, 1024), (1024, 0), (1024, 1024)]);
    }

    #[test]
    fn test_grid_rejects_stride_larger_than_patch_size() {
        assert!(generate_grid(1, 1, 2048, 2048, 512, 1024).is_err());
    }

    #[test]
    fn test_window_rejects_overhanging_patch() {
        let patch = Patch::new(1, 1, 1536, 0, 1024).unwrap();
        let err = patch.window((2048, 2048)).unwrap_err();
        assert!(matches!(err, LabelingError::InvalidPatchSize { .. }));
    }
}
