//! Polygon helpers shared by the spatial index, graph builder, and labeling
//!
//! All geometric work in the crate funnels through this module so that
//! degenerate input is handled in exactly one place: cheap validation first,
//! and a panic guard around the boolean kernel as a safety net. Callers get a
//! `GeometryOperation` error and decide whether to swallow it (labeling,
//! adjacency) or propagate it.

use crate::io::error::{Result, geometry_error};
use geo::{Area, BooleanOps, Coord, Intersects, LineString, MapCoords, MultiPolygon, Point, Polygon, Rotate, Translate};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Check a geometry for structural defects before handing it to the
/// boolean kernel
///
/// Rejects rings with fewer than four coordinates (a closed triangle needs
/// four) and any non-finite coordinate. Deeper degeneracy, such as a
/// self-intersecting ring the validation cannot see, is caught by the panic
/// guard in [`intersection`].
///
/// # Errors
///
/// Returns a `GeometryOperation` error naming the defect.
pub fn validate(geometry: &MultiPolygon<f64>) -> Result<()> {
    for polygon in geometry {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            if ring.0.len() < 4 {
                return Err(geometry_error(
                    "validate",
                    format!("ring has only {} coordinates", ring.0.len()),
                ));
            }
            for coord in &ring.0 {
                if !coord.x.is_finite() || !coord.y.is_finite() {
                    return Err(geometry_error(
                        "validate",
                        format!("non-finite coordinate ({}, {})", coord.x, coord.y),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Geometric intersection of two polygon sets with degenerate-input protection
///
/// # Errors
///
/// Returns a `GeometryOperation` error if either operand fails validation or
/// the boolean kernel faults on it.
pub fn intersection(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    validate(a)?;
    validate(b)?;
    match catch_unwind(AssertUnwindSafe(|| a.intersection(b))) {
        Ok(shared) => Ok(shared),
        Err(_panic) => Err(geometry_error(
            "intersection",
            "boolean kernel fault on degenerate input",
        )),
    }
}

/// Total unsigned area of a polygon set
pub fn unsigned_area(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.unsigned_area()
}

/// Snap every vertex to the nearest multiple of `granularity`
///
/// Suppresses floating-point sliver artifacts left behind by the boolean
/// intersection. Rounding is `f64::round` (ties away from zero); the unit is
/// caller-configurable because the upstream data pipeline never pinned one
/// down beyond "about a pixel".
pub fn discretize(geometry: &MultiPolygon<f64>, granularity: f64) -> MultiPolygon<f64> {
    geometry.map_coords(|coord| Coord {
        x: (coord.x / granularity).round() * granularity,
        y: (coord.y / granularity).round() * granularity,
    })
}

/// Translate a polygon set by the given offsets
pub fn translate(geometry: &MultiPolygon<f64>, x_offset: f64, y_offset: f64) -> MultiPolygon<f64> {
    geometry.translate(x_offset, y_offset)
}

/// Rotate a polygon set about an arbitrary pivot point, in degrees
pub fn rotate_about(
    geometry: &MultiPolygon<f64>,
    degrees: f64,
    pivot: (f64, f64),
) -> MultiPolygon<f64> {
    geometry.rotate_around_point(degrees, Point::new(pivot.0, pivot.1))
}

/// Build a closed polygon from an exterior ring of coordinate pairs
///
/// The ring is closed automatically if the last coordinate does not repeat
/// the first.
pub fn ring_polygon(ring: &[(f64, f64)]) -> MultiPolygon<f64> {
    let exterior = LineString::from(ring.to_vec());
    MultiPolygon::new(vec![Polygon::new(exterior, Vec::new())])
}

/// True when the two geometries share at least one point
pub fn intersects(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    a.intersects(b)
}

/// True when the geometries touch only at their boundaries
///
/// # Errors
///
/// Returns a `GeometryOperation` error when the interior test cannot be
/// computed on degenerate input.
pub fn touches(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<bool> {
    if !a.intersects(b) {
        return Ok(false);
    }
    // Boundary contact has an empty-interior intersection
    let shared = intersection(a, b)?;
    Ok(shared.unsigned_area() == 0.0)
}

/// True when the geometries share interior area without either containing
/// the other
///
/// # Errors
///
/// Returns a `GeometryOperation` error when the area test cannot be computed
/// on degenerate input.
pub fn overlaps(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<bool> {
    let shared_area = intersection(a, b)?.unsigned_area();
    if shared_area == 0.0 {
        return Ok(false);
    }
    let area_a = a.unsigned_area();
    let area_b = b.unsigned_area();
    Ok(shared_area < area_a && shared_area < area_b)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn unit_square(origin: (f64, f64), side: f64) -> MultiPolygon<f64> {
        let (x, y) = origin;
        ring_polygon(&[
            (x, y),
            (x + side, y),
            (x + side, y + side),
            (x, y + side),
            (x, y),
        ])
    }

    #[test]
    fn test_intersection_of_overlapping_squares() {
        let a = unit_square((0.0, 0.0), 2.0);
        let b = unit_square((1.0, 1.0), 2.0);
        let shared = intersection(&a, &b).unwrap();
        assert!((unsigned_area(&shared) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_non_finite_coordinates() {
        let bad = ring_polygon(&[(0.0, 0.0), (1.0, f64::NAN), (1.0, 1.0), (0.0, 0.0)]);
        assert!(validate(&bad).is_err());
    }

    #[test]
    fn test_validate_rejects_short_ring() {
        let bad = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]),
            Vec::new(),
        )]);
        assert!(validate(&bad).is_err());
    }

    #[test]
    fn test_discretize_snaps_sliver_vertices() {
        let sliver = ring_polygon(&[
            (0.000_001, 0.0),
            (4.000_001, 0.0),
            (4.0, 3.999_999),
            (0.0, 4.0),
            (0.000_001, 0.0),
        ]);
        let snapped = discretize(&sliver, 1.0);
        assert!((unsigned_area(&snapped) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_discretize_honors_granularity() {
        let geometry = ring_polygon(&[(0.2, 0.0), (4.3, 0.0), (4.3, 4.2), (0.2, 4.2), (0.2, 0.0)]);
        let snapped = discretize(&geometry, 0.5);
        for polygon in &snapped {
            for coord in &polygon.exterior().0 {
                assert!((coord.x * 2.0 - (coord.x * 2.0).round()).abs() < 1e-9);
                assert!((coord.y * 2.0 - (coord.y * 2.0).round()).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_touches_for_edge_sharing_squares() {
        let a = unit_square((0.0, 0.0), 1.0);
        let b = unit_square((1.0, 0.0), 1.0);
        assert!(touches(&a, &b).unwrap());
        assert!(!overlaps(&a, &b).unwrap());
    }

    #[test]
    fn test_overlaps_for_partially_covering_squares() {
        let a = unit_square((0.0, 0.0), 2.0);
        let b = unit_square((1.0, 1.0), 2.0);
        assert!(overlaps(&a, &b).unwrap());
        assert!(!touches(&a, &b).unwrap());
    }

    #[test]
    fn test_containment_is_not_overlap() {
        let outer = unit_square((0.0, 0.0), 4.0);
        let inner = unit_square((1.0, 1.0), 1.0);
        assert!(!overlaps(&outer, &inner).unwrap());
        assert!(intersects(&outer, &inner));
    }

    #[test]
    fn test_rotation_about_pivot_preserves_area() {
        let square = unit_square((2.0, -6.0), 2.0);
        let rotated = rotate_about(&square, -90.0, (4.0, -4.0));
        assert!((unsigned_area(&rotated) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_translate_moves_ring() {
        let square = unit_square((3.0, -2.0), 1.0);
        let moved = translate(&square, -3.0, 2.0);
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        for polygon in &moved {
            for coord in &polygon.exterior().0 {
                min_x = min_x.min(coord.x);
                min_y = min_y.min(coord.y);
            }
        }
        assert!((min_x - 0.0).abs() < 1e-9);
        assert!((min_y - 0.0).abs() < 1e-9);
    }
}
