//! Annotation document parsing and region attribute canonicalization
//!
//! An annotation document is a JSON object with a `rotation` field and a
//! `features` list. Each feature carries a geometry and a free-form property
//! bag; in the hand-annotation tooling's export the bag is a JSON string
//! nested under `properties.data`, so both the nested-string and
//! plain-object forms are accepted here.
//!
//! Property keys are canonicalized once per document: the key `id` becomes
//! `region_id`, and any key containing a space is truncated to the substring
//! before the first space (the annotation tool embeds its enum values in key
//! names, e.g. `type (gray matter/fiber tract/...)`).

use crate::io::error::{Result, invalid_annotation};
use geo::{LineString, MultiPolygon, Polygon};
use serde_json::{Map, Value};
use std::fmt;

/// Sentinel for region attributes absent from the property bag
pub const UNKNOWN_ATTRIBUTE: &str = "unknown";

/// Canonicalized region identifier
///
/// Region ids arrive as JSON numbers or strings; both canonicalize to the
/// trimmed decimal string so that `8` and `"8"` name the same region.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(String);

impl RegionId {
    /// Create a region id from its canonical string form
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_owned())
    }

    /// Canonical string form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonicalize a JSON value into a region id, if possible
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u32> for RegionId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

/// Fixed attribute record for one region
///
/// The documented optional-field set of the property bag, parsed once and
/// validated. Missing fields read back as the [`UNKNOWN_ATTRIBUTE`] sentinel
/// instead of being silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionAttributes {
    /// Canonical region identifier (the only mandatory field)
    pub region_id: RegionId,
    name: Option<String>,
    acronym: Option<String>,
    region_type: Option<String>,
    parent_id: Option<String>,
    color: Option<String>,
}

impl RegionAttributes {
    /// Build an attribute record with only the mandatory id
    pub const fn bare(region_id: RegionId) -> Self {
        Self {
            region_id,
            name: None,
            acronym: None,
            region_type: None,
            parent_id: None,
            color: None,
        }
    }

    /// Display name, or the unknown sentinel
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_ATTRIBUTE)
    }

    /// Acronym, or the unknown sentinel
    pub fn acronym(&self) -> &str {
        self.acronym.as_deref().unwrap_or(UNKNOWN_ATTRIBUTE)
    }

    /// Structure type (gray matter, fiber tract, ...), or the unknown sentinel
    pub fn region_type(&self) -> &str {
        self.region_type.as_deref().unwrap_or(UNKNOWN_ATTRIBUTE)
    }

    /// Parent structure id, or the unknown sentinel
    pub fn parent_id(&self) -> &str {
        self.parent_id.as_deref().unwrap_or(UNKNOWN_ATTRIBUTE)
    }

    /// Display color hex triplet, or the unknown sentinel
    pub fn color(&self) -> &str {
        self.color.as_deref().unwrap_or(UNKNOWN_ATTRIBUTE)
    }
}

/// One parsed feature: a region geometry plus its attribute record
#[derive(Debug, Clone)]
pub struct AnnotationFeature {
    /// Region geometry in annotation coordinates (not yet rotated)
    pub geometry: MultiPolygon<f64>,
    /// Canonicalized attribute record
    pub attributes: RegionAttributes,
}

/// Parsed annotation document
///
/// Features with null, missing, or non-area geometry are dropped during
/// parsing, matching the upstream behavior of discarding unparseable rows.
#[derive(Debug, Clone)]
pub struct AnnotationDocument {
    /// Raw rotation field from the document
    pub rotation: i64,
    /// Surviving features in document order
    pub features: Vec<AnnotationFeature>,
}

/// Canonicalize one property key
///
/// `id` maps to `region_id`; a key containing a space truncates to the
/// substring before the first space; everything else passes through.
pub fn canonicalize_key(key: &str) -> String {
    if key == "id" {
        return "region_id".to_owned();
    }
    match key.split_once(' ') {
        Some((prefix, _)) => prefix.to_owned(),
        None => key.to_owned(),
    }
}

impl AnnotationDocument {
    /// Parse an annotation document from JSON text
    ///
    /// # Errors
    ///
    /// Returns an `InvalidAnnotation` error when the text is not valid JSON,
    /// the top level is not an object, the `features` field is missing or
    /// not a list, or the `rotation` field is missing.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| invalid_annotation(format!("not valid JSON: {err}")))?;
        Self::from_value(&value)
    }

    /// Parse an annotation document from an already-deserialized JSON value
    ///
    /// # Errors
    ///
    /// Same conditions as [`AnnotationDocument::parse`].
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(document) = value else {
            return Err(invalid_annotation("top level is not an object"));
        };
        let rotation = document
            .get("rotation")
            .and_then(Value::as_i64)
            .ok_or_else(|| invalid_annotation("missing or non-numeric 'rotation' field"))?;
        let Some(Value::Array(raw_features)) = document.get("features") else {
            return Err(invalid_annotation("missing or non-list 'features' field"));
        };

        // Union of property-bag keys across all features, in first-seen order
        let bags: Vec<Option<Map<String, Value>>> =
            raw_features.iter().map(property_bag).collect();
        let mut raw_keys: Vec<String> = Vec::new();
        for bag in bags.iter().flatten() {
            for key in bag.keys() {
                if !raw_keys.iter().any(|k| k == key) {
                    raw_keys.push(key.clone());
                }
            }
        }
        let key_map: Vec<(String, String)> = raw_keys
            .into_iter()
            .map(|raw| {
                let canonical = canonicalize_key(&raw);
                (raw, canonical)
            })
            .collect();

        let mut features = Vec::new();
        for (feature, bag) in raw_features.iter().zip(&bags) {
            let Some(geometry) = feature.get("geometry").and_then(parse_geometry) else {
                continue;
            };
            let Some(bag) = bag else {
                tracing::warn!("feature without a property bag dropped");
                continue;
            };
            let Some(attributes) = attributes_from_bag(bag, &key_map) else {
                tracing::warn!("feature without a region id dropped");
                continue;
            };
            features.push(AnnotationFeature {
                geometry,
                attributes,
            });
        }
        Ok(Self { rotation, features })
    }
}

/// Extract the free-form property bag from one feature
///
/// Accepts the nested `properties.data` JSON-string form produced by the
/// annotation tool as well as a plain `properties` object.
fn property_bag(feature: &Value) -> Option<Map<String, Value>> {
    let properties = feature.get("properties")?.as_object()?;
    match properties.get("data") {
        Some(Value::String(nested)) => serde_json::from_str::<Value>(nested)
            .ok()?
            .as_object()
            .cloned(),
        Some(Value::Object(nested)) => Some(nested.clone()),
        _ => Some(properties.clone()),
    }
}

/// Read the bag value whose canonicalized key equals `canonical`, first match
/// wins
fn canonical_value<'bag>(
    bag: &'bag Map<String, Value>,
    key_map: &[(String, String)],
    canonical: &str,
) -> Option<&'bag Value> {
    key_map
        .iter()
        .find(|(raw, canon)| canon == canonical && bag.contains_key(raw))
        .and_then(|(raw, _)| bag.get(raw))
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn attributes_from_bag(
    bag: &Map<String, Value>,
    key_map: &[(String, String)],
) -> Option<RegionAttributes> {
    let region_id = RegionId::from_value(canonical_value(bag, key_map, "region_id")?)?;
    let field = |canonical: &str| canonical_value(bag, key_map, canonical).and_then(value_to_string);
    Some(RegionAttributes {
        region_id,
        name: field("name"),
        acronym: field("acronym"),
        region_type: field("type"),
        parent_id: field("parent_structure_id"),
        color: field("color_hex_triplet"),
    })
}

/// Parse a GeoJSON-style geometry value into a polygon set
///
/// Returns `None` for null, missing, malformed, or non-area geometry; the
/// caller drops such rows.
fn parse_geometry(value: &Value) -> Option<MultiPolygon<f64>> {
    let object = value.as_object()?;
    let geometry_type = object.get("type")?.as_str()?;
    let coordinates = object.get("coordinates")?;
    match geometry_type {
        "Polygon" => parse_polygon(coordinates).map(|p| MultiPolygon::new(vec![p])),
        "MultiPolygon" => {
            let polygons: Option<Vec<Polygon<f64>>> =
                coordinates.as_array()?.iter().map(parse_polygon).collect();
            let polygons = polygons?;
            (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

fn parse_polygon(coordinates: &Value) -> Option<Polygon<f64>> {
    let rings = coordinates.as_array()?;
    let mut parsed: Vec<LineString<f64>> = Vec::with_capacity(rings.len());
    for ring in rings {
        let points: Option<Vec<(f64, f64)>> = ring.as_array()?.iter().map(parse_point).collect();
        parsed.push(LineString::from(points?));
    }
    let mut iter = parsed.into_iter();
    let exterior = iter.next()?;
    if exterior.0.len() < 4 {
        return None;
    }
    Some(Polygon::new(exterior, iter.collect()))
}

fn parse_point(value: &Value) -> Option<(f64, f64)> {
    let pair = value.as_array()?;
    let x = pair.first()?.as_f64()?;
    let y = pair.get(1)?.as_f64()?;
    Some((x, y))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonicalize_key_rules() {
        assert_eq!(canonicalize_key("id"), "region_id");
        assert_eq!(
            canonicalize_key("type (gray matter/fiber tract/CNS cavity)"),
            "type"
        );
        assert_eq!(canonicalize_key("acronym"), "acronym");
    }

    #[test]
    fn test_region_id_canonicalizes_numbers_and_strings() {
        assert_eq!(
            RegionId::from_value(&json!(8)),
            Some(RegionId::new("8"))
        );
        assert_eq!(
            RegionId::from_value(&json!(" 997 ")),
            Some(RegionId::new("997"))
        );
        assert_eq!(RegionId::from_value(&json!(null)), None);
    }

    #[test]
    fn test_parse_rejects_bare_array() {
        let err = AnnotationDocument::parse("[1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("not an object"));
    }

    #[test]
    fn test_parse_rejects_missing_rotation() {
        let doc = json!({ "features": [] });
        assert!(AnnotationDocument::from_value(&doc).is_err());
    }

    #[test]
    fn test_null_geometry_rows_are_dropped() {
        let doc = json!({
            "rotation": 0,
            "features": [
                {
                    "geometry": null,
                    "properties": { "data": { "id": 1 } }
                },
                {
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [4.0, 0.0], [4.0, -4.0], [0.0, -4.0], [0.0, 0.0]]]
                    },
                    "properties": { "data": { "id": 2, "name": "cortex" } }
                }
            ]
        });
        let parsed = AnnotationDocument::from_value(&doc).unwrap();
        assert_eq!(parsed.features.len(), 1);
        assert_eq!(parsed.features[0].attributes.region_id, RegionId::new("2"));
        assert_eq!(parsed.features[0].attributes.name(), "cortex");
    }

    #[test]
    fn test_nested_data_string_form_is_accepted() {
        let doc = json!({
            "rotation": 90,
            "features": [{
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, -2.0], [0.0, -2.0], [0.0, 0.0]]]
                },
                "properties": {
                    "data": "{\"id\": 5, \"type (gray matter/fiber tract)\": \"gray matter\"}"
                }
            }]
        });
        let parsed = AnnotationDocument::from_value(&doc).unwrap();
        assert_eq!(parsed.features.len(), 1);
        let attrs = &parsed.features[0].attributes;
        assert_eq!(attrs.region_id, RegionId::new("5"));
        assert_eq!(attrs.region_type(), "gray matter");
    }

    #[test]
    fn test_missing_attributes_read_as_unknown_sentinel() {
        let attrs = RegionAttributes::bare(RegionId::new("7"));
        assert_eq!(attrs.name(), UNKNOWN_ATTRIBUTE);
        assert_eq!(attrs.acronym(), UNKNOWN_ATTRIBUTE);
        assert_eq!(attrs.parent_id(), UNKNOWN_ATTRIBUTE);
        assert_eq!(attrs.color(), UNKNOWN_ATTRIBUTE);
    }
}
