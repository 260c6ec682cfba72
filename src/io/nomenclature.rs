//! Nomenclature reference defining the canonical region-id column set
//!
//! Every section's label table carries one float column per canonical region
//! id, whether or not the region appears in that section. The reference is
//! an ordered id list, parsed either from the atlas nomenclature JSON (a
//! tree whose first node's children are the canonical regions) or built
//! directly from ids.

use crate::graph::RegionId;
use crate::io::error::{Result, invalid_parameter};
use serde_json::Value;
use std::collections::HashMap;

/// Ordered list of canonical region identifiers
#[derive(Debug, Clone, Default)]
pub struct Nomenclature {
    ids: Vec<RegionId>,
    index: HashMap<RegionId, usize>,
}

impl Nomenclature {
    /// Build a nomenclature from an ordered id list
    ///
    /// # Errors
    ///
    /// Returns an `InvalidParameter` error on duplicate ids.
    pub fn from_ids<I>(ids: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<RegionId>,
    {
        let mut ordered = Vec::new();
        let mut index = HashMap::new();
        for id in ids {
            let id = id.into();
            if index.insert(id.clone(), ordered.len()).is_some() {
                return Err(invalid_parameter(
                    "nomenclature",
                    &id,
                    &"duplicate region id",
                ));
            }
            ordered.push(id);
        }
        Ok(Self {
            ids: ordered,
            index,
        })
    }

    /// Parse the atlas nomenclature JSON
    ///
    /// Expected shape: `{"tree": [{"children": [{"id": ...}, ...]}]}`. The
    /// ordered children of the tree's first node define the column set.
    ///
    /// # Errors
    ///
    /// Returns a `Json` error for unparseable text, an `InvalidParameter`
    /// error when the tree shape is missing or ids are duplicated.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let children = value
            .get("tree")
            .and_then(|tree| tree.get(0))
            .and_then(|root| root.get("children"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                invalid_parameter(
                    "nomenclature",
                    &"<document>",
                    &"expected a tree with one root node carrying children",
                )
            })?;
        let ids: Vec<RegionId> = children
            .iter()
            .filter_map(|child| child.get("id").and_then(RegionId::from_value))
            .collect();
        if ids.is_empty() {
            return Err(invalid_parameter(
                "nomenclature",
                &"<document>",
                &"no region ids found under the tree root",
            ));
        }
        Self::from_ids(ids)
    }

    /// Number of canonical regions
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when the reference is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Canonical ids in column order
    pub fn ids(&self) -> &[RegionId] {
        &self.ids
    }

    /// Column position of a region id
    pub fn column(&self, id: &RegionId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// True when the id belongs to the canonical set
    pub fn contains(&self, id: &RegionId) -> bool {
        self.index.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_from_ids_preserves_order() {
        let nomenclature = Nomenclature::from_ids([8_u32, 997, 112]).unwrap();
        assert_eq!(nomenclature.len(), 3);
        assert_eq!(nomenclature.column(&RegionId::new("997")), Some(1));
        assert!(nomenclature.contains(&RegionId::new("112")));
        assert!(!nomenclature.contains(&RegionId::new("1")));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        assert!(Nomenclature::from_ids([8_u32, 8]).is_err());
    }

    #[test]
    fn test_parse_tree_document() {
        let text = r#"{
            "tree": [{
                "children": [
                    {"id": 8, "name": "Basic cell groups", "acronym": "grey"},
                    {"id": 997, "name": "root", "acronym": "root"}
                ]
            }]
        }"#;
        let nomenclature = Nomenclature::parse(text).unwrap();
        assert_eq!(nomenclature.ids().len(), 2);
        assert_eq!(nomenclature.column(&RegionId::new("8")), Some(0));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(Nomenclature::parse(r#"{"regions": []}"#).is_err());
    }
}
