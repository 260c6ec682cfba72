//! Label table: one row per patch, one float column per canonical region
//!
//! The ratio matrix is dense with a 0.0 default, so columns for regions
//! absent from a section are present and zero rather than missing. Rows and
//! the patch collection are removed together by the QC pass, preserving the
//! 1:1 index correspondence.

use crate::graph::RegionId;
use crate::io::error::{Result, invalid_parameter};
use crate::io::nomenclature::Nomenclature;
use crate::labeling::weights::PatchLabels;
use ndarray::{Array2, Axis};

/// Dense per-section label table
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    columns: Vec<RegionId>,
    ratios: Array2<f64>,
    records: Vec<PatchLabels>,
}

impl LabelTable {
    /// Assemble the table from per-patch label records
    ///
    /// Column order follows the nomenclature; record ratios for region ids
    /// outside the nomenclature stay in the record but get no column.
    pub fn from_records(nomenclature: &Nomenclature, records: Vec<PatchLabels>) -> Self {
        let columns: Vec<RegionId> = nomenclature.ids().to_vec();
        let mut ratios = Array2::zeros((records.len(), columns.len()));
        for (row, record) in records.iter().enumerate() {
            for (region_id, &ratio) in &record.ratios {
                if let Some(col) = nomenclature.column(region_id) {
                    if let Some(cell) = ratios.get_mut((row, col)) {
                        *cell = ratio;
                    }
                }
            }
        }
        Self {
            columns,
            ratios,
            records,
        }
    }

    /// Number of rows (retained patches)
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Number of region columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Region ids in column order
    pub fn columns(&self) -> &[RegionId] {
        &self.columns
    }

    /// The dense ratio matrix, rows in patch order
    pub fn ratios(&self) -> &Array2<f64> {
        &self.ratios
    }

    /// Label record for one row
    pub fn record(&self, row: usize) -> Option<&PatchLabels> {
        self.records.get(row)
    }

    /// Ratio cell for one row and region id (0.0 when the region has a
    /// column but no coverage)
    pub fn ratio(&self, row: usize, region_id: &RegionId) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == region_id)?;
        self.ratios.get((row, col)).copied()
    }

    /// Sum of the region columns in one row
    pub fn row_total(&self, row: usize) -> f64 {
        self.ratios.row(row).sum()
    }

    /// Divide every nonzero ratio in a row by `total`, in both the matrix
    /// and the backing record
    pub fn rescale_row(&mut self, row: usize, total: f64) {
        if total <= 0.0 {
            return;
        }
        self.ratios.row_mut(row).mapv_inplace(|v| v / total);
        if let Some(record) = self.records.get_mut(row) {
            record.rescale(total);
        }
    }

    /// Keep only the given rows, in the given order
    ///
    /// # Errors
    ///
    /// Returns an `InvalidParameter` error when an index is out of bounds.
    pub fn retain_rows(&mut self, keep: &[usize]) -> Result<()> {
        if let Some(&bad) = keep.iter().find(|&&row| row >= self.records.len()) {
            return Err(invalid_parameter(
                "keep",
                &bad,
                &format!("row index out of bounds for {} rows", self.records.len()),
            ));
        }
        self.ratios = self.ratios.select(Axis(0), keep);
        let mut kept = Vec::with_capacity(keep.len());
        for &row in keep {
            if let Some(record) = self.records.get(row) {
                kept.push(record.clone());
            }
        }
        self.records = kept;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;
    use std::collections::BTreeMap;

    fn record(ratios: &[(&str, f64)]) -> PatchLabels {
        PatchLabels {
            labels: ratios.iter().map(|(id, _)| RegionId::new(*id)).collect(),
            ratios: ratios
                .iter()
                .map(|(id, r)| (RegionId::new(*id), *r))
                .collect::<BTreeMap<_, _>>(),
            geometries: BTreeMap::new(),
        }
    }

    fn nomenclature() -> Nomenclature {
        Nomenclature::from_ids(["8", "112", "997"]).unwrap()
    }

    #[test]
    fn test_unset_cells_default_to_zero() {
        let table = LabelTable::from_records(&nomenclature(), vec![record(&[("112", 0.4)])]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.ratio(0, &RegionId::new("8")), Some(0.0));
        assert_eq!(table.ratio(0, &RegionId::new("112")), Some(0.4));
        assert!((table.row_total(0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_ids_outside_nomenclature_get_no_column() {
        let table =
            LabelTable::from_records(&nomenclature(), vec![record(&[("8", 0.3), ("999", 0.5)])]);
        assert!((table.row_total(0) - 0.3).abs() < 1e-12);
        assert_eq!(table.ratio(0, &RegionId::new("999")), None);
        // The record itself still remembers the off-nomenclature label
        assert_eq!(
            table.record(0).map(|r| r.ratios.len()),
            Some(2)
        );
    }

    #[test]
    fn test_rescale_row_updates_matrix_and_record() {
        let mut table =
            LabelTable::from_records(&nomenclature(), vec![record(&[("8", 0.6), ("997", 0.6)])]);
        let total = table.row_total(0);
        table.rescale_row(0, total);
        assert!((table.row_total(0) - 1.0).abs() < 1e-12);
        let record_total = table.record(0).map(PatchLabels::total).unwrap();
        assert!((record_total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_retain_rows_keeps_alignment() {
        let mut table = LabelTable::from_records(
            &nomenclature(),
            vec![
                record(&[("8", 0.1)]),
                record(&[("112", 0.2)]),
                record(&[("997", 0.3)]),
            ],
        );
        table.retain_rows(&[0, 2]).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.ratio(1, &RegionId::new("997")), Some(0.3));
        assert!(table.retain_rows(&[5]).is_err());
    }
}
