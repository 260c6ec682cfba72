//! CSV serialization of the per-section output table
//!
//! Persistence beyond a local file (database sync, tensor conversion) is
//! owned by downstream collaborators; the contract here ends at a CSV whose
//! header is the metadata columns followed by the canonical region ids.

use crate::io::error::{LabelingError, Result};
use crate::section::SectionTable;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write the table as CSV to any writer
///
/// # Errors
///
/// Returns a `FileSystem` error when writing fails.
pub fn write_csv(table: &SectionTable, writer: &mut impl Write) -> Result<()> {
    writeln!(writer, "{}", table.header().join(","))?;
    for row in 0..table.row_count() {
        if let Some(values) = table.row_values(row) {
            writeln!(writer, "{}", values.join(","))?;
        }
    }
    Ok(())
}

/// Write the table as a CSV file at `path`
///
/// # Errors
///
/// Returns a `FileSystem` error carrying the path when the file cannot be
/// created or written.
pub fn export_csv(table: &SectionTable, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|source| LabelingError::FileSystem {
        path: path.to_path_buf(),
        operation: "create",
        source,
    })?;
    let mut writer = BufWriter::new(file);
    write_csv(table, &mut writer).map_err(|err| match err {
        LabelingError::FileSystem { source, .. } => LabelingError::FileSystem {
            path: path.to_path_buf(),
            operation: "write",
            source,
        },
        other => other,
    })
}
