//! Input/output: errors, configuration, pixel stores, nomenclature, export,
//! progress display, and the CLI

/// Command-line interface and batch orchestration
pub mod cli;
/// Runtime configuration defaults
pub mod configuration;
/// Error types and result alias
pub mod error;
/// CSV export of section tables
pub mod export;
/// Canonical region-id reference
pub mod nomenclature;
/// Batch progress display
pub mod progress;
/// Pixel stores and window reads
pub mod store;

pub use error::{LabelingError, Result};
pub use nomenclature::Nomenclature;
pub use store::{ArrayStore, ImageFileStore, PixelStore};
