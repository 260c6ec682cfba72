//! Runtime configuration defaults shared by the pipeline and CLI

/// Default tile side length in pixels
pub const DEFAULT_PATCH_SIZE: u32 = 1024;

/// Default spacing between successive patch origins
pub const DEFAULT_STRIDE: u32 = 512;

/// Default rounding unit for intersection discretization, in pixels
pub const DEFAULT_GRANULARITY: f64 = 1.0;

/// Bands expected in a full foreground patch window
pub const EXPECTED_BANDS: usize = 3;

/// File extension of annotation documents
pub const ANNOTATION_EXTENSION: &str = "geojson";

/// Width of the batch progress bar in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;
