//! Error types for annotation parsing, geometry operations, and pixel access

use std::fmt;
use std::path::PathBuf;

/// Main error type for all labeling operations
#[derive(Debug)]
pub enum LabelingError {
    /// Annotation document is malformed or absent
    ///
    /// Recoverable: the section proceeds with zero region labels and the
    /// `no_geojson` flag set in the output table.
    InvalidAnnotation {
        /// Description of what's wrong with the document
        reason: String,
    },

    /// A patch's coordinate window exceeds the available image extent
    InvalidPatchSize {
        /// Side length of the offending patch
        patch_size: u32,
        /// Patch origin (min_x, min_y)
        origin: (u32, u32),
        /// Available image extent (width, height)
        extent: (u32, u32),
    },

    /// Degenerate or self-intersecting polygon encountered during an
    /// intersection or adjacency query
    ///
    /// Recoverable: the offending region contributes ratio 0 (labeling) or
    /// zero edges (graph construction) and processing continues.
    GeometryOperation {
        /// Name of the geometric operation that failed
        operation: &'static str,
        /// Description of the failure
        detail: String,
    },

    /// The image store has no usable data for a requested section
    ImageNotFound {
        /// Brain identifier
        brain_id: u32,
        /// Section identifier
        section_id: u32,
        /// Why the section could not be read
        reason: String,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// JSON document could not be parsed
    Json {
        /// Underlying serde error
        source: serde_json::Error,
    },

    /// Failed to load a section image from the filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl fmt::Display for LabelingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAnnotation { reason } => {
                write!(f, "Invalid annotation document: {reason}")
            }
            Self::InvalidPatchSize {
                patch_size,
                origin,
                extent,
            } => {
                write!(
                    f,
                    "Patch size {patch_size}x{patch_size} at ({}, {}) is invalid for image extent {}x{}",
                    origin.0, origin.1, extent.0, extent.1
                )
            }
            Self::GeometryOperation { operation, detail } => {
                write!(f, "Geometry operation '{operation}' failed: {detail}")
            }
            Self::ImageNotFound {
                brain_id,
                section_id,
                reason,
            } => {
                write!(
                    f,
                    "No image data for brain {brain_id} section {section_id}: {reason}"
                )
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::Json { source } => {
                write!(f, "Failed to parse JSON document: {source}")
            }
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for LabelingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json { source } => Some(source),
            Self::ImageLoad { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for labeling results
pub type Result<T> = std::result::Result<T, LabelingError>;

impl From<serde_json::Error> for LabelingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json { source: err }
    }
}

impl From<std::io::Error> for LabelingError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid annotation error
pub fn invalid_annotation(reason: impl Into<String>) -> LabelingError {
    LabelingError::InvalidAnnotation {
        reason: reason.into(),
    }
}

/// Create a geometry operation error
pub fn geometry_error(operation: &'static str, detail: impl Into<String>) -> LabelingError {
    LabelingError::GeometryOperation {
        operation,
        detail: detail.into(),
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> LabelingError {
    LabelingError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn test_display_invalid_patch_size() {
        let err = LabelingError::InvalidPatchSize {
            patch_size: 1024,
            origin: (2048, 0),
            extent: (2048, 2048),
        };
        let msg = err.to_string();
        assert!(msg.contains("1024x1024"));
        assert!(msg.contains("2048x2048"));
    }

    #[test]
    fn test_geometry_error_carries_operation_name() {
        let err = geometry_error("intersection", "self-intersecting ring");
        match err {
            LabelingError::GeometryOperation { operation, .. } => {
                assert_eq!(operation, "intersection");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }
}
