//! Pixel access for section images via rectangular window reads
//!
//! The labeling core never decodes imagery itself; it only needs the image
//! extent and, for the optional background check, square window reads keyed
//! by (row range, column range[, band]). A window beyond the available
//! extent is the size-mismatch signal the core consumes as
//! `InvalidPatchSize`.

use crate::io::configuration::EXPECTED_BANDS;
use crate::io::error::{LabelingError, Result, invalid_parameter};
use crate::spatial::Patch;
use ndarray::{Array3, s};
use std::ops::Range;
use std::path::Path;

/// Read-only pixel source for one section image
pub trait PixelStore: Send + Sync {
    /// Image extent as (width, height) in pixels
    fn extent(&self) -> (u32, u32);

    /// Number of bands per pixel
    fn bands(&self) -> usize;

    /// Read a rectangular window, optionally restricted to one band
    ///
    /// # Errors
    ///
    /// Returns an `InvalidPatchSize` error when the window exceeds the
    /// available extent, or an `InvalidParameter` error for an out-of-range
    /// band.
    fn read_window(
        &self,
        rows: Range<u32>,
        cols: Range<u32>,
        band: Option<usize>,
    ) -> Result<Array3<u8>>;
}

/// In-memory pixel store over an (height, width, bands) array
#[derive(Debug, Clone)]
pub struct ArrayStore {
    data: Array3<u8>,
}

impl ArrayStore {
    /// Wrap an (height, width, bands) array
    pub const fn new(data: Array3<u8>) -> Self {
        Self { data }
    }
}

impl PixelStore for ArrayStore {
    fn extent(&self) -> (u32, u32) {
        let (height, width, _) = self.data.dim();
        (width as u32, height as u32)
    }

    fn bands(&self) -> usize {
        self.data.dim().2
    }

    fn read_window(
        &self,
        rows: Range<u32>,
        cols: Range<u32>,
        band: Option<usize>,
    ) -> Result<Array3<u8>> {
        let (width, height) = self.extent();
        if rows.end > height || cols.end > width {
            let side = (rows.end - rows.start).max(cols.end - cols.start);
            return Err(LabelingError::InvalidPatchSize {
                patch_size: side,
                origin: (cols.start, rows.start),
                extent: (width, height),
            });
        }
        let (r0, r1) = (rows.start as usize, rows.end as usize);
        let (c0, c1) = (cols.start as usize, cols.end as usize);
        let Some(b) = band else {
            return Ok(self.data.slice(s![r0..r1, c0..c1, ..]).to_owned());
        };
        if b >= self.bands() {
            return Err(invalid_parameter(
                "band",
                &b,
                &format!("store has {} bands", self.bands()),
            ));
        }
        Ok(self.data.slice(s![r0..r1, c0..c1, b..=b]).to_owned())
    }
}

/// Pixel store backed by an image file on disk
pub struct ImageFileStore {
    inner: ArrayStore,
}

impl ImageFileStore {
    /// Load a section image into memory as an RGB store
    ///
    /// # Errors
    ///
    /// Returns an `ImageLoad` error when the file cannot be decoded.
    pub fn open(path: &Path) -> Result<Self> {
        let decoded = image::open(path).map_err(|source| LabelingError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let rgb = decoded.to_rgb8();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        let data = Array3::from_shape_vec((height, width, EXPECTED_BANDS), rgb.into_raw())
            .map_err(|err| invalid_parameter("image", &path.display(), &err))?;
        Ok(Self {
            inner: ArrayStore::new(data),
        })
    }
}

impl PixelStore for ImageFileStore {
    fn extent(&self) -> (u32, u32) {
        self.inner.extent()
    }

    fn bands(&self) -> usize {
        self.inner.bands()
    }

    fn read_window(
        &self,
        rows: Range<u32>,
        cols: Range<u32>,
        band: Option<usize>,
    ) -> Result<Array3<u8>> {
        self.inner.read_window(rows, cols, band)
    }
}

/// Read the pixel block under one patch
///
/// # Errors
///
/// Returns an `InvalidPatchSize` error when the patch overhangs the store's
/// extent.
pub fn read_patch(store: &dyn PixelStore, patch: &Patch) -> Result<Array3<u8>> {
    let (rows, cols) = patch.window(store.extent())?;
    store.read_window(rows, cols, None)
}

/// Background-check flags for a patch collection
///
/// A patch is flagged (1) when its window overhangs the extent or its pixel
/// block is not (patch_size, patch_size, 3); such tiles cannot hold a full
/// foreground patch. Unflagged tiles read back 0.
pub fn background_flags(store: &dyn PixelStore, patches: &[Patch]) -> Vec<u8> {
    patches
        .iter()
        .map(|patch| match read_patch(store, patch) {
            Ok(block) => {
                let side = patch.patch_size as usize;
                u8::from(block.dim() != (side, side, EXPECTED_BANDS))
            }
            Err(_) => 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn store(width: usize, height: usize) -> ArrayStore {
        ArrayStore::new(Array3::zeros((height, width, 3)))
    }

    #[test]
    fn test_window_read_within_extent() {
        let store = store(64, 64);
        let block = store.read_window(0..16, 8..24, None).unwrap();
        assert_eq!(block.dim(), (16, 16, 3));
    }

    #[test]
    fn test_single_band_read() {
        let store = store(32, 32);
        let block = store.read_window(0..8, 0..8, Some(1)).unwrap();
        assert_eq!(block.dim(), (8, 8, 1));
        assert!(store.read_window(0..8, 0..8, Some(5)).is_err());
    }

    #[test]
    fn test_window_beyond_extent_signals_invalid_patch_size() {
        let store = store(64, 64);
        let err = store.read_window(0..128, 0..128, None).unwrap_err();
        assert!(matches!(err, LabelingError::InvalidPatchSize { .. }));
    }

    #[test]
    fn test_read_patch_respects_patch_window() {
        let store = store(2048, 2048);
        let inside = Patch::new(1, 1, 1024, 1024, 1024).unwrap();
        assert!(read_patch(&store, &inside).is_ok());
        let overhang = Patch::new(1, 1, 1536, 0, 1024).unwrap();
        assert!(read_patch(&store, &overhang).is_err());
    }

    #[test]
    fn test_background_flags_mark_overhanging_patches() {
        let store = store(2048, 2048);
        let patches = vec![
            Patch::new(1, 1, 0, 0, 1024).unwrap(),
            Patch::new(1, 1, 1536, 0, 1024).unwrap(),
        ];
        assert_eq!(background_flags(&store, &patches), vec![0, 1]);
    }
}
