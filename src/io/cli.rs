//! Command-line interface for batch labeling of annotated sections

use crate::io::configuration::{
    ANNOTATION_EXTENSION, DEFAULT_GRANULARITY, DEFAULT_PATCH_SIZE, DEFAULT_STRIDE,
};
use crate::io::error::{LabelingError, Result, invalid_parameter};
use crate::io::export::export_csv;
use crate::io::nomenclature::Nomenclature;
use crate::io::progress::BatchProgress;
use crate::io::store::ImageFileStore;
use crate::labeling::DEFAULT_TOLERANCE;
use crate::section::{SectionConfig, SectionOutput, process_section, process_section_with_store};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

/// Image file extensions probed when an image directory is given
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "tif", "tiff", "jpg"];

#[derive(Parser)]
#[command(name = "regiontile")]
#[command(
    author,
    version,
    about = "Assign area-weighted region labels to image patch grids"
)]
/// Command-line arguments for the section labeling tool
pub struct Cli {
    /// Annotation document (.geojson) or directory of them, one per section
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Brain identifier shared by all sections in the target
    #[arg(short, long)]
    pub brain_id: u32,

    /// Nomenclature JSON defining the canonical region columns
    #[arg(short, long)]
    pub nomenclature: PathBuf,

    /// Tile side length in pixels
    #[arg(long, default_value_t = DEFAULT_PATCH_SIZE)]
    pub patch_size: u32,

    /// Spacing between successive patch origins
    #[arg(long, default_value_t = DEFAULT_STRIDE)]
    pub stride: u32,

    /// QC coverage tolerance above full coverage
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Rounding unit for intersection discretization, in pixels
    #[arg(long, default_value_t = DEFAULT_GRANULARITY)]
    pub granularity: f64,

    /// Image width in pixels (required without --images)
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height in pixels (required without --images)
    #[arg(long)]
    pub height: Option<u32>,

    /// Directory of section images named <section_id>.<ext>
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Output directory for per-section CSV tables
    #[arg(short, long, default_value = "labels")]
    pub output: PathBuf,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    fn config(&self) -> SectionConfig {
        SectionConfig {
            patch_size: self.patch_size,
            stride: self.stride,
            tolerance: self.tolerance,
            granularity: self.granularity,
        }
    }
}

/// Orchestrates batch processing of annotation documents
pub struct SectionProcessor {
    cli: Cli,
}

impl SectionProcessor {
    /// Create a processor from parsed CLI arguments
    pub const fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Process every section under the target
    ///
    /// One section's failure is logged and counted; siblings continue.
    ///
    /// # Errors
    ///
    /// Returns an error when the target or nomenclature cannot be read, or
    /// the output directory cannot be created.
    pub fn process(&self) -> Result<()> {
        let sections = discover_sections(&self.cli.target)?;
        if sections.is_empty() {
            return Err(invalid_parameter(
                "target",
                &self.cli.target.display(),
                &"no annotation documents found",
            ));
        }

        let nomenclature_text = read_file(&self.cli.nomenclature)?;
        let nomenclature = Nomenclature::parse(&nomenclature_text)?;

        fs::create_dir_all(&self.cli.output).map_err(|source| LabelingError::FileSystem {
            path: self.cli.output.clone(),
            operation: "create directory",
            source,
        })?;

        let progress = BatchProgress::new(sections.len(), self.cli.quiet);
        let mut failures = 0_usize;
        for (section_id, path) in &sections {
            match self.process_one(*section_id, path, &nomenclature) {
                Ok(output) => {
                    tracing::info!(
                        brain_id = self.cli.brain_id,
                        section_id,
                        retained = output.qc.retained,
                        rescaled = output.qc.rescaled,
                        rejected = output.qc.rejected,
                        "section labeled"
                    );
                }
                Err(err) => {
                    failures += 1;
                    tracing::error!(
                        brain_id = self.cli.brain_id,
                        section_id,
                        error = %err,
                        "section failed"
                    );
                }
            }
            progress.advance(&section_id.to_string());
        }
        progress.finish();

        tracing::info!(
            sections = sections.len(),
            failures,
            "batch complete"
        );
        Ok(())
    }

    fn process_one(
        &self,
        section_id: u32,
        annotation_path: &Path,
        nomenclature: &Nomenclature,
    ) -> Result<SectionOutput> {
        let annotation = read_file(annotation_path)?;
        let config = self.cli.config();

        let output = if let Some(images) = &self.cli.images {
            let image_path = find_image(images, section_id).ok_or_else(|| {
                LabelingError::ImageNotFound {
                    brain_id: self.cli.brain_id,
                    section_id,
                    reason: format!("no image file under '{}'", images.display()),
                }
            })?;
            let store = ImageFileStore::open(&image_path)?;
            process_section_with_store(
                self.cli.brain_id,
                section_id,
                &store,
                Some(&annotation),
                nomenclature,
                &config,
            )?
        } else {
            let (Some(width), Some(height)) = (self.cli.width, self.cli.height) else {
                return Err(invalid_parameter(
                    "width/height",
                    &"<missing>",
                    &"either --images or both --width and --height are required",
                ));
            };
            process_section(
                self.cli.brain_id,
                section_id,
                (width, height),
                Some(&annotation),
                nomenclature,
                &config,
            )?
        };

        let csv_path = self
            .cli
            .output
            .join(format!("{}_{section_id}.csv", self.cli.brain_id));
        export_csv(&output.table, &csv_path)?;
        Ok(output)
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| LabelingError::FileSystem {
        path: path.to_path_buf(),
        operation: "read",
        source,
    })
}

/// Collect (section_id, path) pairs from a file or directory target
fn discover_sections(target: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let mut paths = Vec::new();
    if target.is_dir() {
        let entries = fs::read_dir(target).map_err(|source| LabelingError::FileSystem {
            path: target.to_path_buf(),
            operation: "read directory",
            source,
        })?;
        for entry in entries {
            let path = entry
                .map_err(|source| LabelingError::FileSystem {
                    path: target.to_path_buf(),
                    operation: "read directory entry",
                    source,
                })?
                .path();
            if path.extension().is_some_and(|ext| ext == ANNOTATION_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
    } else {
        paths.push(target.to_path_buf());
    }

    let mut sections = Vec::new();
    for path in paths {
        match section_id_of(&path) {
            Some(section_id) => sections.push((section_id, path)),
            None => {
                tracing::warn!(path = %path.display(), "skipping: filename is not a section id");
            }
        }
    }
    Ok(sections)
}

/// Section id from a path like `.../373.geojson`
fn section_id_of(path: &Path) -> Option<u32> {
    path.file_stem()?.to_str()?.parse().ok()
}

fn find_image(directory: &Path, section_id: u32) -> Option<PathBuf> {
    IMAGE_EXTENSIONS.iter().find_map(|ext| {
        let candidate = directory.join(format!("{section_id}.{ext}"));
        candidate.is_file().then_some(candidate)
    })
}
