//! Per-section orchestration and the output table

/// Output table assembly
pub mod output;
/// End-to-end section pipeline
pub mod pipeline;

pub use output::{META_COLUMNS, SectionTable};
pub use pipeline::{
    SectionConfig, SectionOutput, process_section, process_section_with_store,
};
