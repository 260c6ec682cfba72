//! CLI entry point for the section labeling tool

use clap::Parser;
use regiontile::io::cli::{Cli, SectionProcessor};
use tracing_subscriber::EnvFilter;

fn main() -> regiontile::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    SectionProcessor::new(cli).process()
}
