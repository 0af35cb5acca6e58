//! `dcctl resgen`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::GlobalOptions;
use crate::{resgen, ui};

/// Generate the default instance and microservice configuration resources.
#[derive(Args, Debug)]
pub struct ResgenCommand {
    /// Output directory; defaults to the resources directory.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ResgenCommand {
    pub fn run(&self, global: &GlobalOptions) -> Result<()> {
        let dir = self.output.as_ref().unwrap_or(&global.resources_dir);
        let resources = resgen::instance_resources()?;
        let written = resgen::write_resources(dir, &resources)
            .with_context(|| format!("Failed to write resources to {}", dir.display()))?;

        ui::print_section("Generate Custom Resources");
        for path in &written {
            ui::print_progress(&format!("Generated resource: {}", path.display()));
        }
        ui::print_success(&format!("Generated {} resources.", written.len()));
        Ok(())
    }
}
