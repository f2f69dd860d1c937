use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use xtcav_core::reference::LasingOffReference;

use crate::summary::print_reference_info;

#[derive(Args)]
pub struct InfoArgs {
    /// Saved lasing-off reference
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reference = LasingOffReference::load(&args.file)
        .with_context(|| format!("Failed to load reference {}", args.file.display()))?;
    print_reference_info(&reference, &args.file);
    Ok(())
}
