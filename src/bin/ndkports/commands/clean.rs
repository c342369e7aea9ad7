//! `ndkports clean` command

use anyhow::{Context, Result};

use crate::cli::GlobalOpts;
use ndkports::core::{Manifest, PortLayout};
use ndkports::ops::clean;
use ndkports::util::{GlobalContext, Status};

/// Needs only the manifest location, not an NDK.
pub fn execute(opts: &GlobalOpts) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let manifest_path = ctx.manifest_path(opts.manifest_path.as_deref())?;
    let manifest = Manifest::load(&manifest_path)
        .with_context(|| format!("failed to load {}", manifest_path.display()))?;

    let layout = PortLayout::for_project(&manifest.manifest_dir);
    if clean(&layout)? {
        opts.shell.status(Status::Removed, layout.root().display());
    } else {
        opts.shell
            .status(Status::Skipped, format!("{} does not exist", layout.root().display()));
    }
    Ok(())
}
