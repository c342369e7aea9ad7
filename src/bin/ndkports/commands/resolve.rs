//! `ndkports resolve` command

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::commands::{open_session, run_target};
use ndkports::ops::TaskKind;
use ndkports::util::Status;

pub fn execute(opts: &GlobalOpts) -> Result<()> {
    let session = open_session(opts)?;
    let outcome = run_target(&session, TaskKind::Prefab, Status::Resolving, opts)?;

    if let Some(layout) = outcome.dependencies {
        for package in &layout.packages {
            let modules: Vec<&str> = package.modules.iter().map(|m| m.name.as_str()).collect();
            opts.shell
                .note(format!("{}: {}", package.name(), modules.join(", ")));
        }
        opts.shell
            .note(format!("sysroots in {}", layout.generated_dir().display()));
    }
    Ok(())
}
