//! `ndkports fetch` command

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::commands::{open_session, run_target};
use ndkports::ops::TaskKind;
use ndkports::sources::Acquisition;
use ndkports::util::Status;

pub fn execute(opts: &GlobalOpts) -> Result<()> {
    let session = open_session(opts)?;
    let outcome = run_target(&session, TaskKind::ExtractSrc, Status::Fetching, opts)?;

    let source_dir = session.layout.source_dir();
    match outcome.acquisition {
        Some(Acquisition::UpToDate) => opts.shell.status(
            Status::Skipped,
            format!("{} already has sources", source_dir.display()),
        ),
        _ => opts
            .shell
            .note(format!("sources in {}", source_dir.display())),
    }
    Ok(())
}
