//! `ndkports package` command

use anyhow::Result;

use crate::cli::{BuildArgs, GlobalOpts};
use crate::commands::{open_session, run_target};
use ndkports::ops::TaskKind;
use ndkports::util::Status;

pub fn execute(args: BuildArgs, opts: &GlobalOpts) -> Result<()> {
    let mut session = open_session(opts)?;
    if args.jobs.is_some() {
        session.config.build.jobs = args.jobs;
    }

    let outcome = run_target(&session, TaskKind::PrefabPackage, Status::Packaging, opts)?;
    if let Some(dir) = outcome.package_dir {
        opts.shell.note(format!("package tree at {}", dir.display()));
    }
    Ok(())
}
