//! Command implementations

pub mod build;
pub mod clean;
pub mod completions;
pub mod fetch;
pub mod inspect;
pub mod package;
pub mod resolve;

use anyhow::Result;

use crate::cli::GlobalOpts;
use ndkports::ops::{run_tasks, BuildOutcome, PortSession, TaskKind};
use ndkports::sources::{set_network_timeouts, Git2Cloner};
use ndkports::util::{GlobalContext, Status, SystemRunner};

/// Load the port the command line points at.
pub fn open_session(opts: &GlobalOpts) -> Result<PortSession> {
    let ctx = GlobalContext::new()?;
    let manifest_path = ctx.manifest_path(opts.manifest_path.as_deref())?;
    let session = PortSession::open(&ctx, &manifest_path, opts.ndk_path.as_deref())?;

    // SAFETY: runs on the main thread before any task starts.
    unsafe { set_network_timeouts(session.config.git_timeout())? };
    Ok(session)
}

/// Run `target` with the real process runner and git, behind a spinner.
pub fn run_target(
    session: &PortSession,
    target: TaskKind,
    status: Status,
    opts: &GlobalOpts,
) -> Result<BuildOutcome> {
    let label = format!("{} v{}", session.manifest.name(), session.manifest.version());
    let spinner = opts.shell.spinner(status, &label);

    let outcome = run_tasks(session, target, &SystemRunner, &Git2Cloner)?;
    spinner.finish(format!("{} ({})", label, target));
    Ok(outcome)
}
