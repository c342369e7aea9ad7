//! Ad-hoc backend: a user-supplied command list run in the source tree.
//!
//! Each command sees the toolchain variables (`AR`, `CC`, ...) and
//! `NDKPORTS_*` variables describing the current ABI, and may use the
//! `{placeholder}` forms accepted by [`PortContext::expand`].

use anyhow::{Context, Result};

use crate::builder::context::PortContext;
use crate::builder::port::PortBuild;
use crate::core::manifest::{AdHocCommand, AdHocOptions};
use crate::util::process::{CommandRunner, ProcessBuilder};

#[derive(Debug, Clone, Default)]
pub struct AdHocPort {
    options: AdHocOptions,
}

impl AdHocPort {
    pub fn new(options: AdHocOptions) -> Self {
        AdHocPort { options }
    }

    fn port_env(ctx: &PortContext) -> Vec<(&'static str, String)> {
        vec![
            ("NDKPORTS_ABI", ctx.abi().abi_name().to_string()),
            ("NDKPORTS_ARCH", ctx.abi().arch_name().to_string()),
            ("NDKPORTS_API", ctx.api().to_string()),
            ("NDKPORTS_TRIPLE", ctx.toolchain.binutils_triple.to_string()),
            ("NDKPORTS_NDK", ctx.toolchain.ndk.path().display().to_string()),
            ("NDKPORTS_SOURCE_DIR", ctx.source_dir.display().to_string()),
            ("NDKPORTS_BUILD_DIR", ctx.build_dir.display().to_string()),
            ("NDKPORTS_INSTALL_DIR", ctx.install_dir.display().to_string()),
            ("NDKPORTS_SYSROOT", ctx.sysroot.display().to_string()),
            ("NDKPORTS_JOBS", ctx.jobs.to_string()),
        ]
    }

    pub fn command(&self, ctx: &PortContext, run: &AdHocCommand) -> Result<ProcessBuilder> {
        let (program, args) = run
            .cmd
            .split_first()
            .context("ad-hoc build command is empty")?;
        Ok(ProcessBuilder::new(ctx.expand(program))
            .args(ctx.expand_args(args))
            .envs(ctx.toolchain_env())
            .envs(Self::port_env(ctx))
            .envs(ctx.expand_env(&run.env))
            .cwd(&ctx.source_dir))
    }
}

impl PortBuild for AdHocPort {
    fn backend(&self) -> &'static str {
        "adhoc"
    }

    fn build_abi(&self, ctx: &PortContext, runner: &dyn CommandRunner) -> Result<()> {
        for run in &self.options.run {
            runner.run_checked(&self.command(ctx, run)?)?;
        }
        Ok(())
    }
}
