//! Autoconf backend: `configure`, `make`, `make install`.

use anyhow::Result;

use crate::builder::context::PortContext;
use crate::builder::port::PortBuild;
use crate::core::manifest::AutoconfOptions;
use crate::util::process::{CommandRunner, ProcessBuilder};

#[derive(Debug, Clone, Default)]
pub struct AutoconfPort {
    options: AutoconfOptions,
}

impl AutoconfPort {
    pub fn new(options: AutoconfOptions) -> Self {
        AutoconfPort { options }
    }

    /// `configure` runs out of tree from the ABI build directory, with the
    /// toolchain in its environment. Manifest `env` overrides the defaults.
    pub fn configure_command(&self, ctx: &PortContext) -> ProcessBuilder {
        ProcessBuilder::new(ctx.source_dir.join("configure"))
            .arg(format!("--host={}", ctx.toolchain.binutils_triple))
            .arg(format!("--prefix={}", ctx.install_dir.display()))
            .args(ctx.expand_args(&self.options.args))
            .envs(ctx.toolchain_env())
            .envs(ctx.expand_env(&self.options.env))
            .cwd(&ctx.build_dir)
    }

    fn make(&self, ctx: &PortContext) -> ProcessBuilder {
        ProcessBuilder::new(&ctx.tools.make)
            .arg(format!("-j{}", ctx.jobs))
            .cwd(&ctx.build_dir)
    }
}

impl PortBuild for AutoconfPort {
    fn backend(&self) -> &'static str {
        "autoconf"
    }

    fn build_abi(&self, ctx: &PortContext, runner: &dyn CommandRunner) -> Result<()> {
        runner.run_checked(&self.configure_command(ctx))?;
        runner.run_checked(&self.make(ctx))?;
        runner.run_checked(&self.make(ctx).arg("install"))?;
        Ok(())
    }
}
