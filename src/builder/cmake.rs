//! CMake backend for ports with a CMakeLists.txt.

use anyhow::{Context, Result};

use crate::builder::context::PortContext;
use crate::builder::port::PortBuild;
use crate::core::manifest::CMakeOptions;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Builds with CMake and Ninja against the NDK's toolchain file.
#[derive(Debug, Clone, Default)]
pub struct CMakePort {
    options: CMakeOptions,
}

impl CMakePort {
    pub fn new(options: CMakeOptions) -> Self {
        CMakePort { options }
    }

    fn check_installed(&self, ctx: &PortContext, runner: &dyn CommandRunner) -> Result<()> {
        let version = ProcessBuilder::new(&ctx.tools.cmake).arg("--version");
        runner.run_checked(&version).with_context(|| {
            format!(
                "CMake not found at `{}`. Install CMake and add it to PATH, \
                 or set build.cmake in .ndkports/config.toml",
                ctx.tools.cmake.display()
            )
        })?;
        Ok(())
    }

    /// The configure command line.
    pub fn configure_command(&self, ctx: &PortContext) -> ProcessBuilder {
        ProcessBuilder::new(&ctx.tools.cmake)
            .arg(format!(
                "-DCMAKE_TOOLCHAIN_FILE={}",
                ctx.toolchain.ndk.cmake_toolchain_file().display()
            ))
            .arg("-DCMAKE_BUILD_TYPE=RelWithDebInfo")
            .arg(format!("-DCMAKE_INSTALL_PREFIX={}", ctx.install_dir.display()))
            .arg(format!("-DANDROID_ABI={}", ctx.abi().abi_name()))
            .arg(format!("-DANDROID_API_LEVEL={}", ctx.api()))
            .arg("-GNinja")
            .arg(&ctx.source_dir)
            .args(ctx.expand_args(&self.options.args))
            .envs(ctx.expand_env(&self.options.env))
            .cwd(&ctx.build_dir)
    }

    fn ninja(&self, ctx: &PortContext, install: bool) -> ProcessBuilder {
        let cmd = ProcessBuilder::new(&ctx.tools.ninja).arg("-v");
        let cmd = if install { cmd.arg("install") } else { cmd };
        cmd.cwd(&ctx.build_dir)
    }
}

impl PortBuild for CMakePort {
    fn backend(&self) -> &'static str {
        "cmake"
    }

    fn build_abi(&self, ctx: &PortContext, runner: &dyn CommandRunner) -> Result<()> {
        self.check_installed(ctx, runner)?;

        tracing::debug!("Configuring CMake project in {}", ctx.build_dir.display());
        runner.run_checked(&self.configure_command(ctx))?;

        tracing::debug!("Building CMake project");
        runner.run_checked(&self.ninja(ctx, false))?;
        runner.run_checked(&self.ninja(ctx, true))?;
        Ok(())
    }
}
