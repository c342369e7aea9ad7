//! The port build step: one backend, driven once per ABI.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::builder::adhoc::AdHocPort;
use crate::builder::autoconf::AutoconfPort;
use crate::builder::cmake::CMakePort;
use crate::builder::context::{BuildTools, PortContext};
use crate::builder::meson::MesonPort;
use crate::core::abi::Abi;
use crate::core::layout::PortLayout;
use crate::core::manifest::BuildSpec;
use crate::core::ndk::{Ndk, Toolchain};
use crate::resolver::ResolvedLayout;
use crate::util::fs::ensure_dir;
use crate::util::process::CommandRunner;

/// Compiles a port for one ABI into `ctx.install_dir`.
///
/// Implementations only talk to the outside world through `runner`.
pub trait PortBuild: Send + Sync {
    /// Backend name for logs.
    fn backend(&self) -> &'static str;

    fn build_abi(&self, ctx: &PortContext, runner: &dyn CommandRunner) -> Result<()>;
}

/// The reference backend selected by `[build]`.
pub fn backend_for(spec: &BuildSpec) -> Box<dyn PortBuild> {
    match spec {
        BuildSpec::CMake(options) => Box::new(CMakePort::new(options.clone())),
        BuildSpec::Meson(options) => Box::new(MesonPort::new(options.clone())),
        BuildSpec::Autoconf(options) => Box::new(AutoconfPort::new(options.clone())),
        BuildSpec::AdHoc(options) => Box::new(AdHocPort::new(options.clone())),
    }
}

/// Inputs shared by every ABI of one port build.
#[derive(Debug, Clone)]
pub struct PortInputs<'a> {
    pub layout: &'a PortLayout,
    pub ndk: &'a Ndk,
    pub abis: &'a [Abi],
    pub min_sdk_version: u32,
    pub dependencies: &'a ResolvedLayout,
    pub tools: BuildTools,
    pub jobs: usize,
}

impl PortInputs<'_> {
    /// The context for `abi`, at `max(min_sdk_version, abi minimum)`.
    pub fn context_for(&self, abi: Abi) -> PortContext {
        let api = abi.adjust_min_sdk_version(self.min_sdk_version);
        PortContext {
            toolchain: Toolchain::new(self.ndk, abi, api),
            work_dir: self.layout.root().to_path_buf(),
            source_dir: self.layout.source_dir(),
            build_dir: self.layout.build_dir(abi),
            install_dir: self.layout.install_dir(abi),
            sysroot: self.dependencies.sysroot(abi),
            jobs: self.jobs,
            tools: self.tools.clone(),
        }
    }
}

/// Run `port` for every configured ABI, in order. Returns the install
/// directories that were populated.
pub fn run_port(
    port: &dyn PortBuild,
    inputs: &PortInputs<'_>,
    runner: &dyn CommandRunner,
) -> Result<Vec<PathBuf>> {
    let mut installed = Vec::new();
    for &abi in inputs.abis {
        let ctx = inputs.context_for(abi);
        ensure_dir(&ctx.build_dir)?;
        ensure_dir(&ctx.install_dir)?;

        tracing::info!(
            "Building {} for {} (API {}) with {}",
            ctx.source_dir.display(),
            abi,
            ctx.api(),
            port.backend()
        );
        port.build_abi(&ctx, runner)
            .with_context(|| format!("{} build failed for {}", port.backend(), abi))?;
        installed.push(ctx.install_dir);
    }
    Ok(installed)
}
