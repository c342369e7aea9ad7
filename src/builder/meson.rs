//! Meson backend.

use std::path::PathBuf;

use anyhow::Result;

use crate::builder::context::PortContext;
use crate::builder::port::PortBuild;
use crate::core::abi::Abi;
use crate::core::manifest::MesonOptions;
use crate::util::fs::write_string;
use crate::util::process::{CommandRunner, ProcessBuilder};

#[derive(Debug, Clone)]
pub struct MesonPort {
    options: MesonOptions,
}

/// Meson's `cpu_family` and `cpu` for an ABI.
fn host_cpu(abi: Abi) -> (&'static str, &'static str) {
    match abi {
        Abi::Arm => ("arm", "armv7a"),
        Abi::Arm64 => ("aarch64", "armv8a"),
        Abi::X86 => ("x86", "i686"),
        Abi::X86_64 => ("x86_64", "x86_64"),
    }
}

/// Cross file describing the NDK toolchain for one ABI.
pub fn cross_file(ctx: &PortContext) -> String {
    let tc = &ctx.toolchain;
    let (cpu_family, cpu) = host_cpu(ctx.abi());
    format!(
        "[binaries]\n\
         ar = '{}'\n\
         c = '{}'\n\
         cpp = '{}'\n\
         strip = '{}'\n\
         \n\
         [host_machine]\n\
         system = 'android'\n\
         cpu_family = '{}'\n\
         cpu = '{}'\n\
         endian = 'little'\n",
        tc.ar.display(),
        tc.clang.display(),
        tc.clangxx.display(),
        tc.strip.display(),
        cpu_family,
        cpu
    )
}

impl MesonPort {
    pub fn new(options: MesonOptions) -> Self {
        MesonPort { options }
    }

    fn cross_file_path(ctx: &PortContext) -> PathBuf {
        ctx.work_dir
            .join(format!("cross_file-{}.txt", ctx.abi().abi_name()))
    }

    pub fn setup_command(&self, ctx: &PortContext) -> ProcessBuilder {
        ProcessBuilder::new(&ctx.tools.meson)
            .arg("--cross-file")
            .arg(Self::cross_file_path(ctx))
            .arg("--buildtype")
            .arg("release")
            .arg("--prefix")
            .arg(&ctx.install_dir)
            .arg("--default-library")
            .arg(&self.options.default_library)
            .args(ctx.expand_args(&self.options.args))
            .arg(&ctx.source_dir)
            .arg(&ctx.build_dir)
            .envs(ctx.expand_env(&self.options.env))
            .cwd(&ctx.work_dir)
    }
}

impl PortBuild for MesonPort {
    fn backend(&self) -> &'static str {
        "meson"
    }

    fn build_abi(&self, ctx: &PortContext, runner: &dyn CommandRunner) -> Result<()> {
        write_string(&Self::cross_file_path(ctx), &cross_file(ctx))?;
        runner.run_checked(&self.setup_command(ctx))?;

        let ninja = ProcessBuilder::new(&ctx.tools.ninja)
            .arg("-v")
            .cwd(&ctx.build_dir);
        runner.run_checked(&ninja)?;
        runner.run_checked(&ninja.clone().arg("install"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::context::tests::context;
    use crate::test_support::FakeRunner;
    use tempfile::TempDir;

    #[test]
    fn test_cross_file_contents() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path(), Abi::Arm, 21);

        let text = cross_file(&ctx);
        assert!(text.contains("cpu_family = 'arm'"));
        assert!(text.contains("cpu = 'armv7a'"));
        assert!(text.contains("armv7a-linux-androideabi21-clang'"));
        assert!(text.contains("system = 'android'"));
    }

    #[test]
    fn test_build_writes_cross_file_and_runs() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path(), Abi::X86_64, 21);
        let runner = FakeRunner::new();
        let port = MesonPort::new(MesonOptions {
            args: vec!["-Dtests=false".to_string()],
            default_library: "static".to_string(),
            env: Default::default(),
        });

        port.build_abi(&ctx, &runner).unwrap();

        let cross = ctx.work_dir.join("cross_file-x86_64.txt");
        assert!(std::fs::read_to_string(&cross)
            .unwrap()
            .contains("cpu_family = 'x86_64'"));

        assert_eq!(runner.programs(), vec!["meson", "ninja", "ninja"]);
        let setup = &runner.calls()[0];
        let args = setup.get_args();
        assert_eq!(args[0], "--cross-file");
        assert_eq!(args[1], cross.display().to_string());
        let library = args.iter().position(|a| a == "--default-library").unwrap();
        assert_eq!(args[library + 1], "static");
        assert!(args.contains(&"-Dtests=false".to_string()));
        assert_eq!(args.last().unwrap(), &ctx.build_dir.display().to_string());
    }
}
