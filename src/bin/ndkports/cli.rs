//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use ndkports::util::config::NDK_PATH_ENV;
use ndkports::util::{ColorChoice, Shell};

/// ndkports - build third-party C/C++ libraries into prefab AARs for the Android NDK
#[derive(Parser)]
#[command(name = "ndkports")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Path to Port.toml, or the directory containing it
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    /// NDK to build with; overrides every config file
    #[arg(long, global = true, value_name = "PATH", env = NDK_PATH_ENV)]
    pub ndk_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every task and export the .aar
    Build(BuildArgs),

    /// Acquire the port's sources into build/port/src
    Fetch,

    /// Resolve dependency packages and generate the sysroot
    Resolve,

    /// Build and assemble the package tree without archiving it
    Package(BuildArgs),

    /// Describe a packaged .aar or an unpacked prefab package
    Inspect(InspectArgs),

    /// Remove build/port
    Clean,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Number of parallel jobs for make based builds
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Archive or package directory to read
    pub path: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: CompletionShell,
}

/// Options every command sees.
pub struct GlobalOpts {
    pub shell: Shell,
    pub manifest_path: Option<PathBuf>,
    pub ndk_path: Option<PathBuf>,
}

impl From<&Cli> for GlobalOpts {
    fn from(cli: &Cli) -> Self {
        GlobalOpts {
            shell: Shell::from_flags(cli.quiet, cli.verbose, cli.color),
            manifest_path: cli.manifest_path.clone(),
            ndk_path: cli.ndk_path.clone(),
        }
    }
}
