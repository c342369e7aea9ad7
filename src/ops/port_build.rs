//! Running the port task graph against a real project.
//!
//! [`PortSession`] loads everything a run needs from one validated place
//! (manifest, merged config, NDK). [`PortExecutor`] does the work behind
//! each task and remembers what earlier tasks produced.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::{backend_for, run_port, BuildTools, PortBuild, PortInputs};
use crate::core::configuration::DependencyConfigurations;
use crate::core::layout::PortLayout;
use crate::core::manifest::Manifest;
use crate::core::ndk::Ndk;
use crate::ops::graph::{Stage, TaskExecutor, TaskGraph, TaskKind};
use crate::package::{assemble, export, Exported};
use crate::resolver::{resolve_dependencies, select_artifacts, ResolvedLayout};
use crate::sources::{Acquisition, GitCloner, SourceProvider};
use crate::util::config::{resolve_ndk_path, Config};
use crate::util::context::GlobalContext;
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::process::CommandRunner;

/// A loaded port project.
#[derive(Debug, Clone)]
pub struct PortSession {
    pub manifest: Manifest,
    pub layout: PortLayout,
    pub config: Config,
    pub ndk: Ndk,
    pub configs: DependencyConfigurations,
}

impl PortSession {
    /// Load the manifest at `manifest_path` and the NDK it builds with.
    ///
    /// `ndk_override` comes from `--ndk-path` or `NDKPORTS_NDK_PATH` and wins
    /// over every config file.
    pub fn open(
        gctx: &GlobalContext,
        manifest_path: &Path,
        ndk_override: Option<&Path>,
    ) -> Result<Self> {
        let manifest = Manifest::load(manifest_path)?;
        let project_dir = manifest.manifest_dir.clone();
        let config = gctx.load_config(&project_dir);

        let ndk_path = resolve_ndk_path(ndk_override, &config, &project_dir)?;
        let ndk = Ndk::open(&ndk_path)
            .with_context(|| format!("failed to open NDK at {}", ndk_path.display()))?;
        tracing::debug!("Using NDK {} at {}", ndk.version(), ndk.path().display());

        let configs = DependencyConfigurations::new(manifest.dependencies.clone());
        Ok(PortSession {
            layout: PortLayout::for_project(&project_dir),
            manifest,
            config,
            ndk,
            configs,
        })
    }

    /// Where this session's dependencies are resolved.
    pub fn dependencies_dir(&self) -> PathBuf {
        self.layout
            .dependencies_dir(&self.ndk, self.manifest.min_sdk_version())
    }
}

/// What a graph run produced, task by task.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub acquisition: Option<Acquisition>,
    pub dependencies: Option<ResolvedLayout>,
    pub installed: Vec<PathBuf>,
    pub package_dir: Option<PathBuf>,
    pub exported: Option<Exported>,
    /// Stages the graph went through.
    pub stages: Vec<Stage>,
}

/// Performs each task for one session.
pub struct PortExecutor<'a> {
    session: &'a PortSession,
    runner: &'a dyn CommandRunner,
    cloner: &'a dyn GitCloner,
    outcome: BuildOutcome,
}

impl<'a> PortExecutor<'a> {
    pub fn new(
        session: &'a PortSession,
        runner: &'a dyn CommandRunner,
        cloner: &'a dyn GitCloner,
    ) -> Self {
        PortExecutor {
            session,
            runner,
            cloner,
            outcome: BuildOutcome::default(),
        }
    }

    pub fn into_outcome(self) -> BuildOutcome {
        self.outcome
    }

    fn resolve(&mut self) -> Result<()> {
        let session = self.session;
        let archives = select_artifacts(&session.configs)?;
        let layout = resolve_dependencies(
            &archives,
            &session.dependencies_dir(),
            session.manifest.abis(),
            session.manifest.min_sdk_version(),
        )?;
        self.outcome.dependencies = Some(layout);
        Ok(())
    }

    fn acquire(&mut self) -> Result<()> {
        let session = self.session;
        let acquisition = SourceProvider::new(self.runner, self.cloner)
            .with_git_timeout(session.config.git_timeout())
            .acquire(&session.manifest.source, &session.layout.source_dir())?;
        self.outcome.acquisition = Some(acquisition);
        Ok(())
    }

    fn build(&mut self, port: &dyn PortBuild) -> Result<()> {
        let session = self.session;
        let dependencies = self
            .outcome
            .dependencies
            .as_ref()
            .context("dependencies were not resolved before the port step")?;

        let inputs = PortInputs {
            layout: &session.layout,
            ndk: &session.ndk,
            abis: session.manifest.abis(),
            min_sdk_version: session.manifest.min_sdk_version(),
            dependencies,
            tools: BuildTools::from_config(&session.config.build),
            jobs: session.config.jobs(),
        };
        self.outcome.installed = run_port(port, &inputs, self.runner)?;
        Ok(())
    }
}

impl TaskExecutor for PortExecutor<'_> {
    fn execute(&mut self, task: TaskKind, port: &dyn PortBuild) -> Result<()> {
        let session = self.session;
        match task {
            TaskKind::Prefab => self.resolve(),
            TaskKind::ExtractSrc => self.acquire(),
            TaskKind::Port => self.build(port),
            TaskKind::PrefabPackage => {
                let dir = assemble(&session.manifest, &session.layout, &session.ndk)?;
                self.outcome.package_dir = Some(dir);
                Ok(())
            }
            TaskKind::PackageAar => {
                let exported = export(&session.manifest, &session.layout, &session.configs)?;
                self.outcome.exported = Some(exported);
                Ok(())
            }
        }
    }
}

/// Run `target` and its prerequisites for `session`.
pub fn run_tasks(
    session: &PortSession,
    target: TaskKind,
    runner: &dyn CommandRunner,
    cloner: &dyn GitCloner,
) -> Result<BuildOutcome> {
    let mut graph = TaskGraph::new();
    graph.register_port(backend_for(&session.manifest.build))?;

    let mut executor = PortExecutor::new(session, runner, cloner);
    graph
        .run(target, &mut executor)
        .with_context(|| format!("failed to build port `{}`", session.manifest.name()))?;

    let mut outcome = executor.into_outcome();
    outcome.stages = graph.history().to_vec();
    Ok(outcome)
}

/// Remove the port's build tree. Returns whether anything was removed.
pub fn clean(layout: &PortLayout) -> Result<bool> {
    let root = layout.root();
    if !root.exists() {
        return Ok(false);
    }
    remove_dir_all_if_exists(root)?;
    tracing::info!("Removed {}", root.display());
    Ok(true)
}
