//! The port task graph.
//!
//! Five tasks, wired as a DAG:
//!
//! ```text
//! extractSrc ──┬──> port ──> prefabPackage ──> packageAar
//! prefab ──────┘               ^
//! extractSrc ──────────────────┘
//! ```
//!
//! The graph owns the single port build step. Registration checks happen
//! when the step is registered; a graph with no step refuses to run at all.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use thiserror::Error;

use crate::builder::PortBuild;

/// Errors wiring or running the task graph.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum GraphError {
    #[error("a port build step is already registered ({existing}); cannot register {new}")]
    #[diagnostic(
        code(ndkports::graph::duplicate_port),
        help("A port has exactly one [build] backend")
    )]
    DuplicatePortTask {
        existing: &'static str,
        new: &'static str,
    },

    #[error("no port build step was registered; nothing can build the sources")]
    #[diagnostic(
        code(ndkports::graph::no_port),
        help("Register a port build step before running the graph")
    )]
    NoPortTask,

    #[error("the task graph already failed at `{0}` and cannot run again")]
    #[diagnostic(code(ndkports::graph::failed))]
    AlreadyFailed(TaskKind),
}

/// One task of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    /// Resolve dependency archives and generate the sysroot.
    Prefab,
    /// Acquire the sources.
    ExtractSrc,
    /// Run the port build step for every ABI.
    Port,
    /// Assemble the package tree.
    PrefabPackage,
    /// Archive and publish the package.
    PackageAar,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Prefab,
        TaskKind::ExtractSrc,
        TaskKind::Port,
        TaskKind::PrefabPackage,
        TaskKind::PackageAar,
    ];

    /// Name shown in logs.
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Prefab => "prefab",
            TaskKind::ExtractSrc => "extractSrc",
            TaskKind::Port => "port",
            TaskKind::PrefabPackage => "prefabPackage",
            TaskKind::PackageAar => "packageAar",
        }
    }

    /// Stage reached when this task completes.
    pub fn completes(&self) -> Stage {
        match self {
            TaskKind::Prefab => Stage::DependenciesResolved,
            TaskKind::ExtractSrc => Stage::SourceAcquired,
            TaskKind::Port => Stage::Built,
            TaskKind::PrefabPackage => Stage::Packaged,
            TaskKind::PackageAar => Stage::Exported,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a graph run has got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unconfigured,
    Configuring,
    SourceAcquired,
    DependenciesResolved,
    Built,
    Packaged,
    Exported,
    Failed,
}

/// Holds zero or one port build step.
#[derive(Default)]
pub struct PortSlot {
    port: Option<Box<dyn PortBuild>>,
}

impl PortSlot {
    /// Fill the slot. A second registration is an error and leaves the
    /// first step in place.
    pub fn register(&mut self, port: Box<dyn PortBuild>) -> Result<(), GraphError> {
        if let Some(existing) = &self.port {
            return Err(GraphError::DuplicatePortTask {
                existing: existing.backend(),
                new: port.backend(),
            });
        }
        self.port = Some(port);
        Ok(())
    }

    pub fn get(&self) -> Option<&dyn PortBuild> {
        self.port.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.port.is_none()
    }
}

impl fmt::Debug for PortSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortSlot")
            .field("port", &self.port.as_ref().map(|p| p.backend()))
            .finish()
    }
}

/// Runs the work behind each task.
pub trait TaskExecutor {
    fn execute(&mut self, task: TaskKind, port: &dyn PortBuild) -> Result<()>;
}

/// The task DAG for one port.
#[derive(Debug)]
pub struct TaskGraph {
    graph: DiGraph<TaskKind, ()>,
    nodes: BTreeMap<TaskKind, NodeIndex>,
    slot: PortSlot,
    stage: Stage,
    history: Vec<Stage>,
    failed: Option<TaskKind>,
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGraph {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let nodes: BTreeMap<TaskKind, NodeIndex> = TaskKind::ALL
            .iter()
            .map(|&task| (task, graph.add_node(task)))
            .collect();

        let edges = [
            (TaskKind::ExtractSrc, TaskKind::Port),
            (TaskKind::Prefab, TaskKind::Port),
            (TaskKind::Port, TaskKind::PrefabPackage),
            (TaskKind::ExtractSrc, TaskKind::PrefabPackage),
            (TaskKind::PrefabPackage, TaskKind::PackageAar),
        ];
        for (from, to) in edges {
            graph.add_edge(nodes[&from], nodes[&to], ());
        }

        TaskGraph {
            graph,
            nodes,
            slot: PortSlot::default(),
            stage: Stage::Unconfigured,
            history: vec![Stage::Unconfigured],
            failed: None,
        }
    }

    pub fn register_port(&mut self, port: Box<dyn PortBuild>) -> Result<(), GraphError> {
        self.slot.register(port)
    }

    pub fn port(&self) -> Option<&dyn PortBuild> {
        self.slot.get()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Every stage entered so far, starting with `Unconfigured`.
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!("Stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
        self.history.push(stage);
    }

    /// Direct prerequisites of `task`.
    pub fn dependencies_of(&self, task: TaskKind) -> Vec<TaskKind> {
        let mut deps: Vec<TaskKind> = self
            .graph
            .neighbors_directed(self.nodes[&task], petgraph::Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        deps.sort();
        deps
    }

    /// `target` and everything it depends on, in execution order.
    pub fn plan(&self, target: TaskKind) -> Vec<TaskKind> {
        let reversed = Reversed(&self.graph);
        let mut needed = Vec::new();
        let mut dfs = Dfs::new(reversed, self.nodes[&target]);
        while let Some(node) = dfs.next(reversed) {
            needed.push(node);
        }

        // The edge set is fixed and acyclic.
        let order = toposort(&self.graph, None).unwrap_or_default();
        order
            .into_iter()
            .filter(|node| needed.contains(node))
            .map(|node| self.graph[node])
            .collect()
    }

    /// Run `target` and its prerequisites through `executor`.
    ///
    /// Fails before running anything if no port step is registered or the
    /// graph already failed. The first failing task marks the graph failed.
    pub fn run(&mut self, target: TaskKind, executor: &mut dyn TaskExecutor) -> Result<()> {
        if self.stage == Stage::Failed {
            let failed_at = self.failed.unwrap_or(target);
            return Err(GraphError::AlreadyFailed(failed_at).into());
        }
        let Some(port) = self.slot.port.take() else {
            return Err(GraphError::NoPortTask.into());
        };

        self.enter(Stage::Configuring);
        let result = self.run_plan(target, port.as_ref(), executor);
        self.slot.port = Some(port);
        result
    }

    fn run_plan(
        &mut self,
        target: TaskKind,
        port: &dyn PortBuild,
        executor: &mut dyn TaskExecutor,
    ) -> Result<()> {
        for task in self.plan(target) {
            tracing::info!("> Task :{}", task);
            if let Err(err) = executor.execute(task, port) {
                self.failed = Some(task);
                self.enter(Stage::Failed);
                return Err(err).with_context(|| format!("task `{}` failed", task));
            }
            self.enter(task.completes());
        }
        Ok(())
    }
}
