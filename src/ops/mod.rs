//! High-level operations.
//!
//! This module contains the implementation of ndkports commands.

pub mod graph;
pub mod inspect;
pub mod port_build;

pub use graph::{GraphError, Stage, TaskExecutor, TaskGraph, TaskKind};
pub use inspect::{inspect, PackageReport};
pub use port_build::{clean, run_tasks, BuildOutcome, PortExecutor, PortSession};
