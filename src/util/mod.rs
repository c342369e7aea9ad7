//! Shared utilities

pub mod archive;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod process;
pub mod shell;

pub use config::Config;
pub use context::GlobalContext;
pub use process::{CommandRunner, ProcessBuilder, SystemRunner};
pub use shell::{ColorChoice, Shell, Status};
