//! The port build step and its reference backends.
//!
//! A backend receives the extracted sources, the generated dependency
//! sysroot and one NDK toolchain, and leaves compiled libraries and headers
//! in the ABI's install directory.

pub mod adhoc;
pub mod autoconf;
pub mod cmake;
pub mod context;
pub mod meson;
pub mod port;

pub use context::{BuildTools, PortContext};
pub use port::{backend_for, run_port, PortBuild, PortInputs};
