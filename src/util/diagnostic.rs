//! User-facing diagnostics for errors.
//!
//! Every typed error derives [`miette::Diagnostic`] with a code and, where a
//! fix is obvious, help text. At the CLI boundary errors arrive wrapped in
//! `anyhow::Error` with context layers, so the helpers here walk the chain to
//! recover the diagnostic underneath.

use miette::Diagnostic;

use crate::core::configuration::ConfigurationError;
use crate::ops::graph::GraphError;
use crate::package::PackagingError;
use crate::resolver::DescriptorError;
use crate::sources::SourceError;
use crate::util::config::ConfigError;
use crate::util::context::ManifestError;
use crate::util::process::ProcessError;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a build step fails.
    pub const BUILD_FAILED: &str = "Run `ndkports build --verbose` for more details";

    /// Suggestion when cached source looks wrong.
    pub const STALE_SOURCE: &str = "Run `ndkports clean` to force the source to be acquired again";
}

fn as_diagnostic<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a dyn Diagnostic> {
    macro_rules! try_downcast {
        ($($ty:ty),*) => {
            $(
                if let Some(d) = err.downcast_ref::<$ty>() {
                    return Some(d);
                }
            )*
        };
    }

    try_downcast!(
        ConfigError,
        ManifestError,
        GraphError,
        SourceError,
        DescriptorError,
        PackagingError,
        ConfigurationError,
        ProcessError
    );
    None
}

/// The first typed diagnostic in the error chain.
pub fn find_diagnostic(err: &anyhow::Error) -> Option<&dyn Diagnostic> {
    err.chain().find_map(as_diagnostic)
}

/// Help text of the first diagnostic in the chain that carries any.
pub fn help_for(err: &anyhow::Error) -> Option<String> {
    err.chain()
        .filter_map(as_diagnostic)
        .find_map(|d| d.help().map(|h| h.to_string()))
}

/// Diagnostic code of the first typed error in the chain.
pub fn code_for(err: &anyhow::Error) -> Option<String> {
    find_diagnostic(err).and_then(|d| d.code().map(|c| c.to_string()))
}

/// Print an error with its context chain and help to stderr.
pub fn emit_error(err: &anyhow::Error) {
    eprintln!("error: {:#}", err);
    if let Some(help) = help_for(err) {
        eprintln!("help: {}", help);
    }
    if failed_tool(err) {
        eprintln!("note: {}", suggestions::BUILD_FAILED);
    }
}

/// Whether an external tool's exit status caused `err`.
fn failed_tool(err: &anyhow::Error) -> bool {
    err.chain().any(|e| e.downcast_ref::<ProcessError>().is_some())
}
