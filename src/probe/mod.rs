//! Version probe and capability selector.
//!
//! Finds which oo2core builds are installed next to the host program and
//! picks the newest one.

pub mod availability;
pub mod diagnostics;
pub mod platform;
pub mod selector;

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

pub use availability::VersionProbe;
pub use diagnostics::{run_diagnostics, DiagnosticReport, VersionReport};
pub use platform::{TargetPlatform, CURRENT_PLATFORM};
pub use selector::{AttemptResult, CodecNotFoundError, Resolver};

/// Environment variable overriding the search directory.
pub const SEARCH_DIR_ENV: &str = "OODLE_LIBRARY_DIR";

/// Search directory when nothing is configured.
pub fn default_search_dir() -> PathBuf {
    resolve_search_dir(None)
}

/// Search directory for an optional configured value.
///
/// Precedence: [`SEARCH_DIR_ENV`], then `configured`, then the directory of
/// the running executable, then the working directory.
pub fn resolve_search_dir(configured: Option<&Path>) -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    pick_search_dir(std::env::var_os(SEARCH_DIR_ENV), configured, exe_dir)
}

fn pick_search_dir(
    env: Option<OsString>,
    configured: Option<&Path>,
    exe_dir: Option<PathBuf>,
) -> PathBuf {
    env.filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| configured.map(Path::to_path_buf))
        .or(exe_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
