//! Capability selector.
//!
//! Walks the allowed versions newest first and binds the first one whose
//! binary is present and loads. Every bind attempt is recorded so a failed
//! resolution can say exactly what was tried.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::availability::VersionProbe;
use crate::{codec::CodecBinding, config::Config, native::SupportedVersion};

/// Record of one failed attempt to bind a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResult {
    /// Version tried
    pub version: SupportedVersion,
    /// File that was probed or loaded
    pub path: PathBuf,
    /// Why it failed
    pub error: String,
    /// How long the attempt took (in milliseconds)
    pub duration_ms: u64,
}

impl AttemptResult {
    /// Get duration as Duration type
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Create a failed attempt result
    pub fn failure(
        version: SupportedVersion,
        path: impl Into<PathBuf>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            version,
            path: path.into(),
            error: error.into(),
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// No supported oo2core binary could be bound.
#[derive(Debug, Clone)]
pub struct CodecNotFoundError {
    /// Directory that was searched
    pub search_dir: PathBuf,
    /// File names that would have been accepted, oldest version first
    pub expected_files: Vec<String>,
    /// Per-version attempts, newest first
    pub attempts: Vec<AttemptResult>,
}

impl fmt::Display for CodecNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not find a supported version of oo2core. Copy ")?;
        match self.expected_files.as_slice() {
            [] => write!(f, "a supported oo2core build")?,
            [only] => write!(f, "{only}")?,
            [init @ .., last] => write!(f, "{}, or {last}", init.join(", "))?,
        }
        write!(f, " into the program folder at \"{}\"", self.search_dir.display())
    }
}

impl std::error::Error for CodecNotFoundError {}

impl CodecNotFoundError {
    /// Format a detailed report of every attempt
    pub fn detailed_report(&self) -> String {
        let mut report = format!("{self}\n");
        for (i, attempt) in self.attempts.iter().enumerate() {
            report.push_str(&format!(
                "  {}. ❌ {} at {} ({}ms)\n",
                i + 1,
                attempt.version,
                attempt.path.display(),
                attempt.duration_ms
            ));
            report.push_str(&format!("      Error: {}\n", attempt.error));
        }
        report
    }
}

/// Chooses and binds the newest available version.
#[derive(Debug, Clone)]
pub struct Resolver {
    probe: Arc<VersionProbe>,
    versions: Vec<SupportedVersion>,
}

impl Resolver {
    /// Resolver over every supported version.
    pub fn new(probe: Arc<VersionProbe>) -> Self {
        Self {
            probe,
            versions: SupportedVersion::NEWEST_FIRST.to_vec(),
        }
    }

    /// Restrict candidates to `versions`. Order is irrelevant; the newest
    /// allowed version is always preferred.
    pub fn with_versions(mut self, versions: impl IntoIterator<Item = SupportedVersion>) -> Self {
        let mut versions: Vec<_> = versions.into_iter().collect();
        versions.sort_unstable_by(|a, b| b.cmp(a));
        versions.dedup();
        self.versions = versions;
        self
    }

    /// Resolver over the process-wide probe.
    pub fn global() -> Self {
        Self::new(VersionProbe::global())
    }

    /// Resolver for a loaded configuration.
    ///
    /// The search directory still yields to `OODLE_LIBRARY_DIR`.
    pub fn from_config(config: &Config) -> Self {
        let dir = super::resolve_search_dir(config.probe.search_dir.as_deref());
        Self::new(Arc::new(VersionProbe::new(dir)))
            .with_versions(config.allowed_versions())
    }

    /// Probe in use.
    pub fn probe(&self) -> &VersionProbe {
        &self.probe
    }

    /// Candidate versions, newest first.
    pub fn versions(&self) -> &[SupportedVersion] {
        &self.versions
    }

    /// Newest allowed version whose binary is present. Does not load it.
    pub fn select_version(&self) -> Option<SupportedVersion> {
        self.versions
            .iter()
            .copied()
            .find(|v| self.probe.is_available(*v))
    }

    /// Bind the newest allowed version that is present and loads.
    ///
    /// A present binary that fails to load is logged and skipped in favor
    /// of the next older one.
    pub fn resolve(&self) -> Result<CodecBinding, CodecNotFoundError> {
        let mut attempts = Vec::with_capacity(self.versions.len());

        for &version in &self.versions {
            let path = self.probe.expected_path(version);

            if !self.probe.is_available(version) {
                attempts.push(AttemptResult::failure(
                    version,
                    path,
                    "not present",
                    Duration::ZERO,
                ));
                continue;
            }

            let start = Instant::now();
            match CodecBinding::load(version, &path) {
                Ok(binding) => {
                    debug!("Selected {version} after {} attempt(s)", attempts.len() + 1);
                    return Ok(binding);
                }
                Err(e) => {
                    warn!("Failed to bind {version}: {e}");
                    attempts.push(AttemptResult::failure(
                        version,
                        path,
                        e.to_string(),
                        start.elapsed(),
                    ));
                }
            }
        }

        Err(self.not_found(attempts))
    }

    fn not_found(&self, attempts: Vec<AttemptResult>) -> CodecNotFoundError {
        let mut oldest_first = self.versions.clone();
        oldest_first.sort_unstable();

        CodecNotFoundError {
            search_dir: self.probe.search_dir().to_path_buf(),
            expected_files: oldest_first
                .into_iter()
                .map(|v| self.probe.file_name(v).to_owned())
                .collect(),
            attempts,
        }
    }

    /// Expected path of `version` under this resolver's probe.
    pub fn expected_path(&self, version: SupportedVersion) -> PathBuf {
        self.probe.expected_path(version)
    }

    /// Search directory of this resolver's probe.
    pub fn search_dir(&self) -> &Path {
        self.probe.search_dir()
    }
}
