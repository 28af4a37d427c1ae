//! Per-version availability cache.
//!
//! A [`VersionProbe`] answers "is the binary for version N present?" for one
//! search directory. Positive answers are cached in an `AtomicBool` per
//! version and never cleared: the set of installed binaries is assumed not
//! to shrink while the process runs.
//!
//! There is no lock. Two threads probing the same version at once both hit
//! the filesystem and both store the same value; the flag only ever moves
//! from false to true, so the race is benign. Negative answers are not
//! cached, which lets a caller retry after an operator drops a binary in.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
};

use tracing::debug;

use super::platform::TargetPlatform;
use crate::native::SupportedVersion;

static GLOBAL: OnceLock<Arc<VersionProbe>> = OnceLock::new();

/// Filesystem probe for installed codec versions.
#[derive(Debug)]
pub struct VersionProbe {
    search_dir: PathBuf,
    platform: TargetPlatform,
    present: [AtomicBool; SupportedVersion::COUNT],
}

impl VersionProbe {
    /// Probe `search_dir` using the running platform's file names.
    pub fn new(search_dir: impl Into<PathBuf>) -> Self {
        Self::with_platform(search_dir, TargetPlatform::current())
    }

    /// Probe `search_dir` using another platform's file names.
    pub fn with_platform(search_dir: impl Into<PathBuf>, platform: TargetPlatform) -> Self {
        Self {
            search_dir: search_dir.into(),
            platform,
            present: Default::default(),
        }
    }

    /// Process-wide probe over [`super::default_search_dir`].
    ///
    /// Created on first use and shared for the rest of the process, so its
    /// cache is the process-wide availability state.
    pub fn global() -> Arc<VersionProbe> {
        GLOBAL
            .get_or_init(|| Arc::new(Self::new(super::default_search_dir())))
            .clone()
    }

    /// Directory being searched.
    pub fn search_dir(&self) -> &Path {
        &self.search_dir
    }

    /// Platform whose naming scheme is used.
    pub fn platform(&self) -> TargetPlatform {
        self.platform
    }

    /// Expected file name of `version`.
    pub fn file_name(&self, version: SupportedVersion) -> &'static str {
        self.platform.file_name(version)
    }

    /// Expected full path of `version`.
    pub fn expected_path(&self, version: SupportedVersion) -> PathBuf {
        self.search_dir.join(self.file_name(version))
    }

    /// Whether the binary for `version` is present.
    pub fn is_available(&self, version: SupportedVersion) -> bool {
        let slot = &self.present[version.index()];
        if slot.load(Ordering::Relaxed) {
            return true;
        }

        let path = self.expected_path(version);
        let found = path.is_file();
        debug!(
            "Probed {version}: {} ({})",
            path.display(),
            if found { "present" } else { "absent" }
        );

        if found {
            slot.store(true, Ordering::Relaxed);
        }
        found
    }

    /// Cached answer without touching the filesystem.
    pub fn is_known_available(&self, version: SupportedVersion) -> bool {
        self.present[version.index()].load(Ordering::Relaxed)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::{
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Fresh, empty directory under the system temp dir.
    pub(crate) fn scratch_dir(tag: &str) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "oodle-dyn-{tag}-{}-{n}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Create an empty file standing in for a codec binary.
    pub(crate) fn touch(dir: &std::path::Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{scratch_dir, touch};
    use super::*;

    #[test]
    fn test_absent_binary_is_not_available() {
        let dir = scratch_dir("absent");
        let probe = VersionProbe::with_platform(&dir, TargetPlatform::Linux);

        for version in SupportedVersion::NEWEST_FIRST {
            assert!(!probe.is_available(version));
            assert!(!probe.is_known_available(version));
        }
    }

    #[test]
    fn test_present_binary_is_cached() {
        let dir = scratch_dir("cached");
        let probe = VersionProbe::with_platform(&dir, TargetPlatform::Linux);
        touch(&dir, "liboo2corelinux64.so.8");

        assert!(!probe.is_known_available(SupportedVersion::V8));
        assert!(probe.is_available(SupportedVersion::V8));
        assert!(probe.is_known_available(SupportedVersion::V8));

        // Monotonic: removing the file does not flip the cached answer back.
        std::fs::remove_file(dir.join("liboo2corelinux64.so.8")).unwrap();
        assert!(probe.is_available(SupportedVersion::V8));
    }

    #[test]
    fn test_negative_answer_is_reprobed() {
        let dir = scratch_dir("reprobe");
        let probe = VersionProbe::with_platform(&dir, TargetPlatform::Windows);

        assert!(!probe.is_available(SupportedVersion::V6));
        touch(&dir, "oo2core_6_win64.dll");
        assert!(probe.is_available(SupportedVersion::V6));
    }

    #[test]
    fn test_directory_with_binary_name_is_not_a_binary() {
        let dir = scratch_dir("dirname");
        std::fs::create_dir_all(dir.join("liboo2coremac64.2.9.dylib")).unwrap();
        let probe = VersionProbe::with_platform(&dir, TargetPlatform::MacOs);

        assert!(!probe.is_available(SupportedVersion::V9));
    }

    #[test]
    fn test_concurrent_probes_agree() {
        let dir = scratch_dir("race");
        touch(&dir, "liboo2corelinux64.so.5");
        let probe = VersionProbe::with_platform(&dir, TargetPlatform::Linux);

        let results: Vec<bool> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| probe.is_available(SupportedVersion::V5)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.into_iter().all(|found| found));
    }
}
