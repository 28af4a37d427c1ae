//! Platform file-name table.
//!
//! The binary name of each supported version depends only on the target
//! platform. The table is data, resolved once; nothing else in the crate
//! branches on the operating system.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::native::SupportedVersion;

/// Platforms with a distinct oo2core naming scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPlatform {
    /// `oo2core_N_win64.dll`
    Windows,
    /// `liboo2coremac64.2.N.dylib`
    MacOs,
    /// `liboo2corelinux64.so.N`
    Linux,
}

/// Platform of the running build. Other Unix-likes use the ELF names.
pub const CURRENT_PLATFORM: TargetPlatform = if cfg!(target_os = "windows") {
    TargetPlatform::Windows
} else if cfg!(target_os = "macos") {
    TargetPlatform::MacOs
} else {
    TargetPlatform::Linux
};

// Rows follow `SupportedVersion::index`; columns follow `TargetPlatform::column`.
const FILE_NAMES: [[&str; 3]; SupportedVersion::COUNT] = [
    [
        "oo2core_5_win64.dll",
        "liboo2coremac64.2.5.dylib",
        "liboo2corelinux64.so.5",
    ],
    [
        "oo2core_6_win64.dll",
        "liboo2coremac64.2.6.dylib",
        "liboo2corelinux64.so.6",
    ],
    [
        "oo2core_8_win64.dll",
        "liboo2coremac64.2.8.dylib",
        "liboo2corelinux64.so.8",
    ],
    [
        "oo2core_9_win64.dll",
        "liboo2coremac64.2.9.dylib",
        "liboo2corelinux64.so.9",
    ],
];

impl TargetPlatform {
    /// Platform of the running build.
    pub const fn current() -> Self {
        CURRENT_PLATFORM
    }

    const fn column(self) -> usize {
        match self {
            Self::Windows => 0,
            Self::MacOs => 1,
            Self::Linux => 2,
        }
    }

    /// Expected binary name of `version` on this platform.
    pub const fn file_name(self, version: SupportedVersion) -> &'static str {
        FILE_NAMES[version.index()][self.column()]
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names_per_platform() {
        assert_eq!(
            TargetPlatform::Windows.file_name(SupportedVersion::V5),
            "oo2core_5_win64.dll"
        );
        assert_eq!(
            TargetPlatform::MacOs.file_name(SupportedVersion::V8),
            "liboo2coremac64.2.8.dylib"
        );
        assert_eq!(
            TargetPlatform::Linux.file_name(SupportedVersion::V9),
            "liboo2corelinux64.so.9"
        );
    }

    #[test]
    fn test_every_name_mentions_its_major_version() {
        for platform in [
            TargetPlatform::Windows,
            TargetPlatform::MacOs,
            TargetPlatform::Linux,
        ] {
            for version in SupportedVersion::NEWEST_FIRST {
                let name = platform.file_name(version);
                assert!(
                    name.contains(&version.major().to_string()),
                    "{name} does not match {version}"
                );
            }
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_platform_linux() {
        assert_eq!(TargetPlatform::current(), TargetPlatform::Linux);
    }
}
