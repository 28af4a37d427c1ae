//! Diagnostic reporting for codec availability
//!
//! Explains which oo2core builds a probe can see and what an operator
//! should do when the answer is "none".

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{availability::VersionProbe, platform::TargetPlatform};
use crate::native::SupportedVersion;

/// Availability snapshot of one search directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// When the probe ran
    pub probed_at: DateTime<Utc>,
    /// Naming scheme in use
    pub platform: TargetPlatform,
    /// Directory searched
    pub search_dir: PathBuf,
    /// Per-version results, newest first
    pub versions: Vec<VersionReport>,
    /// Version `resolve()` would try first
    pub selected: Option<SupportedVersion>,
    /// What to do about it
    pub recommendations: Vec<String>,
}

/// Probe result for a single version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionReport {
    /// Which version
    pub version: SupportedVersion,
    /// Expected binary name
    pub file_name: String,
    /// Expected full path
    pub path: PathBuf,
    /// Was a file there?
    pub available: bool,
}

/// Probe every supported version and summarize the result.
pub fn run_diagnostics(probe: &VersionProbe) -> DiagnosticReport {
    let versions: Vec<VersionReport> = SupportedVersion::NEWEST_FIRST
        .into_iter()
        .map(|version| VersionReport {
            version,
            file_name: probe.file_name(version).to_owned(),
            path: probe.expected_path(version),
            available: probe.is_available(version),
        })
        .collect();

    let selected = versions.iter().find(|v| v.available).map(|v| v.version);

    let mut recommendations = Vec::new();
    match selected {
        None => {
            let names: Vec<&str> = versions
                .iter()
                .rev()
                .map(|v| v.file_name.as_str())
                .collect();
            recommendations.push(format!(
                "Copy one of {} into {}",
                names.join(", "),
                probe.search_dir().display()
            ));
            recommendations.push(
                "Or point OODLE_LIBRARY_DIR at the directory that holds them".into(),
            );
        }
        Some(version) if version != SupportedVersion::V9 => {
            recommendations.push(format!(
                "Using {version}; install {} to use the newest supported build",
                probe.file_name(SupportedVersion::V9)
            ));
        }
        Some(_) => {}
    }

    DiagnosticReport {
        probed_at: Utc::now(),
        platform: probe.platform(),
        search_dir: probe.search_dir().to_path_buf(),
        versions,
        selected,
        recommendations,
    }
}

impl DiagnosticReport {
    /// Human-readable rendering
    pub fn format_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\noo2core availability ({}, probed {})\n",
            self.platform,
            self.probed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!(
            "Search directory: {}\n\n",
            self.search_dir.display()
        ));

        for report in &self.versions {
            let status = if report.available { "✅" } else { "❌" };
            output.push_str(&format!(
                "  {status} {} - {}\n",
                report.version, report.file_name
            ));
        }
        output.push('\n');

        match self.selected {
            Some(version) => output.push_str(&format!("Selected: {version}\n")),
            None => output.push_str("Selected: none\n"),
        }

        if !self.recommendations.is_empty() {
            output.push_str("\n=== Recommendations ===\n\n");
            for rec in &self.recommendations {
                output.push_str(&format!("  • {rec}\n"));
            }
        }

        output
    }
}
