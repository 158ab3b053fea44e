//! MPI implementations requested on the command line and their resolved
//! version sets.

use serde::{Deserialize, Serialize};
use spack_env_manager::PackageTarget;

/// Implementations scanned when none are requested explicitly.
pub const DEFAULT_IMPLEMENTATIONS: &str = "openmpi,mpich,intel-mpi,mvapich2";

/// An implementation as requested, before talking to the package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationRequest {
    /// Package name, e.g. `openmpi`.
    pub name: String,

    /// Whether missing versions may be installed.
    pub install_allowed: bool,
}

impl ImplementationRequest {
    pub fn new(name: impl Into<String>, install_allowed: bool) -> Self {
        Self {
            name: name.into(),
            install_allowed,
        }
    }

    /// Parse a comma separated list such as `openmpi,mpich`. Blank entries
    /// are dropped; order is preserved.
    pub fn parse_list(list: &str, install_allowed: bool) -> Vec<Self> {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Self::new(name, install_allowed))
            .collect()
    }
}

/// What resolution decided for a single published version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    /// Already installed; tested.
    Found,
    /// Installed during resolution; tested.
    Built,
    /// Not installed and installing was not allowed.
    Skipped,
    /// Installation was attempted and failed.
    BuildFailed,
}

impl VersionStatus {
    /// Whether this version takes part in compile-and-run testing.
    pub fn is_active(self) -> bool {
        matches!(self, VersionStatus::Found | VersionStatus::Built)
    }
}

/// Decision taken for one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDecision {
    pub version: String,
    pub status: VersionStatus,
}

/// A resolved implementation: the ordered versions that will be tested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationSpec {
    pub name: String,
    pub install_allowed: bool,

    /// Versions to test, ascending.
    pub active_versions: Vec<String>,

    /// Every published version with its decision, ascending.
    pub decisions: Vec<VersionDecision>,
}

impl ImplementationSpec {
    /// Build from per-version decisions (already sorted).
    pub fn from_decisions(
        request: &ImplementationRequest,
        decisions: Vec<VersionDecision>,
    ) -> Self {
        let active_versions = decisions
            .iter()
            .filter(|d| d.status.is_active())
            .map(|d| d.version.clone())
            .collect();
        Self {
            name: request.name.clone(),
            install_allowed: request.install_allowed,
            active_versions,
            decisions,
        }
    }

    /// Package target for one of this implementation's versions.
    pub fn target(&self, version: &str) -> PackageTarget {
        PackageTarget::new(&self.name, version)
    }

    /// Number of versions with the given status.
    pub fn count(&self, status: VersionStatus) -> usize {
        self.decisions.iter().filter(|d| d.status == status).count()
    }
}
