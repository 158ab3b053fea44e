//! Package manager abstraction
//!
//! mpiscan only needs five questions answered by the package manager:
//! does a spec exist, which versions are published, is a version installed,
//! install it, and how do I load its environment. Everything else about
//! Spack stays opaque behind this trait.

use async_trait::async_trait;
use std::fmt;

use crate::Result;

/// A concrete `name@version` package request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageTarget {
    pub name: String,
    pub version: String,
}

impl PackageTarget {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        PackageTarget {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PackageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Shell fragment that applies a package environment when sourced ahead of a
/// command. The empty overlay leaves the environment untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay(String);

impl EnvOverlay {
    pub fn new(script: impl Into<String>) -> Self {
        EnvOverlay(script.into())
    }

    /// Overlay that performs no environment loading.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The raw script fragment.
    pub fn script(&self) -> &str {
        &self.0
    }
}

/// Operations mpiscan needs from a package manager.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Whether the package manager can resolve a spec for the bare name.
    async fn has_spec(&self, name: &str) -> Result<bool>;

    /// Every published version for `name`, raw and unsorted.
    async fn list_versions(&self, name: &str) -> Result<Vec<String>>;

    /// Whether exactly `target` is already installed.
    async fn is_installed(&self, target: &PackageTarget) -> Result<bool>;

    /// Build and install `target`.
    async fn install(&self, target: &PackageTarget) -> Result<()>;

    /// Shell fragment loading the environment of `target`.
    async fn load_env(&self, target: &PackageTarget) -> Result<EnvOverlay>;
}
