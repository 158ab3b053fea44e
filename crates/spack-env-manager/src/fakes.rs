//! In-memory package manager fake (testing only)
//!
//! `MemoryPackageManager` satisfies the [`PackageManager`] contract without
//! touching Spack, so resolver and driver behaviour can be exercised offline.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::SpackError;
use crate::package_manager::{EnvOverlay, PackageManager, PackageTarget};
use crate::Result;

/// In-memory package manager built up with `with_*` calls.
#[derive(Debug, Default)]
pub struct MemoryPackageManager {
    published: HashMap<String, Vec<String>>,
    installed: Mutex<HashSet<String>>,
    failing_installs: HashSet<String>,
    broken_envs: HashSet<String>,
    overlays: HashMap<String, String>,
    install_attempts: Mutex<Vec<String>>,
}

impl MemoryPackageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package and the versions it publishes (raw order kept).
    pub fn with_package(mut self, name: &str, versions: &[&str]) -> Self {
        self.published.insert(
            name.to_string(),
            versions.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Mark `name@version` as already installed.
    pub fn with_installed(self, name: &str, version: &str) -> Self {
        self.installed
            .lock()
            .unwrap()
            .insert(PackageTarget::new(name, version).to_string());
        self
    }

    /// Make `spack install name@version` fail.
    pub fn with_failing_install(mut self, name: &str, version: &str) -> Self {
        self.failing_installs
            .insert(PackageTarget::new(name, version).to_string());
        self
    }

    /// Make `spack load name@version` fail.
    pub fn with_broken_env(mut self, name: &str, version: &str) -> Self {
        self.broken_envs
            .insert(PackageTarget::new(name, version).to_string());
        self
    }

    /// Overlay script returned when loading `name@version`.
    pub fn with_overlay(mut self, name: &str, version: &str, script: &str) -> Self {
        self.overlays.insert(
            PackageTarget::new(name, version).to_string(),
            script.to_string(),
        );
        self
    }

    /// Every `name@version` passed to `install`, in call order.
    pub fn install_attempts(&self) -> Vec<String> {
        self.install_attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageManager for MemoryPackageManager {
    async fn has_spec(&self, name: &str) -> Result<bool> {
        Ok(self.published.contains_key(name))
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        self.published.get(name).cloned().ok_or_else(|| {
            SpackError::CommandFailed(format!("spack info {}: unknown package", name))
        })
    }

    async fn is_installed(&self, target: &PackageTarget) -> Result<bool> {
        Ok(self.installed.lock().unwrap().contains(&target.to_string()))
    }

    async fn install(&self, target: &PackageTarget) -> Result<()> {
        let spec = target.to_string();
        self.install_attempts.lock().unwrap().push(spec.clone());
        if self.failing_installs.contains(&spec) {
            return Err(SpackError::InstallFailed {
                target: spec,
                code: 1,
            });
        }
        self.installed.lock().unwrap().insert(spec);
        Ok(())
    }

    async fn load_env(&self, target: &PackageTarget) -> Result<EnvOverlay> {
        let spec = target.to_string();
        if self.broken_envs.contains(&spec) {
            return Err(SpackError::EnvUnavailable(spec));
        }
        Ok(self
            .overlays
            .get(&spec)
            .map(|s| EnvOverlay::new(s.as_str()))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_install_marks_installed() {
        let pm = MemoryPackageManager::new().with_package("mpich", &["4.2.0"]);
        let target = PackageTarget::new("mpich", "4.2.0");

        assert!(!pm.is_installed(&target).await.unwrap());
        pm.install(&target).await.unwrap();
        assert!(pm.is_installed(&target).await.unwrap());
        assert_eq!(pm.install_attempts(), vec!["mpich@4.2.0"]);
    }

    #[tokio::test]
    async fn test_failing_install_stays_uninstalled() {
        let pm = MemoryPackageManager::new()
            .with_package("mpich", &["4.2.0"])
            .with_failing_install("mpich", "4.2.0");
        let target = PackageTarget::new("mpich", "4.2.0");

        assert!(pm.install(&target).await.is_err());
        assert!(!pm.is_installed(&target).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_package() {
        let pm = MemoryPackageManager::new();
        assert!(!pm.has_spec("openmpi").await.unwrap());
        assert!(pm.list_versions("openmpi").await.is_err());
    }

    #[tokio::test]
    async fn test_overlay_lookup() {
        let pm = MemoryPackageManager::new()
            .with_overlay("openmpi", "4.1.5", "export A=1;")
            .with_broken_env("openmpi", "5.0.0");

        let overlay = pm
            .load_env(&PackageTarget::new("openmpi", "4.1.5"))
            .await
            .unwrap();
        assert_eq!(overlay.script(), "export A=1;");

        let default = pm
            .load_env(&PackageTarget::new("openmpi", "4.0.7"))
            .await
            .unwrap();
        assert!(default.is_empty());

        assert!(pm
            .load_env(&PackageTarget::new("openmpi", "5.0.0"))
            .await
            .is_err());
    }
}
