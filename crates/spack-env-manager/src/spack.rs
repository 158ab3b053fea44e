//! Spack command-line client
//!
//! Implements [`PackageManager`] by shelling out to the `spack` binary.

use crate::error::SpackError;
use crate::package_manager::{EnvOverlay, PackageManager, PackageTarget};
use crate::Result;
use async_trait::async_trait;
use regex::Regex;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, warn};

/// Spack executable looked up on `PATH` when none is configured.
pub const DEFAULT_SPACK: &str = "spack";

/// Spack configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpackConfig {
    /// Path or name of the spack executable
    pub spack_bin: String,
}

impl Default for SpackConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SPACK)
    }
}

impl SpackConfig {
    /// Create config for a specific spack executable
    pub fn new(spack_bin: &str) -> Self {
        SpackConfig {
            spack_bin: spack_bin.to_string(),
        }
    }
}

/// Check whether the configured spack executable can be run
pub async fn is_spack_available(config: &SpackConfig) -> bool {
    Command::new(&config.spack_bin)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Extract version tokens from `spack info` output.
///
/// Spack lists versions as `<indent><version><spaces><url>`; anything else in
/// the listing is ignored. Order of appearance is kept, duplicates included.
pub fn parse_info_versions(info: &str) -> Vec<String> {
    let re = Regex::new(r"(?m)\s+([0-9.]+)\s+http").expect("static regex is valid");
    re.captures_iter(info)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Spack client backed by the `spack` CLI
#[derive(Debug, Clone, Default)]
pub struct SpackClient {
    config: SpackConfig,
}

impl SpackClient {
    /// Create a new Spack client
    pub fn new(config: SpackConfig) -> Self {
        SpackClient { config }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.config.spack_bin);
        cmd.args(args).stdin(Stdio::null());
        cmd
    }

    /// Run spack with all output discarded, returning whether it succeeded.
    async fn run_silent(&self, args: &[&str]) -> Result<bool> {
        debug!("spack {}", args.join(" "));
        let status = self
            .command(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;
        Ok(status.success())
    }

    /// Run spack capturing stdout and stderr.
    async fn run_captured(&self, args: &[&str]) -> Result<Output> {
        debug!("spack {}", args.join(" "));
        self.command(args)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))
    }

    fn spawn_error(&self, err: std::io::Error) -> SpackError {
        if err.kind() == std::io::ErrorKind::NotFound {
            SpackError::SpackNotFound(self.config.spack_bin.clone())
        } else {
            SpackError::Io(err)
        }
    }
}

#[async_trait]
impl PackageManager for SpackClient {
    async fn has_spec(&self, name: &str) -> Result<bool> {
        self.run_silent(&["spec", name]).await
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        let output = self.run_captured(&["info", name]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpackError::CommandFailed(format!(
                "spack info {}: {}",
                name,
                stderr.trim()
            )));
        }
        Ok(parse_info_versions(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn is_installed(&self, target: &PackageTarget) -> Result<bool> {
        self.run_silent(&["find", &target.to_string()]).await
    }

    async fn install(&self, target: &PackageTarget) -> Result<()> {
        let spec = target.to_string();
        let output = self.run_captured(&["install", &spec]).await?;
        debug!("spack install {}:\n{}", spec, String::from_utf8_lossy(&output.stdout));

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if let Some(last) = stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                warn!("spack install {}: {}", spec, last.trim());
            }
            return Err(SpackError::InstallFailed {
                target: spec,
                code: output.status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }

    async fn load_env(&self, target: &PackageTarget) -> Result<EnvOverlay> {
        let spec = target.to_string();
        let output = self.run_captured(&["load", "--sh", &spec]).await?;
        if !output.status.success() {
            return Err(SpackError::EnvUnavailable(spec));
        }
        Ok(EnvOverlay::new(String::from_utf8_lossy(&output.stdout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    const INFO_SAMPLE: &str = "\
AutotoolsPackage:   openmpi

Description:
    An open source Message Passing Interface implementation.

Preferred version:
    4.1.5    https://download.open-mpi.org/release/open-mpi/v4.1/openmpi-4.1.5.tar.bz2

Safe versions:
    5.0.0    https://download.open-mpi.org/release/open-mpi/v5.0/openmpi-5.0.0.tar.bz2
    4.1.5    https://download.open-mpi.org/release/open-mpi/v4.1/openmpi-4.1.5.tar.bz2
    4.0.7    https://download.open-mpi.org/release/open-mpi/v4.0/openmpi-4.0.7.tar.bz2

Deprecated versions:
    None
";

    /// Write an executable fake `spack` that dispatches on its first argument.
    fn fake_spack(dir: &std::path::Path, body: &str) -> SpackConfig {
        let path = dir.join("spack");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        SpackConfig::new(path.to_str().unwrap())
    }

    #[test]
    fn test_parse_info_versions() {
        let versions = parse_info_versions(INFO_SAMPLE);
        assert_eq!(versions, vec!["4.1.5", "5.0.0", "4.1.5", "4.0.7"]);
    }

    #[test]
    fn test_parse_info_versions_ignores_unlisted() {
        assert!(parse_info_versions("Description:\n    no urls here\n").is_empty());
    }

    #[test]
    fn test_config_new() {
        let config = SpackConfig::new("/opt/spack/bin/spack");
        assert_eq!(config.spack_bin, "/opt/spack/bin/spack");
    }

    #[test]
    fn test_default_config() {
        assert_eq!(SpackConfig::default().spack_bin, DEFAULT_SPACK);
    }

    #[tokio::test]
    async fn test_missing_spack_not_available() {
        let config = SpackConfig::new("/nonexistent/mpiscan/spack");
        assert!(!is_spack_available(&config).await);
    }

    #[tokio::test]
    async fn test_fake_spack_available() {
        let dir = tempdir().unwrap();
        let config = fake_spack(dir.path(), r#"[ "$1" = "--version" ]"#);
        assert!(is_spack_available(&config).await);
    }

    #[tokio::test]
    async fn test_missing_spack_reports_not_found() {
        let client = SpackClient::new(SpackConfig::new("/nonexistent/mpiscan/spack"));
        let err = client.has_spec("openmpi").await.unwrap_err();
        assert!(matches!(err, SpackError::SpackNotFound(_)));
    }

    #[tokio::test]
    async fn test_client_against_fake_spack() {
        let dir = tempdir().unwrap();
        let info = dir.path().join("info.txt");
        std::fs::write(&info, INFO_SAMPLE).unwrap();
        let config = fake_spack(
            dir.path(),
            &format!(
                r#"case "$1" in
  spec) [ "$2" = "openmpi" ] ;;
  info) cat "{}" ;;
  find) [ "$2" = "openmpi@4.1.5" ] ;;
  install) echo "building $2"; exit 3 ;;
  load) echo "export MPI_HOME=/opt/$3;" ;;
esac"#,
                info.display()
            ),
        );
        let client = SpackClient::new(config);

        assert!(client.has_spec("openmpi").await.unwrap());
        assert!(!client.has_spec("nompi").await.unwrap());
        assert_eq!(client.list_versions("openmpi").await.unwrap().len(), 4);

        let installed = PackageTarget::new("openmpi", "4.1.5");
        let missing = PackageTarget::new("openmpi", "5.0.0");
        assert!(client.is_installed(&installed).await.unwrap());
        assert!(!client.is_installed(&missing).await.unwrap());

        let err = client.install(&missing).await.unwrap_err();
        assert!(matches!(err, SpackError::InstallFailed { code: 3, .. }));

        let overlay = client.load_env(&installed).await.unwrap();
        assert_eq!(overlay.script().trim(), "export MPI_HOME=/opt/openmpi@4.1.5;");
    }

    #[tokio::test]
    async fn test_load_env_failure_is_env_unavailable() {
        let dir = tempdir().unwrap();
        let client = SpackClient::new(fake_spack(dir.path(), "exit 1"));
        let err = client
            .load_env(&PackageTarget::new("mpich", "4.2.0"))
            .await
            .unwrap_err();
        assert!(matches!(err, SpackError::EnvUnavailable(ref t) if t == "mpich@4.2.0"));
    }
}
