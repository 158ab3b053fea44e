//! Compile-and-run driver.
//!
//! For every active version of an implementation: compile the source into a
//! fresh temporary executable inside that version's environment, run it if
//! compilation succeeded, and record one [`VersionOutcome`]. Versions are
//! handled strictly one after another.

use spack_env_manager::PackageManager;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, Instrument};

use crate::domain::{
    ImplementationRequest, ImplementationSpec, Result, ResultSet, ScanError, VersionOutcome,
};
use crate::obs;
use crate::resolver::resolve_all;
use crate::runner::{ProcessRunner, DEFAULT_TIMEOUT};

/// Compiler wrapper used when none is configured.
pub const DEFAULT_COMPILER: &str = "mpicc";

/// Configuration for compiling and running the user's source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Compiler command line, invoked as `<compiler...> <source> -o <exe>`.
    pub compiler: Vec<String>,

    /// Timeout applied to compilation and to execution separately.
    pub timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            compiler: vec![DEFAULT_COMPILER.to_string()],
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DriverConfig {
    /// `compiler` may carry flags, e.g. `mpicc -O2`; it is split on whitespace.
    pub fn new(compiler: &str, timeout: Duration) -> Self {
        let compiler: Vec<String> = compiler.split_whitespace().map(String::from).collect();
        if compiler.is_empty() {
            return Self {
                timeout,
                ..Self::default()
            };
        }
        Self { compiler, timeout }
    }

    fn compile_command(&self, source: &Path, exe: &Path) -> Vec<String> {
        let mut argv = self.compiler.clone();
        argv.push(source.to_string_lossy().into_owned());
        argv.push("-o".to_string());
        argv.push(exe.to_string_lossy().into_owned());
        argv
    }
}

/// Fail with [`ScanError::NotARegularFile`] unless `path` is a regular file.
pub fn ensure_regular_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ScanError::NotARegularFile(path.to_path_buf()))
    }
}

/// Compiles and runs one source file against resolved implementations.
pub struct Driver<'a, P: PackageManager + ?Sized> {
    pm: &'a P,
    config: DriverConfig,
    runner: ProcessRunner,
}

impl<'a, P: PackageManager + ?Sized> Driver<'a, P> {
    pub fn new(pm: &'a P, config: DriverConfig) -> Self {
        let runner = ProcessRunner::new(config.timeout);
        Self { pm, config, runner }
    }

    /// One outcome per active version, in version order. Individual failures
    /// are recorded, never returned as errors.
    pub async fn compile_and_run(
        &self,
        spec: &ImplementationSpec,
        source: &Path,
    ) -> Result<Vec<VersionOutcome>> {
        let mut outcomes = Vec::with_capacity(spec.active_versions.len());
        for version in &spec.active_versions {
            outcomes.push(self.run_version(spec, version, source).await?);
        }
        Ok(outcomes)
    }

    async fn run_version(
        &self,
        spec: &ImplementationSpec,
        version: &str,
        source: &Path,
    ) -> Result<VersionOutcome> {
        let target = spec.target(version);
        info!("Running {} against {}", source.display(), target);

        // Dropping the TempPath removes the executable on every path out of here.
        let exe = tempfile::Builder::new()
            .prefix("mpiscan-")
            .suffix(".exe")
            .tempfile()?
            .into_temp_path();

        let compile = self.config.compile_command(source, &exe);
        let compiled = self
            .runner
            .run_in_package_env(self.pm, Some(&target), &compile)
            .await;
        info!(
            "Compilation of {}:\n{}",
            target,
            compiled.stdout.as_deref().unwrap_or_default()
        );
        obs::emit_version_compiled(&target.to_string(), compiled.status);

        if !compiled.success() {
            return Ok(VersionOutcome::new(version, None, compiled.status));
        }

        let executed = self
            .runner
            .run_in_package_env(
                self.pm,
                Some(&target),
                &[exe.to_string_lossy().into_owned()],
            )
            .await;
        if let Err(e) = exe.close() {
            debug!("could not remove temporary executable: {}", e);
        }
        info!(
            "Execution of {}:\n{}",
            target,
            executed.stdout.as_deref().unwrap_or_default()
        );
        obs::emit_version_executed(
            &target.to_string(),
            executed.status,
            executed.stdout.is_some(),
        );

        Ok(VersionOutcome::new(version, executed.stdout, executed.status))
    }
}

/// Full scan: validate the source, resolve every requested implementation,
/// then compile and run against each one in request order.
///
/// Resolution happens for all implementations before anything is compiled,
/// so an unknown package aborts the scan early.
pub async fn scan<P>(
    pm: &P,
    requests: &[ImplementationRequest],
    source: &Path,
    config: DriverConfig,
) -> Result<ResultSet>
where
    P: PackageManager + ?Sized,
{
    ensure_regular_file(source)?;
    let start = Instant::now();
    obs::emit_scan_started(
        &source.display().to_string(),
        requests.len(),
        requests.iter().any(|r| r.install_allowed),
    );

    let specs = resolve_all(pm, requests).await?;
    let driver = Driver::new(pm, config);

    let mut results = ResultSet::new();
    for spec in &specs {
        let outcomes = driver
            .compile_and_run(spec, source)
            .instrument(obs::implementation_span(&spec.name))
            .await?;
        results.insert(spec.name.clone(), outcomes);
    }

    obs::emit_scan_finished(
        results.len(),
        results.values().map(Vec::len).sum(),
        start.elapsed().as_millis() as u64,
    );
    Ok(results)
}
