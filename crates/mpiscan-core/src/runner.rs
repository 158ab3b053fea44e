//! Process runner: one external command, bounded by a timeout, optionally
//! inside a package environment.
//!
//! The environment overlay and the quoted command are written to a throwaway
//! shell script that runs under `sh`, so variables exported by the overlay
//! apply to the command without touching this process's environment.
//! Failures never escape as errors; they come back as a status code.

use spack_env_manager::{EnvOverlay, PackageManager, PackageTarget};
use std::io::Write;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

/// Status reported when the command exceeded its timeout.
pub const TIMEOUT_STATUS: i32 = -1;

/// Status reported when the package environment could not be loaded.
pub const ENV_UNAVAILABLE_STATUS: i32 = 1;

/// Status reported when the command could not be started at all.
pub const SPAWN_FAILURE_STATUS: i32 = 127;

/// Default per-command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Result of a single command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Captured stdout; only present for a successful run that printed something.
    pub stdout: Option<String>,

    /// 0 on success, the child's exit code otherwise, `-signal` when killed
    /// by a signal, or one of the `*_STATUS` constants.
    pub status: i32,

    /// Whether the timeout fired.
    pub timed_out: bool,
}

impl RunOutcome {
    fn failed(status: i32) -> Self {
        Self {
            stdout: None,
            status,
            timed_out: false,
        }
    }

    fn timed_out() -> Self {
        Self {
            stdout: None,
            status: TIMEOUT_STATUS,
            timed_out: true,
        }
    }

    /// Whether the command ran to completion with status 0.
    pub fn success(&self) -> bool {
        self.status == 0 && !self.timed_out
    }
}

/// Quote one argument for safe embedding in a POSIX shell script.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Script text: overlay first, then the quoted command line.
pub fn render_script(overlay: &EnvOverlay, argv: &[String]) -> String {
    let mut script = String::from(overlay.script());
    if !script.is_empty() && !script.ends_with('\n') {
        script.push('\n');
    }
    let command: Vec<String> = argv.iter().map(|a| shell_quote(a)).collect();
    script.push_str(&command.join(" "));
    script.push('\n');
    script
}

fn write_script(overlay: &EnvOverlay, argv: &[String]) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("mpiscan-")
        .suffix(".sh")
        .tempfile()?;
    file.write_all(render_script(overlay, argv).as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    1
}

/// SIGKILL everything in the process group led by `pgid`.
async fn kill_process_group(pgid: u32) {
    let result = Command::new("kill")
        .args(["-KILL", "--", &format!("-{}", pgid)])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = result {
        debug!("could not kill process group {}: {}", pgid, e);
    }
}

/// Runs commands with a fixed timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `argv` after applying `overlay`.
    ///
    /// Stderr is discarded. On timeout the command's whole process group is
    /// killed so MPI launchers do not leave ranks behind.
    pub async fn run(&self, overlay: &EnvOverlay, argv: &[String]) -> RunOutcome {
        if argv.is_empty() {
            warn!("refusing to run an empty command");
            return RunOutcome::failed(SPAWN_FAILURE_STATUS);
        }

        let script = match write_script(overlay, argv) {
            Ok(script) => script,
            Err(e) => {
                warn!("could not write command script: {}", e);
                return RunOutcome::failed(SPAWN_FAILURE_STATUS);
            }
        };

        debug!("running {}", argv.join(" "));
        let mut cmd = Command::new("sh");
        cmd.arg(script.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("could not start {}: {}", argv[0], e);
                return RunOutcome::failed(SPAWN_FAILURE_STATUS);
            }
        };
        let pgid = child.id();

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let status = exit_code(output.status);
                let stdout = if status == 0 && !output.stdout.is_empty() {
                    Some(String::from_utf8_lossy(&output.stdout).into_owned())
                } else {
                    None
                };
                RunOutcome {
                    stdout,
                    status,
                    timed_out: false,
                }
            }
            Ok(Err(e)) => {
                warn!("failed waiting for {}: {}", argv[0], e);
                RunOutcome::failed(SPAWN_FAILURE_STATUS)
            }
            Err(_) => {
                warn!(
                    "command timed out after {}s: {}",
                    self.timeout.as_secs_f64(),
                    argv.join(" ")
                );
                if let Some(pgid) = pgid {
                    kill_process_group(pgid).await;
                }
                RunOutcome::timed_out()
            }
        }
    }

    /// Run `argv` inside the environment of `target`, or with no
    /// environment loading when `target` is `None`.
    ///
    /// If the package manager cannot produce the environment the command is
    /// not attempted and [`ENV_UNAVAILABLE_STATUS`] is returned.
    pub async fn run_in_package_env<P>(
        &self,
        pm: &P,
        target: Option<&PackageTarget>,
        argv: &[String],
    ) -> RunOutcome
    where
        P: PackageManager + ?Sized,
    {
        let overlay = match target {
            None => EnvOverlay::empty(),
            Some(target) => match pm.load_env(target).await {
                Ok(overlay) => overlay,
                Err(e) => {
                    warn!("{}", e);
                    return RunOutcome::failed(ENV_UNAVAILABLE_STATUS);
                }
            },
        };
        self.run(&overlay, argv).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spack_env_manager::fakes::MemoryPackageManager;
    use std::time::Instant;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_render_script_prepends_overlay() {
        let overlay = EnvOverlay::new("export PATH=/opt/mpi/bin:$PATH;");
        let script = render_script(&overlay, &argv(&["mpicc", "a b.c", "-o", "x"]));
        assert_eq!(
            script,
            "export PATH=/opt/mpi/bin:$PATH;\n'mpicc' 'a b.c' '-o' 'x'\n"
        );
    }

    #[test]
    fn test_render_script_without_overlay() {
        let script = render_script(&EnvOverlay::empty(), &argv(&["./a.out"]));
        assert_eq!(script, "'./a.out'\n");
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let outcome = ProcessRunner::default()
            .run(&EnvOverlay::empty(), &argv(&["echo", "hello"]))
            .await;
        assert!(outcome.success());
        assert_eq!(outcome.stdout.as_deref(), Some("hello\n"));
    }

    #[tokio::test]
    async fn test_arguments_survive_quoting() {
        let outcome = ProcessRunner::default()
            .run(&EnvOverlay::empty(), &argv(&["printf", "%s|", "a b", "it's", "$HOME"]))
            .await;
        assert_eq!(outcome.stdout.as_deref(), Some("a b|it's|$HOME|"));
    }

    #[tokio::test]
    async fn test_stderr_discarded() {
        let outcome = ProcessRunner::default()
            .run(
                &EnvOverlay::empty(),
                &argv(&["sh", "-c", "echo oops >&2; echo out"]),
            )
            .await;
        assert_eq!(outcome.stdout.as_deref(), Some("out\n"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_has_no_output() {
        let outcome = ProcessRunner::default()
            .run(&EnvOverlay::empty(), &argv(&["sh", "-c", "echo partial; exit 3"]))
            .await;
        assert_eq!(outcome.status, 3);
        assert!(outcome.stdout.is_none());
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn test_empty_stdout_is_absent() {
        let outcome = ProcessRunner::default()
            .run(&EnvOverlay::empty(), &argv(&["true"]))
            .await;
        assert!(outcome.success());
        assert!(outcome.stdout.is_none());
    }

    #[tokio::test]
    async fn test_overlay_applies_to_command() {
        let overlay = EnvOverlay::new("MPISCAN_GREETING=hi; export MPISCAN_GREETING;");
        let outcome = ProcessRunner::default()
            .run(&overlay, &argv(&["sh", "-c", "echo $MPISCAN_GREETING"]))
            .await;
        assert_eq!(outcome.stdout.as_deref(), Some("hi\n"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let start = Instant::now();
        let outcome = ProcessRunner::new(Duration::from_millis(300))
            .run(&EnvOverlay::empty(), &argv(&["sleep", "30"]))
            .await;
        assert!(outcome.timed_out);
        assert_eq!(outcome.status, TIMEOUT_STATUS);
        assert!(outcome.stdout.is_none());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_timeout_kills_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("survivor");
        let script = format!("(sleep 2; touch '{}') & sleep 30", marker.display());

        let outcome = ProcessRunner::new(Duration::from_millis(300))
            .run(&EnvOverlay::empty(), &argv(&["sh", "-c", &script]))
            .await;
        assert!(outcome.timed_out);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists(), "background child outlived the timeout");
    }

    #[tokio::test]
    async fn test_env_unavailable_skips_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let pm = MemoryPackageManager::new().with_broken_env("openmpi", "4.1.5");
        let target = PackageTarget::new("openmpi", "4.1.5");

        let outcome = ProcessRunner::default()
            .run_in_package_env(
                &pm,
                Some(&target),
                &argv(&["touch", marker.to_str().unwrap()]),
            )
            .await;
        assert_eq!(outcome.status, ENV_UNAVAILABLE_STATUS);
        assert!(outcome.stdout.is_none());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_package_env_overlay_used() {
        let pm = MemoryPackageManager::new().with_overlay(
            "mpich",
            "4.2.0",
            "MPICH_DIR=/opt/mpich-4.2.0; export MPICH_DIR;",
        );
        let target = PackageTarget::new("mpich", "4.2.0");
        let outcome = ProcessRunner::default()
            .run_in_package_env(&pm, Some(&target), &argv(&["sh", "-c", "echo $MPICH_DIR"]))
            .await;
        assert_eq!(outcome.stdout.as_deref(), Some("/opt/mpich-4.2.0\n"));
    }

    #[tokio::test]
    async fn test_no_target_means_no_env_loading() {
        let pm = MemoryPackageManager::new();
        let outcome = ProcessRunner::default()
            .run_in_package_env(&pm, None, &argv(&["echo", "bare"]))
            .await;
        assert_eq!(outcome.stdout.as_deref(), Some("bare\n"));
    }
}
