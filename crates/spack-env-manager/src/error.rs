//! Error types for spack-env-manager

use thiserror::Error;

/// Errors that can occur while talking to Spack
#[derive(Error, Debug)]
pub enum SpackError {
    /// Spack binary not found
    #[error("Spack is not installed or not in PATH ({0})")]
    SpackNotFound(String),

    /// Spack command execution failed
    #[error("Spack command failed: {0}")]
    CommandFailed(String),

    /// `spack install` returned non-zero
    #[error("Failed to install {target} (exit code {code})")]
    InstallFailed { target: String, code: i32 },

    /// `spack load --sh` returned non-zero
    #[error("Environment unavailable for {0}")]
    EnvUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
