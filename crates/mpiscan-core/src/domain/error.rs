//! Error taxonomy for mpiscan.
//!
//! Everything here is fatal for the run. Per-version failures (compile,
//! execution, timeout, install) are recorded as outcomes instead and never
//! become a `ScanError`.

use std::path::PathBuf;

/// mpiscan errors.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("no such spack package '{0}'")]
    UnknownPackage(String),

    #[error("cannot find any version for {0}")]
    NoVersions(String),

    #[error("{} is not a regular file", .0.display())]
    NotARegularFile(PathBuf),

    #[error("you need to provide a file to compile and run with -s/--source")]
    MissingSource,

    #[error("package manager error: {0}")]
    PackageManager(#[from] spack_env_manager::SpackError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mpiscan operations.
pub type Result<T> = std::result::Result<T, ScanError>;
