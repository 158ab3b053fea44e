//! Spack-Env-Manager: Spack integration for mpiscan
//!
//! This crate is the package-manager layer of mpiscan. It answers which
//! MPI versions Spack knows about, which are installed, installs missing
//! ones on request, and produces the shell fragment that loads a package
//! environment.
//!
//! Spack itself is treated as an opaque command-line collaborator behind the
//! [`PackageManager`] trait; [`fakes::MemoryPackageManager`] stands in for it
//! in tests.

pub mod error;
pub mod fakes;
pub mod package_manager;
pub mod spack;

pub use error::SpackError;
pub use package_manager::{EnvOverlay, PackageManager, PackageTarget};
pub use spack::{
    is_spack_available, parse_info_versions, SpackClient, SpackConfig, DEFAULT_SPACK,
};

/// Result type for Spack operations
pub type Result<T> = std::result::Result<T, SpackError>;
