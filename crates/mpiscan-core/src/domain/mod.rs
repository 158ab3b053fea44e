//! Domain models for mpiscan.
//!
//! - `ImplementationRequest` / `ImplementationSpec`: an MPI package before and
//!   after version resolution
//! - `VersionOutcome`: what happened for one version
//! - `ResultSet`: everything that gets rendered

pub mod error;
pub mod implementation;
pub mod outcome;

pub use error::{Result, ScanError};
pub use implementation::{
    ImplementationRequest, ImplementationSpec, VersionDecision, VersionStatus,
    DEFAULT_IMPLEMENTATIONS,
};
pub use outcome::{ResultSet, RunOutput, VersionOutcome};
