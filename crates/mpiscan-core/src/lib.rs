//! mpiscan Core Library
//!
//! Compiles one MPI source file against every installed (or installable)
//! version of a set of MPI implementations, runs it, and reports what each
//! version printed.
//!
//! Pipeline: [`resolver`] picks versions through the package manager,
//! [`driver`] compiles and runs through the [`runner`], and [`reporting`]
//! normalizes and renders the resulting [`ResultSet`].

pub mod domain;
pub mod driver;
pub mod obs;
pub mod reporting;
pub mod resolver;
pub mod runner;
pub mod telemetry;
pub mod version;

pub use domain::{
    ImplementationRequest, ImplementationSpec, Result, ResultSet, RunOutput, ScanError,
    VersionDecision, VersionOutcome, VersionStatus, DEFAULT_IMPLEMENTATIONS,
};

pub use driver::{ensure_regular_file, scan, Driver, DriverConfig, DEFAULT_COMPILER};
pub use reporting::{
    aggregate, load_result_set, render_json, render_markdown, render_report, write_report,
    ReportFormat,
};
pub use resolver::{resolve, resolve_all};
pub use runner::{
    ProcessRunner, RunOutcome, DEFAULT_TIMEOUT, ENV_UNAVAILABLE_STATUS, SPAWN_FAILURE_STATUS,
    TIMEOUT_STATUS,
};
pub use telemetry::init_tracing;
pub use version::{compare_versions, sort_versions};

pub use spack_env_manager::{
    is_spack_available, EnvOverlay, PackageManager, PackageTarget, SpackClient, SpackConfig,
    SpackError,
};
