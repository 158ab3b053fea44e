//! Structured observability hooks for the scan lifecycle.
//!
//! This module provides:
//! - Implementation-scoped tracing spans via `implementation_span`
//! - Emission functions for key lifecycle events: scan start, resolution,
//!   compile, execute, scan finish
//!
//! Events are emitted at `info!` level (override with `RUST_LOG`).

use tracing::info;

use crate::domain::{ImplementationSpec, VersionStatus};

/// Span tagging every log line with the implementation being scanned.
///
/// Attach it to a future with [`tracing::Instrument`] rather than entering
/// it across an `.await`.
///
/// # Example
///
/// ```ignore
/// driver.compile_and_run(&spec, source).instrument(implementation_span("openmpi")).await
/// ```
pub fn implementation_span(implementation: &str) -> tracing::Span {
    tracing::info_span!("mpiscan.impl", implementation = %implementation)
}

/// Emit event: scan started.
pub fn emit_scan_started(source: &str, implementations: usize, install_allowed: bool) {
    info!(
        event = "scan.started",
        source = %source,
        implementations = implementations,
        install_allowed = install_allowed,
    );
}

/// Emit event: version resolution finished for one implementation.
pub fn emit_implementation_resolved(spec: &ImplementationSpec) {
    info!(
        event = "implementation.resolved",
        implementation = %spec.name,
        found = spec.count(VersionStatus::Found),
        built = spec.count(VersionStatus::Built),
        skipped = spec.count(VersionStatus::Skipped),
        build_failed = spec.count(VersionStatus::BuildFailed),
        active = spec.active_versions.len(),
    );
}

/// Emit event: compilation step finished.
pub fn emit_version_compiled(target: &str, ret: i32) {
    info!(event = "version.compiled", target = %target, ret = ret, success = ret == 0);
}

/// Emit event: execution step finished.
pub fn emit_version_executed(target: &str, ret: i32, has_output: bool) {
    info!(
        event = "version.executed",
        target = %target,
        ret = ret,
        has_output = has_output,
    );
}

/// Emit event: all implementations processed.
pub fn emit_scan_finished(implementations: usize, outcomes: usize, duration_ms: u64) {
    info!(
        event = "scan.finished",
        implementations = implementations,
        outcomes = outcomes,
        duration_ms = duration_ms,
    );
}
