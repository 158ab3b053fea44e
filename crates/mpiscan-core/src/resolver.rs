//! Implementation resolver: decide which published versions get tested.
//!
//! For each version (ascending, deduplicated) the resolver either uses the
//! installed copy, skips it, or installs it when the request allows. Unknown
//! packages and empty version listings abort the whole scan; a failed
//! install only drops that version.

use spack_env_manager::{PackageManager, PackageTarget};
use tracing::{info, warn};

use crate::domain::{
    ImplementationRequest, ImplementationSpec, Result, ScanError, VersionDecision, VersionStatus,
};
use crate::obs;
use crate::version::sort_versions;

/// Resolve one implementation against the package manager.
///
/// Installing is a real side effect: with `install_allowed` every missing
/// version is built through the package manager, one after another.
pub async fn resolve<P>(pm: &P, request: &ImplementationRequest) -> Result<ImplementationSpec>
where
    P: PackageManager + ?Sized,
{
    info!("Checking for {} in spack", request.name);
    if !pm.has_spec(&request.name).await? {
        return Err(ScanError::UnknownPackage(request.name.clone()));
    }

    let versions = sort_versions(pm.list_versions(&request.name).await?);
    if versions.is_empty() {
        return Err(ScanError::NoVersions(request.name.clone()));
    }

    let mut decisions = Vec::with_capacity(versions.len());
    for version in versions {
        let target = PackageTarget::new(&request.name, &version);
        let status = decide(pm, &target, request.install_allowed).await?;
        decisions.push(VersionDecision { version, status });
    }

    let spec = ImplementationSpec::from_decisions(request, decisions);
    obs::emit_implementation_resolved(&spec);
    Ok(spec)
}

async fn decide<P>(pm: &P, target: &PackageTarget, install_allowed: bool) -> Result<VersionStatus>
where
    P: PackageManager + ?Sized,
{
    if pm.is_installed(target).await? {
        info!("{} found", target);
        return Ok(VersionStatus::Found);
    }

    if !install_allowed {
        info!("{} skipped", target);
        return Ok(VersionStatus::Skipped);
    }

    info!("Now building {}", target);
    match pm.install(target).await {
        Ok(()) => {
            info!("{} built", target);
            Ok(VersionStatus::Built)
        }
        Err(e) => {
            warn!("Failed to build {}, ignoring: {}", target, e);
            Ok(VersionStatus::BuildFailed)
        }
    }
}

/// Resolve every request in order. The first fatal error stops the scan.
pub async fn resolve_all<P>(
    pm: &P,
    requests: &[ImplementationRequest],
) -> Result<Vec<ImplementationSpec>>
where
    P: PackageManager + ?Sized,
{
    let mut specs = Vec::with_capacity(requests.len());
    for request in requests {
        specs.push(resolve(pm, request).await?);
    }
    Ok(specs)
}
