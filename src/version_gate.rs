// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes version gate for the windows system-agent upgrade plan.
//!
//! RKE2 releases older than the fixed patch of each minor cannot receive
//! system-upgrade-controller plans on windows nodes
//! (<https://github.com/rancher/rke2/issues/5551>). The windows plan is only
//! delivered once the cluster runs a version that carries the fix.

use semver::Version;

/// Lowest minor version that always carries the fix.
pub const FIXED_MINOR_UPPER_BOUND: u64 = 31;

/// Highest minor version that never carries the fix.
pub const UNFIXED_MINOR_LOWER_BOUND: u64 = 26;

/// Minimum patch release carrying the fix, keyed by minor version.
static FIXED_VERSIONS: [(u64, Version); 4] = [
    (27, Version::new(1, 27, 16)),
    (28, Version::new(1, 28, 13)),
    (29, Version::new(1, 29, 8)),
    (30, Version::new(1, 30, 4)),
];

/// Returns the first version of `minor` that carries the fix, if `minor` is tracked.
#[must_use]
pub fn fixed_version_for_minor(minor: u64) -> Option<&'static Version> {
    FIXED_VERSIONS
        .iter()
        .find(|(m, _)| *m == minor)
        .map(|(_, v)| v)
}

/// Decide whether `version` (e.g. `v1.30.4+rke2r1`) carries the windows plan fix.
///
/// Any string that is not of the form `vMAJOR.MINOR.PATCH[-pre]+suffix`
/// yields `false`, so a malformed version never skips the remediation check.
/// Pre-release tags take part in the comparison: `v1.30.4-rc1` is older than
/// `v1.30.4`.
///
/// # Example
///
/// ```rust
/// use upgrade_readiness::version_gate::resolves_windows_plan_defect;
///
/// assert!(resolves_windows_plan_defect("v1.30.4+rke2r1"));
/// assert!(!resolves_windows_plan_defect("v1.30.1+rke2r1"));
/// assert!(!resolves_windows_plan_defect("garbage"));
/// ```
#[must_use]
pub fn resolves_windows_plan_defect(version: &str) -> bool {
    let trimmed = version.strip_prefix('v').unwrap_or(version);
    let parts: Vec<&str> = trimmed.split('+').collect();
    if parts.len() != 2 {
        return false;
    }

    let Ok(current) = Version::parse(parts[0]) else {
        return false;
    };

    if current.minor >= FIXED_MINOR_UPPER_BOUND {
        return true;
    }
    if current.minor <= UNFIXED_MINOR_LOWER_BOUND {
        return false;
    }

    fixed_version_for_minor(current.minor).is_some_and(|fixed| current >= *fixed)
}
