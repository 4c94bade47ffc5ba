// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `version_gate.rs`

#[cfg(test)]
mod tests {
    use crate::version_gate::{fixed_version_for_minor, resolves_windows_plan_defect};

    #[test]
    fn test_fixed_patch_of_tracked_minor() {
        assert!(resolves_windows_plan_defect("v1.30.4+rke2r1"));
        assert!(!resolves_windows_plan_defect("v1.30.1+rke2r1"));
        assert!(resolves_windows_plan_defect("v1.29.8+rke2r1"));
        assert!(!resolves_windows_plan_defect("v1.29.7+rke2r1"));
        assert!(resolves_windows_plan_defect("v1.27.16+k3s1"));
    }

    #[test]
    fn test_minor_bounds() {
        assert!(resolves_windows_plan_defect("v1.61.1+rke2r1"));
        assert!(resolves_windows_plan_defect("v1.31.0+rke2r1"));
        assert!(!resolves_windows_plan_defect("v1.26.1+rke2r1"));
        assert!(!resolves_windows_plan_defect("v1.26.99+rke2r1"));
    }

    #[test]
    fn test_pre_release_participates() {
        assert!(!resolves_windows_plan_defect("v1.30.1-rc1+rke2r1"));
        assert!(resolves_windows_plan_defect("v1.30.5-rc1+rke2r1"));
        assert!(!resolves_windows_plan_defect("v1.30.4-rc1+rke2r1"));
    }

    #[test]
    fn test_malformed_versions_fail_safe() {
        assert!(!resolves_windows_plan_defect(""));
        assert!(!resolves_windows_plan_defect("v1.30.4"));
        assert!(!resolves_windows_plan_defect("v1.30.4+rke2r1+extra"));
        assert!(!resolves_windows_plan_defect("vX.Y.Z+rke2r1"));
        assert!(!resolves_windows_plan_defect("v1.30+rke2r1"));
    }

    #[test]
    fn test_leading_v_is_optional() {
        assert!(resolves_windows_plan_defect("1.30.4+rke2r1"));
    }

    #[test]
    fn test_is_deterministic() {
        let input = "v1.28.13+rke2r1";
        let first = resolves_windows_plan_defect(input);
        for _ in 0..10 {
            assert_eq!(resolves_windows_plan_defect(input), first);
        }
        assert!(first);
    }

    #[test]
    fn test_fix_matrix_entries() {
        assert_eq!(fixed_version_for_minor(30).map(ToString::to_string), Some("1.30.4".to_string()));
        assert!(fixed_version_for_minor(31).is_none());
    }

    #[test]
    fn test_fix_matrix_outlives_lookup() {
        let fixed: Vec<&'static semver::Version> =
            (27..=30).filter_map(fixed_version_for_minor).collect();

        assert_eq!(fixed.len(), 4);
        assert!(fixed.iter().all(|v| v.major == 1 && v.pre.is_empty()));
        assert_eq!(fixed[0].to_string(), "1.27.16");
    }
}
