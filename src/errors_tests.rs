// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

#[cfg(test)]
mod tests {
    use crate::errors::{LookupError, ReconcileError, ResolveError};

    fn not_found() -> LookupError {
        LookupError::NotFound {
            resource: "plans.upgrade.cattle.io".to_string(),
            namespace: "cattle-system".to_string(),
            name: "system-agent-upgrader".to_string(),
        }
    }

    #[test]
    fn test_not_found_display_matches_api_message() {
        assert_eq!(
            not_found().to_string(),
            "plans.upgrade.cattle.io \"system-agent-upgrader\" not found"
        );
        assert!(not_found().is_not_found());
    }

    #[test]
    fn test_unavailable_is_not_not_found() {
        let err = LookupError::Unavailable {
            resource: "clusters.provisioning.cattle.io".to_string(),
            key: "c-m-abc123".to_string(),
            reason: "cache not synced".to_string(),
        };

        assert!(!err.is_not_found());
        assert!(err.to_string().contains("cache not synced"));
    }

    #[test]
    fn test_ambiguous_resolution_message() {
        let err = ResolveError::Ambiguous {
            management_cluster: "c-m-abc123".to_string(),
            count: 2,
        };

        assert!(err.to_string().contains("expected exactly one cluster, found 2"));
    }

    #[test]
    fn test_reconcile_error_is_transparent() {
        let err: ReconcileError = not_found().into();

        assert_eq!(err.to_string(), not_found().to_string());
        assert!(matches!(err, ReconcileError::Lookup(_)));
    }

    #[test]
    fn test_setting_not_set_names_the_setting() {
        let err = ReconcileError::SettingNotSet {
            namespace: "fleet-default".to_string(),
            name: "dev-cluster".to_string(),
            setting: "system-agent-upgrade-image",
        };

        assert_eq!(
            err.to_string(),
            "cluster fleet-default/dev-cluster: the system-agent-upgrade-image setting is not set"
        );
    }
}
