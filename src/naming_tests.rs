// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `naming.rs`

#[cfg(test)]
mod tests {
    use crate::naming::{
        safe_concat_name, system_agent_bundle_name, system_upgrade_controller_app_name,
    };

    #[test]
    fn test_short_names_are_joined_unchanged() {
        assert_eq!(
            safe_concat_name(53, &["dev-cluster", "managed", "system-agent"]),
            "dev-cluster-managed-system-agent"
        );
    }

    #[test]
    fn test_long_names_are_truncated_with_hash() {
        let name = safe_concat_name(20, &["a-very-long-cluster-name", "managed", "system-agent"]);
        assert_eq!(name.len(), 20);
        assert!(name.starts_with("a-very-long-cl-"));
    }

    #[test]
    fn test_truncation_avoids_trailing_dash() {
        // Cut point (index 13) falls on a '-'
        let name = safe_concat_name(20, &["abcdefghijklm", "nopqrstuvwxyz"]);
        assert_eq!(name.len(), 20);
        assert!(name.starts_with("abcdefghijklm-"));
        assert!(!name[..13].ends_with('-'));
    }

    #[test]
    fn test_distinct_long_inputs_stay_distinct() {
        let a = safe_concat_name(30, &["cluster-with-a-long-name-one", "managed"]);
        let b = safe_concat_name(30, &["cluster-with-a-long-name-two", "managed"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tiny_limits() {
        assert_eq!(safe_concat_name(0, &["abcdef"]), "");
        assert_eq!(safe_concat_name(3, &["abcdef"]), "abc");
    }

    #[test]
    fn test_is_deterministic() {
        let parts = ["some-really-long-downstream-cluster", "managed", "system-upgrade-controller"];
        assert_eq!(safe_concat_name(48, &parts), safe_concat_name(48, &parts));
    }

    #[test]
    fn test_release_and_bundle_names() {
        assert_eq!(
            system_upgrade_controller_app_name("dev-cluster"),
            "dev-cluster-managed-system-upgrade-controller"
        );
        assert_eq!(
            system_agent_bundle_name("dev-cluster"),
            "dev-cluster-managed-system-agent"
        );
        assert!(system_upgrade_controller_app_name(&"x".repeat(60)).len() <= 48);
        assert!(system_agent_bundle_name(&"x".repeat(60)).len() <= 53);
    }

    #[test]
    fn test_multibyte_input_is_cut_on_char_boundaries() {
        // "é" is two bytes, so some cut points fall inside it
        let parts = ["clustér-éééééééééé", "managed", "system-agent"];

        for max_length in 1..=40 {
            let name = safe_concat_name(max_length, &parts);
            assert!(name.len() <= max_length, "{name} exceeds {max_length}");
        }
        assert_eq!(safe_concat_name(5, &["aaaaé"]), "aaaa");
    }
}
