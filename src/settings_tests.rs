// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `settings.rs`

#[cfg(test)]
mod tests {
    use crate::settings::{split_image, AgentTlsMode, Settings};

    #[test]
    fn test_split_image_with_tag() {
        assert_eq!(
            split_image("rancher/system-agent:v0.3.13-rc.2-suc"),
            ("rancher/system-agent", "v0.3.13-rc.2-suc")
        );
    }

    #[test]
    fn test_split_image_without_tag_defaults_to_latest() {
        assert_eq!(split_image("rancher/wins"), ("rancher/wins", "latest"));
        assert_eq!(split_image(""), ("", "latest"));
    }

    #[test]
    fn test_upgrader_version() {
        let settings = Settings {
            system_agent_upgrade_image: "rancher/system-agent:v0.3.13-suc".into(),
            ..Settings::default()
        };
        assert_eq!(settings.system_agent_upgrader_version(), "v0.3.13-suc");
        assert_eq!(settings.system_agent_upgrade_repository(), "rancher/system-agent");

        assert_eq!(Settings::default().system_agent_upgrader_version(), "latest");
    }

    #[test]
    fn test_strict_verify_follows_tls_mode() {
        let strict = Settings {
            agent_tls_mode: AgentTlsMode::Strict,
            ..Settings::default()
        };
        let system_store = Settings {
            agent_tls_mode: AgentTlsMode::SystemStore,
            ..Settings::default()
        };
        assert_eq!(strict.strict_verify(), "true");
        assert_eq!(system_store.strict_verify(), "false");
    }
}
