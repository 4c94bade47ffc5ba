// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciler settings.
//!
//! Settings are parsed once at startup (command line flags with environment
//! fallbacks) and handed to every reconcile as an explicit, read-only value.
//! Nothing in the crate reads process-wide state.
//!
//! # Example
//!
//! ```rust
//! use upgrade_readiness::settings::{AgentTlsMode, Settings};
//!
//! let settings = Settings {
//!     system_upgrade_controller_chart_version: "160.1.0".to_string(),
//!     system_agent_upgrade_image: "rancher/system-agent:v0.3.13-suc".to_string(),
//!     agent_tls_mode: AgentTlsMode::Strict,
//!     ..Settings::default()
//! };
//! assert_eq!(settings.system_agent_upgrader_version(), "v0.3.13-suc");
//! ```

use crate::constants::DEFAULT_IMAGE_TAG;
use clap::{Args, ValueEnum};

/// TLS verification mode of the cluster agents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum AgentTlsMode {
    /// Agents only trust the configured CA
    #[default]
    Strict,
    /// Agents also trust the system certificate store
    SystemStore,
}

/// External settings consumed by the condition engine and the plan builder.
#[derive(Clone, Debug, Default, Args)]
pub struct Settings {
    /// Target chart version of the system-upgrade-controller release
    #[arg(long, env = "SYSTEM_UPGRADE_CONTROLLER_CHART_VERSION", default_value = "")]
    pub system_upgrade_controller_chart_version: String,

    /// Image (`repository:tag`) of the linux system-agent upgrader
    #[arg(long, env = "SYSTEM_AGENT_UPGRADE_IMAGE", default_value = "")]
    pub system_agent_upgrade_image: String,

    /// Image (`repository:tag`) of the windows agent upgrader
    #[arg(long, env = "WINS_AGENT_UPGRADE_IMAGE", default_value = "")]
    pub wins_agent_upgrade_image: String,

    /// TLS verification mode propagated to the agents
    #[arg(long, env = "AGENT_TLS_MODE", value_enum, default_value_t = AgentTlsMode::Strict)]
    pub agent_tls_mode: AgentTlsMode,

    /// Server URL agents of the local cluster connect to
    #[arg(long, env = "INTERNAL_SERVER_URL", default_value = "")]
    pub internal_server_url: String,

    /// Checksum of the internal CA certificate
    #[arg(long, env = "INTERNAL_CA_CHECKSUM", default_value = "")]
    pub internal_ca_checksum: String,
}

impl Settings {
    /// Version the linux upgrade plan targets: the upgrade image tag, or `latest`.
    #[must_use]
    pub fn system_agent_upgrader_version(&self) -> &str {
        split_image(&self.system_agent_upgrade_image).1
    }

    /// Repository part of the linux upgrade image.
    #[must_use]
    pub fn system_agent_upgrade_repository(&self) -> &str {
        split_image(&self.system_agent_upgrade_image).0
    }

    /// Repository and tag of the windows upgrade image.
    #[must_use]
    pub fn wins_agent_upgrade_image_parts(&self) -> (&str, &str) {
        split_image(&self.wins_agent_upgrade_image)
    }

    /// Value of `STRICT_VERIFY` derived from the agent TLS mode.
    #[must_use]
    pub fn strict_verify(&self) -> &'static str {
        match self.agent_tls_mode {
            AgentTlsMode::Strict => "true",
            AgentTlsMode::SystemStore => "false",
        }
    }
}

/// Split an image reference on its first `:` into repository and tag.
///
/// The tag defaults to `latest` when the reference carries none.
#[must_use]
pub fn split_image(reference: &str) -> (&str, &str) {
    match reference.split_once(':') {
        Some((repository, tag)) => (repository, tag),
        None => (reference, DEFAULT_IMAGE_TAG),
    }
}
