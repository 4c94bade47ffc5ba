// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Condition types and reason texts written onto `RKEControlPlane` status.
//!
//! Reasons are short, machine-oriented strings. On success the reason is
//! cleared and the message carries the version that is now current, which is
//! the only operator-facing signal of a finished upgrade.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: SystemUpgradeControllerReady
//!       status: "True"
//!       message: "160.1.0"
//!     - type: SystemAgentUpgraded
//!       status: "False"
//!       reason: "waiting for plan system-agent-upgrader to complete at version v0.3.13"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Readiness of the system-upgrade-controller release in the downstream cluster
pub const CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY: &str = "SystemUpgradeControllerReady";

/// Completion of the system-agent upgrade plan in the downstream cluster
pub const CONDITION_SYSTEM_AGENT_UPGRADED: &str = "SystemAgentUpgraded";

/// Connectivity of a provisioning cluster
pub const CONDITION_CONNECTED: &str = "Connected";

// ============================================================================
// Reasons
// ============================================================================

/// The target chart version setting is empty.
pub const REASON_VERSION_SETTING_NOT_CONFIGURED: &str = "version setting not configured";

/// Reason for a dependent object that is being deleted and will be reinstalled.
#[must_use]
pub fn reason_waiting_reinstall(name: &str) -> String {
    format!("waiting for {name} to be reinstalled")
}

/// Reason for a dependent plan that is being deleted and will be recreated.
#[must_use]
pub fn reason_waiting_recreate(name: &str) -> String {
    format!("waiting for {name} to be recreated")
}

/// Reason for a release whose chart version differs from the target.
#[must_use]
pub fn reason_waiting_update(name: &str, target: &str) -> String {
    format!("waiting for {name} to update to {target}")
}

/// Reason for a release that has the target version but is not deployed yet.
#[must_use]
pub fn reason_waiting_ready(name: &str, state: &str) -> String {
    format!("waiting for {name} to be ready, current state {state}")
}

/// Reason for a plan that has not completed at the target version.
#[must_use]
pub fn reason_waiting_plan(name: &str, target: &str) -> String {
    format!("waiting for plan {name} to complete at version {target}")
}
