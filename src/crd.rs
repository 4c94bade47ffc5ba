// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource types observed and produced by the reconciler.
//!
//! None of these resources are owned by this crate: they are the wire shapes of
//! objects managed by other controllers, reduced to the fields the condition
//! engine and the system-agent bundle delivery read or write.
//!
//! # Management cluster
//!
//! - [`RKEControlPlane`] - Control-plane object carrying the readiness conditions
//! - [`ProvisioningCluster`] - Provisioned cluster record (`provisioning.cattle.io/v1 Cluster`)
//! - [`Bundle`] - Fleet bundle delivering the system-agent upgrader
//! - [`ClusterRegistrationToken`] - Agent registration token of a management cluster
//!
//! # Downstream cluster
//!
//! - [`App`] - Chart release of the system-upgrade-controller
//! - [`Plan`] - System-upgrade-controller execution plan
//!
//! # Example
//!
//! ```rust
//! use upgrade_readiness::crd::{RKEControlPlane, RKEControlPlaneSpec};
//!
//! let cp = RKEControlPlane::new(
//!     "dev-cluster",
//!     RKEControlPlaneSpec {
//!         cluster_name: "dev-cluster".to_string(),
//!         management_cluster_name: "c-mx21351".to_string(),
//!         kubernetes_version: "v1.30.4+rke2r1".to_string(),
//!     },
//! );
//! assert!(cp.status.is_none());
//! ```

use k8s_openapi::api::core::v1::{EnvFromSource, EnvVar, SecurityContext, Toleration};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Conditions
// ============================================================================

/// Tri-state value of a [`Condition`].
///
/// Any value other than `True` or `False`, including an empty string, reads as
/// `Unknown` so a malformed foreign condition never fails the whole object.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ConditionStatus {
    /// Returns the wire representation ("True", "False" or "Unknown").
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic status condition shared by every resource in this module.
///
/// `last_update_time` is an RFC3339 timestamp that only moves when `status`,
/// `reason` or `message` change. `last_transition_time` only moves when
/// `status` changes. Fields this crate does not model are kept in `extra` and
/// written back untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g. `Connected`, `SystemUpgradeControllerReady`)
    pub r#type: String,

    /// Status of the condition
    #[serde(default)]
    pub status: ConditionStatus,

    /// Short machine-oriented reason
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Last time any of status, reason or message changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,

    /// Last time the status changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,

    /// Fields set by other controllers
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Returns `true` when `conditions` holds a condition of `condition_type` with status True.
#[must_use]
pub fn is_condition_true(conditions: &[Condition], condition_type: &str) -> bool {
    conditions
        .iter()
        .any(|c| c.r#type == condition_type && c.status == ConditionStatus::True)
}

// ============================================================================
// Management cluster resources
// ============================================================================

/// Control-plane configuration of a provisioned cluster.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "rke.cattle.io",
    version = "v1",
    kind = "RKEControlPlane",
    namespaced,
    status = "RKEControlPlaneStatus",
    shortname = "rkecp"
)]
#[serde(rename_all = "camelCase")]
pub struct RKEControlPlaneSpec {
    /// Name of the provisioning cluster this control plane belongs to
    #[serde(default)]
    pub cluster_name: String,

    /// Name of the management cluster record (e.g. `c-mx21351`)
    #[serde(default)]
    pub management_cluster_name: String,

    /// Desired Kubernetes version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kubernetes_version: String,
}

/// Status of an [`RKEControlPlane`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RKEControlPlaneStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Status fields owned by other controllers, written back untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Environment variable passed to the cluster agents.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct AgentEnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Per machine-pool configuration entry of an RKE cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineSelectorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_label_selector: Option<LabelSelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

/// Data directory overrides of an RKE cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataDirectories {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system_agent: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provisioning: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub k8s_distro: String,
}

/// RKE2/K3s specific cluster configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RKEConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_selector_config: Vec<MachineSelectorConfig>,

    #[serde(default)]
    pub data_directories: DataDirectories,
}

/// Provisioned cluster record (`provisioning.cattle.io/v1 Cluster`).
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "provisioning.cattle.io",
    version = "v1",
    kind = "Cluster",
    root = "ProvisioningCluster",
    namespaced,
    status = "ProvisioningClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningClusterSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kubernetes_version: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_env_vars: Vec<AgentEnvVar>,

    /// Bumped by operators to force a redeploy of the system-agent
    #[serde(default)]
    pub redeploy_system_agent_generation: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rke_config: Option<RKEConfig>,
}

/// Status of a [`ProvisioningCluster`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningClusterStatus {
    /// Name of the management cluster record
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,

    /// Fleet workspace the cluster is registered in
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fleet_workspace_name: String,

    /// Secret holding the downstream kubeconfig
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Single resource carried by a Fleet [`Bundle`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BundleResource {
    /// File name of the resource inside the bundle
    pub name: String,

    /// Serialized YAML document
    pub content: String,
}

/// Target of a Fleet [`Bundle`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BundleTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
}

/// Fleet bundle (`fleet.cattle.io/v1alpha1 Bundle`).
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "fleet.cattle.io",
    version = "v1alpha1",
    kind = "Bundle",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BundleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_namespace: Option<String>,

    #[serde(default)]
    pub resources: Vec<BundleResource>,

    #[serde(default)]
    pub targets: Vec<BundleTarget>,
}

/// Agent registration token (`management.cattle.io/v3 ClusterRegistrationToken`).
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "management.cattle.io",
    version = "v3",
    kind = "ClusterRegistrationToken",
    namespaced,
    status = "ClusterRegistrationTokenStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRegistrationTokenSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,
}

/// Status of a [`ClusterRegistrationToken`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRegistrationTokenStatus {
    /// Generated token, empty until the token controller fills it in
    #[serde(default)]
    pub token: String,
}

impl ClusterRegistrationToken {
    /// Generated token, empty when not yet generated.
    #[must_use]
    pub fn token(&self) -> &str {
        self.status.as_ref().map_or("", |s| s.token.as_str())
    }
}

// ============================================================================
// Downstream cluster resources
// ============================================================================

/// Chart metadata of a release.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct ChartMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Chart of a release.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct Chart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChartMetadata>,
}

/// Chart release (`catalog.cattle.io/v1 App`).
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "catalog.cattle.io",
    version = "v1",
    kind = "App",
    namespaced,
    status = "AppStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<Chart>,
}

/// Summary of a release rollout.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub transitioning: bool,
}

/// Status of an [`App`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppStatus {
    #[serde(default)]
    pub summary: AppSummary,
}

impl App {
    /// Version of the deployed chart, empty when unknown.
    #[must_use]
    pub fn chart_version(&self) -> &str {
        self.spec
            .chart
            .as_ref()
            .and_then(|c| c.metadata.as_ref())
            .map_or("", |m| m.version.as_str())
    }

    /// Rollout state reported by the release summary.
    #[must_use]
    pub fn rollout_state(&self) -> RolloutState {
        RolloutState::parse(
            self.status
                .as_ref()
                .map_or("", |s| s.summary.state.as_str()),
        )
    }
}

/// Helm release state of an [`App`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RolloutState {
    Deployed,
    Failed,
    Uninstalled,
    Uninstalling,
    Superseded,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
    Unknown,
    Other(String),
}

impl RolloutState {
    /// Parse a release summary state; unrecognised values are kept verbatim.
    #[must_use]
    pub fn parse(state: &str) -> Self {
        match state {
            "deployed" => Self::Deployed,
            "failed" => Self::Failed,
            "uninstalled" => Self::Uninstalled,
            "uninstalling" => Self::Uninstalling,
            "superseded" => Self::Superseded,
            "pending-install" => Self::PendingInstall,
            "pending-upgrade" => Self::PendingUpgrade,
            "pending-rollback" => Self::PendingRollback,
            "" | "unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns `true` for the only terminal success state.
    #[must_use]
    pub fn is_deployed(&self) -> bool {
        matches!(self, Self::Deployed)
    }
}

impl fmt::Display for RolloutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Deployed => "deployed",
            Self::Failed => "failed",
            Self::Uninstalled => "uninstalled",
            Self::Uninstalling => "uninstalling",
            Self::Superseded => "superseded",
            Self::PendingInstall => "pending-install",
            Self::PendingUpgrade => "pending-upgrade",
            Self::PendingRollback => "pending-rollback",
            Self::Unknown => "unknown",
            Self::Other(other) => other.as_str(),
        };
        f.write_str(s)
    }
}

/// Secret mounted into plan jobs; a change to it triggers a plan upgrade.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct PlanSecret {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// Container run by a plan on every selected node.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanContainer {
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_from: Vec<EnvFromSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,
}

/// System-upgrade-controller execution plan (`upgrade.cattle.io/v1 Plan`).
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "upgrade.cattle.io",
    version = "v1",
    kind = "Plan",
    namespaced,
    status = "PlanStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PlanSpec {
    pub concurrency: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<LabelSelector>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<PlanSecret>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<PlanContainer>,
}

/// Status of a [`Plan`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub latest_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub latest_hash: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Condition type reporting that a plan was applied to every selected node.
pub const PLAN_COMPLETE_CONDITION: &str = "Complete";

impl Plan {
    /// Latest version the plan resolved, empty when not yet resolved.
    #[must_use]
    pub fn latest_version(&self) -> &str {
        self.status
            .as_ref()
            .map_or("", |s| s.latest_version.as_str())
    }

    /// Returns `true` once the plan reports `Complete=True`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| is_condition_true(&s.conditions, PLAN_COMPLETE_CONDITION))
    }
}
