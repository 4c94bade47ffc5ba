// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Readiness conditions of `RKEControlPlane` resources.
//!
//! Two independent conditions are derived from objects living in the
//! downstream cluster:
//!
//! - `SystemUpgradeControllerReady` from the system-upgrade-controller release
//!   ([`system_upgrade_controller`])
//! - `SystemAgentUpgraded` from the system-agent upgrade plan ([`system_agent`])
//!
//! Both share the same skeleton. Scope gates run first, then the cluster is
//! resolved and its connectivity checked, then the dependent object is
//! fetched exactly once and the condition table decides the outcome. A
//! not-found dependent is an observation, not an error; any other lookup
//! failure aborts the reconcile so it is retried.
//!
//! Every computation runs on a copy of the status. [`reconcile_control_plane`]
//! persists the copy only when it differs semantically from the stored one.

pub mod system_agent;
pub mod system_upgrade_controller;

#[cfg(test)]
mod system_agent_tests;

use super::cluster_resolver::{is_connected, resolve_cluster};
use super::precedence::{evaluate, keep, Rule, Verdict};
use super::status::{conditions_equal, find_condition, set_condition};
use crate::crd::{App, Condition, Plan, ProvisioningCluster, RKEControlPlane, RKEControlPlaneStatus};
use crate::errors::{LookupError, ReconcileError};
use crate::metrics;
use crate::repository::{ClusterIndex, Repository};
use crate::settings::Settings;
use chrono::Utc;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a condition sync needs, injected explicitly.
#[derive(Clone)]
pub struct ConditionHandler {
    /// Management cluster this handler serves
    pub management_cluster_name: String,
    pub settings: Settings,
    pub clusters: Arc<dyn ClusterIndex>,
    /// Chart releases in the downstream cluster
    pub apps: Arc<dyn Repository<App>>,
    /// Upgrade plans in the downstream cluster
    pub plans: Arc<dyn Repository<Plan>>,
}

/// Scope information shared by the gate rules of both conditions.
#[derive(Clone, Debug)]
pub struct Gate {
    pub deleting: bool,
    /// Management cluster named by the control plane
    pub management_cluster_name: String,
    /// Management cluster this handler serves
    pub served_management_cluster: String,
    pub target_version: String,
    /// Stored state of the condition being computed
    pub current: Option<Condition>,
}

impl Gate {
    #[must_use]
    pub fn new(
        control_plane: &RKEControlPlane,
        served_management_cluster: &str,
        target_version: &str,
        status: &RKEControlPlaneStatus,
        condition_type: &str,
    ) -> Self {
        Self {
            deleting: control_plane.metadata.deletion_timestamp.is_some(),
            management_cluster_name: control_plane.spec.management_cluster_name.clone(),
            served_management_cluster: served_management_cluster.to_string(),
            target_version: target_version.to_string(),
            current: find_condition(&status.conditions, condition_type).cloned(),
        }
    }
}

/// Result of fetching a dependent object.
pub enum Observed<T> {
    /// The object does not exist; carries the not-found error text.
    Missing(String),
    Present(T),
}

impl<T> Observed<T> {
    /// Turn a lookup result into an observation, propagating every error but not-found.
    ///
    /// # Errors
    ///
    /// Returns the lookup error unless it is [`LookupError::NotFound`].
    pub fn from_lookup(result: Result<T, LookupError>) -> Result<Self, LookupError> {
        match result {
            Ok(object) => Ok(Self::Present(object)),
            Err(e) if e.is_not_found() => Ok(Self::Missing(e.to_string())),
            Err(e) => Err(e),
        }
    }
}

/// The control plane is being deleted or belongs to another management cluster.
#[must_use]
pub fn out_of_scope(gate: &Gate) -> bool {
    gate.deleting || gate.management_cluster_name != gate.served_management_cluster
}

/// Connectivity gate evaluated once the cluster is resolved.
pub const CONNECTIVITY_RULES: &[Rule<ProvisioningCluster>] = &[Rule {
    name: "cluster-disconnected",
    when: |cluster| !is_connected(cluster),
    then: keep,
}];

/// Outcome of a single condition sync step.
pub(crate) enum Step<T> {
    /// A rule decided; stop here.
    Decided(&'static str, Verdict),
    /// Continue with the value.
    Continue(T),
}

impl ConditionHandler {
    /// Apply a verdict to a copy of `status`.
    pub(crate) fn apply_verdict(
        status: &RKEControlPlaneStatus,
        condition_type: &str,
        rule: &'static str,
        verdict: Verdict,
        control_plane: &RKEControlPlane,
    ) -> RKEControlPlaneStatus {
        debug!(
            namespace = ?control_plane.namespace(),
            name = %control_plane.name_any(),
            condition = %condition_type,
            rule = %rule,
            "Condition rule matched"
        );
        match verdict {
            Verdict::Keep => status.clone(),
            Verdict::Set(update) => set_condition(status, condition_type, &update, Utc::now()),
        }
    }

    /// Evaluate the gate rules, then resolve the cluster and check connectivity.
    pub(crate) fn gate_and_resolve(
        &self,
        rules: &[Rule<Gate>],
        gate: &Gate,
    ) -> Result<Step<Arc<ProvisioningCluster>>, ReconcileError> {
        if let Some((rule, verdict)) = evaluate(rules, gate) {
            return Ok(Step::Decided(rule, verdict));
        }

        let cluster = resolve_cluster(self.clusters.as_ref(), &self.management_cluster_name)?;

        if let Some((rule, verdict)) = evaluate(CONNECTIVITY_RULES, cluster.as_ref()) {
            return Ok(Step::Decided(rule, verdict));
        }
        Ok(Step::Continue(cluster))
    }

    /// Recompute both conditions of `control_plane` on a copy of its status.
    ///
    /// # Errors
    ///
    /// Returns an error when the cluster cannot be resolved or a dependent
    /// lookup fails with anything but not-found.
    pub async fn sync_conditions(
        &self,
        control_plane: &RKEControlPlane,
    ) -> Result<RKEControlPlaneStatus, ReconcileError> {
        let status = control_plane.status.clone().unwrap_or_default();
        let status = self
            .sync_system_upgrade_controller_condition(control_plane, &status)
            .await?;
        self.sync_system_agent_upgraded_condition(control_plane, &status)
            .await
    }
}

/// Recompute the conditions of `control_plane` and persist them if they changed.
///
/// The whole status is written back under the resource version of
/// `control_plane`; conditions owned by other controllers are carried over
/// unchanged. Returns `true` when a status write was sent.
///
/// # Errors
///
/// Returns an error when the conditions cannot be computed or the status
/// write fails, including [`ReconcileError::Conflict`] when `control_plane`
/// is stale.
pub async fn reconcile_control_plane(
    handler: &ConditionHandler,
    control_planes: &dyn Repository<RKEControlPlane>,
    control_plane: &RKEControlPlane,
) -> Result<bool, ReconcileError> {
    let namespace = control_plane.namespace().unwrap_or_default();
    let name = control_plane.name_any();

    let current = control_plane.status.clone().unwrap_or_default();
    let next = handler.sync_conditions(control_plane).await?;

    if conditions_equal(&current.conditions, &next.conditions) {
        debug!(namespace = %namespace, name = %name, "Conditions unchanged, skipping status update");
        return Ok(false);
    }

    for condition in &next.conditions {
        let changed = current
            .conditions
            .iter()
            .find(|c| c.r#type == condition.r#type)
            .is_none_or(|c| c.status != condition.status);
        if changed {
            metrics::record_condition_transition(&condition.r#type, condition.status.as_str());
        }
    }

    info!(
        namespace = %namespace,
        name = %name,
        "Updating upgrade readiness conditions"
    );
    let mut updated = control_plane.clone();
    updated.status = Some(next);
    control_planes.replace_status(&updated).await?;
    Ok(true)
}
