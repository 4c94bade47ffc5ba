// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Delivery of the system-agent upgrader to downstream clusters.
//!
//! For every provisioning cluster the upgrader objects are built, serialized
//! into bundle resources and server-side applied as a Fleet `Bundle` in the
//! cluster's workspace. The bundle records the hash of its payload so an
//! unchanged payload is never applied twice.
//!
//! Delivery waits until the system-upgrade-controller reports ready at the
//! configured chart version, since new plans may depend on it.

use crate::bundle_digest::{payload_hash, serialize_objects};
use crate::constants::{DEFAULT_TOKEN_NAME, SYSTEM_NAMESPACE};
use crate::crd::{
    Bundle, BundleSpec, BundleTarget, ClusterRegistrationToken, ConditionStatus,
    ProvisioningCluster, RKEControlPlane,
};
use crate::errors::ReconcileError;
use crate::labels::{APPLIED_PAYLOAD_HASH_ANNOTATION, K8S_MANAGED_BY, MANAGED_BY_UPGRADE_READINESS};
use crate::metrics;
use crate::naming::system_agent_bundle_name;
use crate::reconcilers::cluster_resolver::is_connected;
use crate::reconcilers::controlplane::Observed;
use crate::reconcilers::status::find_condition;
use crate::repository::Repository;
use crate::settings::Settings;
use crate::status_reasons::CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY;
use crate::upgrader_resources::{build_upgrader_objects, is_local_cluster, AggregationInput};
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Result of a delivery reconcile that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The cluster is not a candidate for delivery; nothing to do.
    Ignored,
    /// A prerequisite is not met yet; the next cluster event retries.
    Waiting(String),
    /// Required state is missing; retry shortly without reporting a failure.
    Skipped(String),
    /// Too many deliveries in flight; retry shortly.
    Busy,
    /// The bundle already carries this payload.
    Unchanged,
    /// The bundle was applied.
    Applied,
}

/// Dependencies of the delivery reconciler.
#[derive(Clone)]
pub struct BundleDelivery {
    pub settings: Settings,
    pub control_planes: Arc<dyn Repository<RKEControlPlane>>,
    pub bundles: Arc<dyn Repository<Bundle>>,
    pub tokens: Arc<dyn Repository<ClusterRegistrationToken>>,
    /// Bounds the number of bundles applied concurrently
    pub permits: Arc<Semaphore>,
}

impl BundleDelivery {
    fn require_settings(&self, cluster: &ProvisioningCluster) -> Result<(), ReconcileError> {
        let missing = if self.settings.system_agent_upgrade_image.is_empty() {
            Some("system-agent-upgrade-image")
        } else if self
            .settings
            .system_upgrade_controller_chart_version
            .is_empty()
        {
            Some("system-upgrade-controller-chart-version")
        } else {
            None
        };

        match missing {
            Some(setting) => Err(ReconcileError::SettingNotSet {
                namespace: cluster.namespace().unwrap_or_default(),
                name: cluster.name_any(),
                setting,
            }),
            None => Ok(()),
        }
    }

    /// Returns why the controller is not ready for delivery, if it is not.
    fn controller_not_ready(&self, control_plane: &RKEControlPlane) -> Option<String> {
        let conditions = control_plane
            .status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default();
        let target = &self.settings.system_upgrade_controller_chart_version;

        match find_condition(conditions, CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY) {
            None => Some(format!(
                "{CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY} condition not found"
            )),
            Some(c) if c.status != ConditionStatus::True => Some(format!(
                "waiting for system-upgrade-controller to be ready: {}",
                c.reason
            )),
            Some(c) if &c.message != target => Some(format!(
                "waiting for system-upgrade-controller to be upgraded to {target}"
            )),
            Some(_) => None,
        }
    }

    async fn aggregation_input(
        &self,
        cluster: &ProvisioningCluster,
    ) -> Result<Option<AggregationInput>, ReconcileError> {
        if !is_local_cluster(cluster) {
            return Ok(None);
        }
        let management_cluster = cluster
            .status
            .as_ref()
            .map(|s| s.cluster_name.as_str())
            .unwrap_or_default();

        let token = self
            .tokens
            .get(management_cluster, DEFAULT_TOKEN_NAME)
            .await?;
        if token.token().is_empty() {
            return Err(ReconcileError::MissingField {
                kind: "ClusterRegistrationToken",
                field: "status.token",
            });
        }

        Ok(Some(AggregationInput {
            server_url: self.settings.internal_server_url.clone(),
            token: token.token().to_string(),
            ca_checksum: self.settings.internal_ca_checksum.clone(),
        }))
    }
}

/// Reconcile the system-agent upgrader bundle of `cluster`.
///
/// # Errors
///
/// Returns an error when a required setting is unset, a lookup fails, the
/// payload cannot be serialized or the apply fails.
pub async fn reconcile_system_agent_bundle(
    delivery: &BundleDelivery,
    cluster: &ProvisioningCluster,
) -> Result<DeliveryOutcome, ReconcileError> {
    let namespace = cluster.namespace().unwrap_or_default();
    let name = cluster.name_any();

    if cluster.metadata.deletion_timestamp.is_some() || cluster.spec.rke_config.is_none() {
        return Ok(DeliveryOutcome::Ignored);
    }

    delivery.require_settings(cluster)?;

    let Some(status) = cluster.status.as_ref() else {
        return Ok(DeliveryOutcome::Skipped("cluster has no status yet".to_string()));
    };
    if status.fleet_workspace_name.is_empty() {
        return Ok(DeliveryOutcome::Skipped(
            "fleet workspace not assigned yet".to_string(),
        ));
    }
    if !is_connected(cluster) || status.client_secret_name.is_empty() {
        return Ok(DeliveryOutcome::Ignored);
    }

    let control_plane = delivery.control_planes.get(&namespace, &name).await?;
    if let Some(reason) = delivery.controller_not_ready(&control_plane) {
        debug!(namespace = %namespace, name = %name, reason = %reason, "Delaying system-agent upgrader delivery");
        return Ok(DeliveryOutcome::Waiting(reason));
    }

    let aggregation = delivery.aggregation_input(cluster).await?;
    let objects = build_upgrader_objects(cluster, &delivery.settings, aggregation.as_ref());
    let resources = serialize_objects(&objects)?;
    let hash = payload_hash(&resources);

    let workspace = status.fleet_workspace_name.as_str();
    let bundle_name = system_agent_bundle_name(&name);
    let existing = match Observed::from_lookup(delivery.bundles.get(workspace, &bundle_name).await)? {
        Observed::Present(bundle) => Some(bundle),
        Observed::Missing(_) => None,
    };
    let applied_hash = existing
        .as_ref()
        .and_then(|b| b.annotations().get(APPLIED_PAYLOAD_HASH_ANNOTATION).cloned());
    if applied_hash.as_deref() == Some(hash.as_str()) {
        debug!(namespace = %namespace, name = %name, bundle = %bundle_name, "System-agent upgrader bundle is up to date");
        return Ok(DeliveryOutcome::Unchanged);
    }

    let Ok(_permit) = delivery.permits.clone().try_acquire_owned() else {
        debug!(namespace = %namespace, name = %name, "Delivery concurrency limit reached");
        return Ok(DeliveryOutcome::Busy);
    };

    info!(
        namespace = %namespace,
        name = %name,
        bundle = %bundle_name,
        workspace = %workspace,
        resources = resources.len(),
        "Applying system-agent upgrader bundle"
    );

    let mut labels = BTreeMap::new();
    labels.insert(K8S_MANAGED_BY.to_string(), MANAGED_BY_UPGRADE_READINESS.to_string());
    let mut annotations = BTreeMap::new();
    annotations.insert(APPLIED_PAYLOAD_HASH_ANNOTATION.to_string(), hash);

    let bundle = Bundle {
        metadata: ObjectMeta {
            name: Some(bundle_name),
            namespace: Some(workspace.to_string()),
            labels: Some(labels),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: BundleSpec {
            default_namespace: Some(SYSTEM_NAMESPACE.to_string()),
            resources,
            targets: vec![BundleTarget {
                cluster_name: Some(name),
            }],
        },
    };
    delivery.bundles.apply(&bundle).await?;
    metrics::record_bundle_applied();

    Ok(DeliveryOutcome::Applied)
}
