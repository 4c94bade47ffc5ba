// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common fixtures for integration tests

#![allow(dead_code)]

use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;
use upgrade_readiness::crd::{
    App, Bundle, ClusterRegistrationToken, Plan, ProvisioningCluster, RKEControlPlane,
};
use upgrade_readiness::reconcilers::{BundleDelivery, ConditionHandler};
use upgrade_readiness::repository::{MemoryRepository, StaticClusterIndex};
use upgrade_readiness::settings::Settings;

pub const MANAGEMENT_CLUSTER: &str = "c-m-7xk2p";
pub const CLUSTER_NAME: &str = "edge-01";
pub const WORKSPACE: &str = "fleet-default";
pub const CHART_VERSION: &str = "160.1.0";
pub const UPGRADE_IMAGE: &str = "rancher/system-agent:v0.3.13-suc";
pub const AGENT_VERSION: &str = "v0.3.13-suc";

pub fn settings() -> Settings {
    Settings {
        system_upgrade_controller_chart_version: CHART_VERSION.to_string(),
        system_agent_upgrade_image: UPGRADE_IMAGE.to_string(),
        wins_agent_upgrade_image: "rancher/wins:v0.5.1".to_string(),
        ..Settings::default()
    }
}

pub fn provisioning_cluster() -> ProvisioningCluster {
    serde_json::from_value(json!({
        "apiVersion": "provisioning.cattle.io/v1",
        "kind": "Cluster",
        "metadata": {"name": CLUSTER_NAME, "namespace": WORKSPACE, "uid": "0b7c-edge-01"},
        "spec": {
            "kubernetesVersion": "v1.30.4+rke2r1",
            "agentEnvVars": [{"name": "HTTP_PROXY", "value": "http://proxy:3128"}],
            "rkeConfig": {}
        },
        "status": {
            "clusterName": MANAGEMENT_CLUSTER,
            "fleetWorkspaceName": WORKSPACE,
            "clientSecretName": "edge-01-kubeconfig",
            "conditions": [{"type": "Connected", "status": "True"}]
        }
    }))
    .expect("valid cluster")
}

pub fn control_plane() -> RKEControlPlane {
    serde_json::from_value(json!({
        "apiVersion": "rke.cattle.io/v1",
        "kind": "RKEControlPlane",
        "metadata": {"name": CLUSTER_NAME, "namespace": WORKSPACE},
        "spec": {
            "clusterName": CLUSTER_NAME,
            "managementClusterName": MANAGEMENT_CLUSTER,
            "kubernetesVersion": "v1.30.4+rke2r1"
        }
    }))
    .expect("valid control plane")
}

pub fn release(name: &str, version: &str, state: &str) -> App {
    serde_json::from_value(json!({
        "apiVersion": "catalog.cattle.io/v1",
        "kind": "App",
        "metadata": {"name": name, "namespace": "cattle-system"},
        "spec": {"chart": {"metadata": {"name": "system-upgrade-controller", "version": version}}},
        "status": {"summary": {"state": state}}
    }))
    .expect("valid app")
}

pub fn upgrade_plan(latest_version: &str, complete: bool) -> Plan {
    let complete = if complete { "True" } else { "False" };
    serde_json::from_value(json!({
        "apiVersion": "upgrade.cattle.io/v1",
        "kind": "Plan",
        "metadata": {"name": "system-agent-upgrader", "namespace": "cattle-system"},
        "spec": {"concurrency": 10},
        "status": {
            "latestVersion": latest_version,
            "conditions": [{"type": "Complete", "status": complete}]
        }
    }))
    .expect("valid plan")
}

/// Both reconcilers wired to shared in-memory repositories.
pub struct World {
    pub handler: ConditionHandler,
    pub delivery: BundleDelivery,
    pub apps: Arc<MemoryRepository<App>>,
    pub plans: Arc<MemoryRepository<Plan>>,
    pub control_planes: Arc<MemoryRepository<RKEControlPlane>>,
    pub bundles: Arc<MemoryRepository<Bundle>>,
}

pub fn world() -> World {
    let apps = Arc::new(MemoryRepository::<App>::new());
    let plans = Arc::new(MemoryRepository::<Plan>::new());
    let control_planes = Arc::new(MemoryRepository::<RKEControlPlane>::new());
    let bundles = Arc::new(MemoryRepository::<Bundle>::new());
    let tokens = Arc::new(MemoryRepository::<ClusterRegistrationToken>::new());

    let handler = ConditionHandler {
        management_cluster_name: MANAGEMENT_CLUSTER.to_string(),
        settings: settings(),
        clusters: Arc::new(StaticClusterIndex::new([provisioning_cluster()])),
        apps: apps.clone(),
        plans: plans.clone(),
    };
    let delivery = BundleDelivery {
        settings: settings(),
        control_planes: control_planes.clone(),
        bundles: bundles.clone(),
        tokens,
        permits: Arc::new(Semaphore::new(1)),
    };

    World {
        handler,
        delivery,
        apps,
        plans,
        control_planes,
        bundles,
    }
}

impl World {
    /// Register the control plane with the API and return the stored copy.
    pub fn create_control_plane(&self, mut control_plane: RKEControlPlane) -> RKEControlPlane {
        control_plane.metadata.resource_version = Some("1".to_string());
        self.control_planes.insert(control_plane);
        self.latest_control_plane()
    }

    /// Latest stored copy of the control plane, as a watch would deliver it.
    pub fn latest_control_plane(&self) -> RKEControlPlane {
        self.control_planes
            .stored(WORKSPACE, CLUSTER_NAME)
            .expect("stored control plane")
    }
}
