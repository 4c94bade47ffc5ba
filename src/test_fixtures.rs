// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Object builders shared by the unit tests.

use crate::constants::{SYSTEM_AGENT_UPGRADER, SYSTEM_NAMESPACE};
use crate::crd::{
    App, AppSpec, AppStatus, AppSummary, Chart, ChartMetadata, Condition, ConditionStatus, Plan,
    PlanSpec, PlanStatus, ProvisioningCluster, ProvisioningClusterSpec, ProvisioningClusterStatus,
    RKEConfig, RKEControlPlane, RKEControlPlaneSpec, RKEControlPlaneStatus,
    PLAN_COMPLETE_CONDITION,
};
use crate::naming::system_upgrade_controller_app_name;
use crate::reconcilers::controlplane::ConditionHandler;
use crate::repository::{MemoryRepository, StaticClusterIndex};
use crate::settings::Settings;
use crate::status_reasons::CONDITION_CONNECTED;
use kube::api::ObjectMeta;
use std::sync::Arc;

pub const MANAGEMENT_CLUSTER: &str = "c-m-abc123";
pub const CLUSTER_NAME: &str = "dev-cluster";
pub const CLUSTER_NAMESPACE: &str = "fleet-default";
pub const CHART_VERSION: &str = "160.1.0";

pub fn meta(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        uid: Some(format!("uid-{name}")),
        generation: Some(1),
        ..Default::default()
    }
}

/// Mark an object as being deleted.
pub fn mark_deleting(meta: &mut ObjectMeta) {
    meta.deletion_timestamp =
        serde_json::from_value(serde_json::json!("2025-01-01T00:00:00Z")).unwrap();
}

pub fn condition(condition_type: &str, status: ConditionStatus, reason: &str, message: &str) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status,
        reason: reason.to_string(),
        message: message.to_string(),
        last_update_time: Some("2025-01-01T00:00:00+00:00".to_string()),
        ..Condition::default()
    }
}

pub fn control_plane(management_cluster: &str, conditions: Vec<Condition>) -> RKEControlPlane {
    RKEControlPlane {
        metadata: meta(CLUSTER_NAMESPACE, CLUSTER_NAME),
        spec: RKEControlPlaneSpec {
            cluster_name: CLUSTER_NAME.to_string(),
            management_cluster_name: management_cluster.to_string(),
            kubernetes_version: "v1.30.4+rke2r1".to_string(),
        },
        status: Some(RKEControlPlaneStatus {
            conditions,
            ..RKEControlPlaneStatus::default()
        }),
    }
}

pub fn cluster(management_cluster: &str, connected: bool) -> ProvisioningCluster {
    let status = if connected {
        ConditionStatus::True
    } else {
        ConditionStatus::False
    };
    ProvisioningCluster {
        metadata: meta(CLUSTER_NAMESPACE, CLUSTER_NAME),
        spec: ProvisioningClusterSpec {
            kubernetes_version: "v1.30.4+rke2r1".to_string(),
            rke_config: Some(RKEConfig::default()),
            ..Default::default()
        },
        status: Some(ProvisioningClusterStatus {
            cluster_name: management_cluster.to_string(),
            fleet_workspace_name: CLUSTER_NAMESPACE.to_string(),
            client_secret_name: format!("{CLUSTER_NAME}-kubeconfig"),
            conditions: vec![condition(CONDITION_CONNECTED, status, "", "")],
        }),
    }
}

pub fn app(version: &str, state: &str) -> App {
    App {
        metadata: meta(SYSTEM_NAMESPACE, &system_upgrade_controller_app_name(CLUSTER_NAME)),
        spec: AppSpec {
            chart: Some(Chart {
                metadata: Some(ChartMetadata {
                    name: "system-upgrade-controller".to_string(),
                    version: version.to_string(),
                }),
            }),
        },
        status: Some(AppStatus {
            summary: AppSummary {
                state: state.to_string(),
                ..Default::default()
            },
        }),
    }
}

pub fn plan(latest_version: &str, complete: bool) -> Plan {
    let complete = if complete {
        ConditionStatus::True
    } else {
        ConditionStatus::False
    };
    Plan {
        metadata: meta(SYSTEM_NAMESPACE, SYSTEM_AGENT_UPGRADER),
        spec: PlanSpec {
            concurrency: 10,
            ..Default::default()
        },
        status: Some(PlanStatus {
            latest_version: latest_version.to_string(),
            latest_hash: String::new(),
            conditions: vec![condition(PLAN_COMPLETE_CONDITION, complete, "", "")],
        }),
    }
}

pub fn settings(chart_version: &str, upgrade_image: &str) -> Settings {
    Settings {
        system_upgrade_controller_chart_version: chart_version.to_string(),
        system_agent_upgrade_image: upgrade_image.to_string(),
        ..Default::default()
    }
}

/// Handler wired to in-memory fakes, returned alongside them for inspection.
pub struct Harness {
    pub handler: ConditionHandler,
    pub clusters: Arc<StaticClusterIndex>,
    pub apps: Arc<MemoryRepository<App>>,
    pub plans: Arc<MemoryRepository<Plan>>,
}

pub fn harness(settings: Settings, clusters: StaticClusterIndex) -> Harness {
    let clusters = Arc::new(clusters);
    let apps = Arc::new(MemoryRepository::<App>::new());
    let plans = Arc::new(MemoryRepository::<Plan>::new());
    let handler = ConditionHandler {
        management_cluster_name: MANAGEMENT_CLUSTER.to_string(),
        settings,
        clusters: clusters.clone(),
        apps: apps.clone(),
        plans: plans.clone(),
    };
    Harness {
        handler,
        clusters,
        apps,
        plans,
    }
}

/// Harness with one connected cluster for [`MANAGEMENT_CLUSTER`].
pub fn connected_harness(settings: Settings) -> Harness {
    harness(
        settings,
        StaticClusterIndex::new([cluster(MANAGEMENT_CLUSTER, true)]),
    )
}
