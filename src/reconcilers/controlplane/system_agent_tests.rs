// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `system_agent.rs`

#[cfg(test)]
mod tests {
    use crate::constants::{SYSTEM_AGENT_UPGRADER, SYSTEM_NAMESPACE};
    use crate::crd::{Condition, ConditionStatus, RKEControlPlane, RKEControlPlaneStatus};
    use crate::errors::ReconcileError;
    use crate::reconcilers::controlplane::reconcile_control_plane;
    use crate::reconcilers::status::find_condition;
    use crate::repository::{MemoryRepository, StaticClusterIndex};
    use crate::status_reasons::{
        CONDITION_SYSTEM_AGENT_UPGRADED, CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY,
    };
    use crate::test_fixtures::{
        app, cluster, condition, connected_harness, control_plane, harness, mark_deleting, plan,
        settings, CHART_VERSION, CLUSTER_NAME, CLUSTER_NAMESPACE, MANAGEMENT_CLUSTER,
    };
    use serde_json::json;

    const UPGRADED: &str = CONDITION_SYSTEM_AGENT_UPGRADED;
    const IMAGE: &str = "rancher/system-agent:v0.3.9-suc";

    fn stored_status(cp: &RKEControlPlane) -> RKEControlPlaneStatus {
        cp.status.clone().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_deleting_control_plane_is_left_untouched() {
        let h = connected_harness(settings(CHART_VERSION, IMAGE));
        let mut cp = control_plane(MANAGEMENT_CLUSTER, vec![]);
        mark_deleting(&mut cp.metadata);

        let status = h
            .handler
            .sync_system_agent_upgraded_condition(&cp, &stored_status(&cp))
            .await
            .unwrap();

        assert!(status.conditions.is_empty());
        assert_eq!(h.plans.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_unset_image_targets_latest() {
        let h = connected_harness(settings(CHART_VERSION, ""));
        h.plans.insert(plan("latest", true));
        let cp = control_plane(MANAGEMENT_CLUSTER, vec![]);

        let status = h
            .handler
            .sync_system_agent_upgraded_condition(&cp, &stored_status(&cp))
            .await
            .unwrap();

        let cond = find_condition(&status.conditions, UPGRADED).unwrap();
        assert_eq!(cond.status, ConditionStatus::True);
        assert_eq!(cond.message, "latest");
    }

    #[tokio::test]
    async fn test_disconnected_cluster_is_left_untouched() {
        let h = harness(
            settings(CHART_VERSION, IMAGE),
            StaticClusterIndex::new([cluster(MANAGEMENT_CLUSTER, false)]),
        );
        let cp = control_plane(MANAGEMENT_CLUSTER, vec![]);

        let status = h
            .handler
            .sync_system_agent_upgraded_condition(&cp, &stored_status(&cp))
            .await
            .unwrap();

        assert!(status.conditions.is_empty());
        assert_eq!(h.plans.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_plan_sets_false() {
        let h = connected_harness(settings(CHART_VERSION, IMAGE));
        let cp = control_plane(MANAGEMENT_CLUSTER, vec![]);

        let status = h
            .handler
            .sync_system_agent_upgraded_condition(&cp, &stored_status(&cp))
            .await
            .unwrap();

        let cond = find_condition(&status.conditions, UPGRADED).unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert!(cond.reason.contains("not found"));
        assert!(cond.reason.contains(SYSTEM_AGENT_UPGRADER));
    }

    #[tokio::test]
    async fn test_plan_lookup_error_propagates() {
        let h = connected_harness(settings(CHART_VERSION, IMAGE));
        h.plans
            .fail_with(SYSTEM_NAMESPACE, SYSTEM_AGENT_UPGRADER, "connection refused");
        let cp = control_plane(MANAGEMENT_CLUSTER, vec![]);

        let err = h
            .handler
            .sync_system_agent_upgraded_condition(&cp, &stored_status(&cp))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Lookup(_)));
    }

    #[tokio::test]
    async fn test_deleting_plan_sets_false_with_recreate_reason() {
        let h = connected_harness(settings(CHART_VERSION, IMAGE));
        let mut upgrader = plan("v0.3.9-suc", true);
        mark_deleting(&mut upgrader.metadata);
        h.plans.insert(upgrader);
        let cp = control_plane(MANAGEMENT_CLUSTER, vec![]);

        let status = h
            .handler
            .sync_system_agent_upgraded_condition(&cp, &stored_status(&cp))
            .await
            .unwrap();

        let cond = find_condition(&status.conditions, UPGRADED).unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(
            cond.reason,
            format!("waiting for {SYSTEM_AGENT_UPGRADER} to be recreated")
        );
    }

    #[tokio::test]
    async fn test_plan_at_other_version_sets_false() {
        let h = connected_harness(settings(CHART_VERSION, IMAGE));
        h.plans.insert(plan("v0.3.8-suc", true));
        let cp = control_plane(MANAGEMENT_CLUSTER, vec![]);

        let status = h
            .handler
            .sync_system_agent_upgraded_condition(&cp, &stored_status(&cp))
            .await
            .unwrap();

        let cond = find_condition(&status.conditions, UPGRADED).unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert!(cond.reason.contains("v0.3.9-suc"));
    }

    #[tokio::test]
    async fn test_incomplete_plan_sets_false() {
        let h = connected_harness(settings(CHART_VERSION, IMAGE));
        h.plans.insert(plan("v0.3.9-suc", false));
        let cp = control_plane(MANAGEMENT_CLUSTER, vec![]);

        let status = h
            .handler
            .sync_system_agent_upgraded_condition(&cp, &stored_status(&cp))
            .await
            .unwrap();

        let cond = find_condition(&status.conditions, UPGRADED).unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
    }

    #[tokio::test]
    async fn test_complete_plan_at_target_sets_true() {
        let h = connected_harness(settings(CHART_VERSION, IMAGE));
        h.plans.insert(plan("v0.3.9-suc", true));
        let cp = control_plane(MANAGEMENT_CLUSTER, vec![]);

        let status = h
            .handler
            .sync_system_agent_upgraded_condition(&cp, &stored_status(&cp))
            .await
            .unwrap();

        let cond = find_condition(&status.conditions, UPGRADED).unwrap();
        assert_eq!(cond.status, ConditionStatus::True);
        assert_eq!(cond.reason, "");
        assert_eq!(cond.message, "v0.3.9-suc");
        assert_eq!(h.plans.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_writes_status_only_on_change() {
        let h = connected_harness(settings(CHART_VERSION, IMAGE));
        h.apps.insert(app(CHART_VERSION, "deployed"));
        h.plans.insert(plan("v0.3.9-suc", true));
        let cp = control_plane(MANAGEMENT_CLUSTER, vec![]);
        let control_planes = MemoryRepository::with_objects([cp.clone()]);

        let written = reconcile_control_plane(&h.handler, &control_planes, &cp)
            .await
            .unwrap();
        assert!(written);

        let writes = control_planes.status_writes();
        assert_eq!(writes.len(), 1);
        let persisted = stored_status(&writes[0]);
        assert_eq!(persisted.conditions.len(), 2);
        assert!(find_condition(
            &persisted.conditions,
            CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY
        )
        .is_some());

        let latest = control_planes
            .stored(CLUSTER_NAMESPACE, CLUSTER_NAME)
            .unwrap();
        let written = reconcile_control_plane(&h.handler, &control_planes, &latest)
            .await
            .unwrap();
        assert!(!written);
        assert_eq!(control_planes.status_writes().len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_carries_foreign_conditions_unchanged() {
        let h = connected_harness(settings(CHART_VERSION, IMAGE));
        h.apps.insert(app(CHART_VERSION, "deployed"));
        h.plans.insert(plan("v0.3.9-suc", true));
        let ready: Condition = serde_json::from_value(json!({
            "type": "Ready",
            "status": "True",
            "lastUpdateTime": "2026-01-01T00:00:00Z",
            "lastTransitionTime": "2025-12-30T08:15:00Z",
            "observedGeneration": 3
        }))
        .unwrap();
        let provisioned: Condition = serde_json::from_value(json!({
            "type": "Provisioned",
            "status": "",
            "reason": "Waiting"
        }))
        .unwrap();
        let mut cp = control_plane(MANAGEMENT_CLUSTER, vec![ready.clone(), provisioned.clone()]);
        cp.metadata.resource_version = Some("41".to_string());
        if let Some(status) = cp.status.as_mut() {
            status.extra.insert("observedGeneration".to_string(), json!(5));
        }
        let control_planes = MemoryRepository::with_objects([cp.clone()]);

        assert!(reconcile_control_plane(&h.handler, &control_planes, &cp)
            .await
            .unwrap());

        let writes = control_planes.status_writes();
        assert_eq!(writes[0].metadata.resource_version.as_deref(), Some("41"));
        let persisted = stored_status(&writes[0]);
        assert_eq!(find_condition(&persisted.conditions, "Ready"), Some(&ready));
        assert_eq!(find_condition(&persisted.conditions, "Provisioned"), Some(&provisioned));
        assert_eq!(persisted.extra.get("observedGeneration"), Some(&json!(5)));
        let wire = serde_json::to_value(&persisted).unwrap();
        assert_eq!(
            wire["conditions"][0],
            json!({
                "type": "Ready",
                "status": "True",
                "lastUpdateTime": "2026-01-01T00:00:00Z",
                "lastTransitionTime": "2025-12-30T08:15:00Z",
                "observedGeneration": 3
            })
        );
    }

    #[tokio::test]
    async fn test_reconcile_of_stale_copy_is_rejected() {
        let h = connected_harness(settings(CHART_VERSION, IMAGE));
        h.apps.insert(app(CHART_VERSION, "deployed"));
        h.plans.insert(plan("v0.3.9-suc", true));
        let mut stale = control_plane(MANAGEMENT_CLUSTER, vec![]);
        stale.metadata.resource_version = Some("7".to_string());
        let mut latest = stale.clone();
        latest.metadata.resource_version = Some("8".to_string());
        latest.status = Some(RKEControlPlaneStatus {
            conditions: vec![condition("Ready", ConditionStatus::True, "", "")],
            ..RKEControlPlaneStatus::default()
        });
        let control_planes = MemoryRepository::with_objects([latest.clone()]);

        let err = reconcile_control_plane(&h.handler, &control_planes, &stale)
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert!(control_planes.status_writes().is_empty());
        let kept = control_planes
            .stored(CLUSTER_NAMESPACE, CLUSTER_NAME)
            .unwrap();
        assert_eq!(kept.status, latest.status);
    }

    #[tokio::test]
    async fn test_reconcile_does_not_write_when_lookup_fails() {
        let h = connected_harness(settings(CHART_VERSION, IMAGE));
        h.plans
            .fail_with(SYSTEM_NAMESPACE, SYSTEM_AGENT_UPGRADER, "forbidden");
        let cp = control_plane(
            MANAGEMENT_CLUSTER,
            vec![condition(UPGRADED, ConditionStatus::True, "", "v0.3.8-suc")],
        );
        let control_planes = MemoryRepository::with_objects([cp.clone()]);

        let result = reconcile_control_plane(&h.handler, &control_planes, &cp).await;

        assert!(result.is_err());
        assert!(control_planes.status_writes().is_empty());
    }
}
