// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `SystemUpgradeControllerReady` condition.
//!
//! Tracks whether the system-upgrade-controller chart release in the
//! downstream cluster runs the configured chart version and is deployed.

use super::{out_of_scope, ConditionHandler, Gate, Observed, Step};
use crate::constants::SYSTEM_NAMESPACE;
use crate::crd::{App, ConditionStatus, RKEControlPlane, RKEControlPlaneStatus};
use crate::errors::ReconcileError;
use crate::naming::system_upgrade_controller_app_name;
use crate::reconcilers::precedence::{always, evaluate, keep, Rule, Verdict};
use crate::reconcilers::status::ConditionUpdate;
use crate::status_reasons::{
    reason_waiting_ready, reason_waiting_reinstall, reason_waiting_update,
    CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY, REASON_VERSION_SETTING_NOT_CONFIGURED,
};

/// Gates evaluated before the cluster is resolved.
pub const GATE_RULES: &[Rule<Gate>] = &[
    Rule {
        name: "out-of-scope",
        when: out_of_scope,
        then: keep,
    },
    Rule {
        name: "chart-version-unset",
        when: |gate| gate.target_version.is_empty(),
        then: chart_version_unset,
    },
];

fn chart_version_unset(gate: &Gate) -> Verdict {
    let settled = gate
        .current
        .as_ref()
        .is_some_and(|c| c.status == ConditionStatus::True && c.message == gate.target_version);
    if settled {
        Verdict::Keep
    } else {
        Verdict::Set(ConditionUpdate::waiting(
            REASON_VERSION_SETTING_NOT_CONFIGURED,
        ))
    }
}

/// What was observed of the chart release.
pub struct ReleaseObservation {
    pub release_name: String,
    pub target_version: String,
    pub app: Observed<App>,
}

impl ReleaseObservation {
    fn present(&self) -> Option<&App> {
        match &self.app {
            Observed::Present(app) => Some(app),
            Observed::Missing(_) => None,
        }
    }
}

/// Rules evaluated once the release lookup has completed.
pub const RELEASE_RULES: &[Rule<ReleaseObservation>] = &[
    Rule {
        name: "release-missing",
        when: |o| matches!(o.app, Observed::Missing(_)),
        then: |o| match &o.app {
            Observed::Missing(text) => Verdict::Set(ConditionUpdate::waiting(text.clone())),
            Observed::Present(_) => Verdict::Keep,
        },
    },
    Rule {
        name: "release-deleting",
        when: |o| {
            o.present()
                .is_some_and(|app| app.metadata.deletion_timestamp.is_some())
        },
        then: |o| Verdict::Set(ConditionUpdate::waiting(reason_waiting_reinstall(&o.release_name))),
    },
    Rule {
        name: "version-mismatch",
        when: |o| {
            o.present()
                .is_some_and(|app| app.chart_version() != o.target_version)
        },
        then: |o| {
            Verdict::Set(ConditionUpdate::waiting(reason_waiting_update(
                &o.release_name,
                &o.target_version,
            )))
        },
    },
    Rule {
        name: "not-deployed",
        when: |o| {
            o.present()
                .is_some_and(|app| !app.rollout_state().is_deployed())
        },
        then: |o| {
            let state = o
                .present()
                .map(|app| app.rollout_state().to_string())
                .unwrap_or_default();
            Verdict::Set(ConditionUpdate::waiting(reason_waiting_ready(
                &o.release_name,
                &state,
            )))
        },
    },
    Rule {
        name: "ready",
        when: always,
        then: |o| {
            let version = o.present().map_or(o.target_version.as_str(), App::chart_version);
            Verdict::Set(ConditionUpdate::ready(version))
        },
    },
];

impl ConditionHandler {
    /// Compute `SystemUpgradeControllerReady` on a copy of `status`.
    ///
    /// # Errors
    ///
    /// Returns an error when cluster resolution fails or the release lookup
    /// fails with anything but not-found.
    pub async fn sync_system_upgrade_controller_condition(
        &self,
        control_plane: &RKEControlPlane,
        status: &RKEControlPlaneStatus,
    ) -> Result<RKEControlPlaneStatus, ReconcileError> {
        let target_version = self.settings.system_upgrade_controller_chart_version.as_str();
        let gate = Gate::new(
            control_plane,
            &self.management_cluster_name,
            target_version,
            status,
            CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY,
        );

        if let Step::Decided(rule, verdict) = self.gate_and_resolve(GATE_RULES, &gate)? {
            return Ok(Self::apply_verdict(
                status,
                CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY,
                rule,
                verdict,
                control_plane,
            ));
        }

        let release_name = system_upgrade_controller_app_name(&control_plane.spec.cluster_name);
        let app = Observed::from_lookup(self.apps.get(SYSTEM_NAMESPACE, &release_name).await)?;

        let observation = ReleaseObservation {
            release_name,
            target_version: target_version.to_string(),
            app,
        };
        let (rule, verdict) = evaluate(RELEASE_RULES, &observation).unwrap_or(("none", Verdict::Keep));
        Ok(Self::apply_verdict(
            status,
            CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY,
            rule,
            verdict,
            control_plane,
        ))
    }
}
