// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `SystemAgentUpgraded` condition.
//!
//! Tracks whether the system-agent upgrade plan in the downstream cluster
//! completed at the version of the configured upgrade image. There is no
//! unset-setting gate: an untagged or empty image resolves to `latest`.

use super::{out_of_scope, ConditionHandler, Gate, Observed, Step};
use crate::constants::{SYSTEM_AGENT_UPGRADER, SYSTEM_NAMESPACE};
use crate::crd::{Plan, RKEControlPlane, RKEControlPlaneStatus};
use crate::errors::ReconcileError;
use crate::reconcilers::precedence::{always, evaluate, keep, Rule, Verdict};
use crate::reconcilers::status::ConditionUpdate;
use crate::status_reasons::{
    reason_waiting_plan, reason_waiting_recreate, CONDITION_SYSTEM_AGENT_UPGRADED,
};

pub const GATE_RULES: &[Rule<Gate>] = &[Rule {
    name: "out-of-scope",
    when: out_of_scope,
    then: keep,
}];

/// What was observed of the upgrade plan.
pub struct PlanObservation {
    pub plan_name: String,
    pub target_version: String,
    pub plan: Observed<Plan>,
}

impl PlanObservation {
    fn present(&self) -> Option<&Plan> {
        match &self.plan {
            Observed::Present(plan) => Some(plan),
            Observed::Missing(_) => None,
        }
    }
}

pub const PLAN_RULES: &[Rule<PlanObservation>] = &[
    Rule {
        name: "plan-missing",
        when: |o| matches!(o.plan, Observed::Missing(_)),
        then: |o| match &o.plan {
            Observed::Missing(text) => Verdict::Set(ConditionUpdate::waiting(text.clone())),
            Observed::Present(_) => Verdict::Keep,
        },
    },
    Rule {
        name: "plan-deleting",
        when: |o| {
            o.present()
                .is_some_and(|plan| plan.metadata.deletion_timestamp.is_some())
        },
        then: |o| Verdict::Set(ConditionUpdate::waiting(reason_waiting_recreate(&o.plan_name))),
    },
    Rule {
        name: "plan-complete",
        when: |o| {
            o.present().is_some_and(|plan| {
                plan.latest_version() == o.target_version && plan.is_complete()
            })
        },
        then: |o| Verdict::Set(ConditionUpdate::ready(o.target_version.clone())),
    },
    Rule {
        name: "plan-pending",
        when: always,
        then: |o| {
            Verdict::Set(ConditionUpdate::waiting(reason_waiting_plan(
                &o.plan_name,
                &o.target_version,
            )))
        },
    },
];

impl ConditionHandler {
    /// Compute `SystemAgentUpgraded` on a copy of `status`.
    ///
    /// # Errors
    ///
    /// Returns an error when cluster resolution fails or the plan lookup
    /// fails with anything but not-found.
    pub async fn sync_system_agent_upgraded_condition(
        &self,
        control_plane: &RKEControlPlane,
        status: &RKEControlPlaneStatus,
    ) -> Result<RKEControlPlaneStatus, ReconcileError> {
        let target_version = self.settings.system_agent_upgrader_version();
        let gate = Gate::new(
            control_plane,
            &self.management_cluster_name,
            target_version,
            status,
            CONDITION_SYSTEM_AGENT_UPGRADED,
        );

        if let Step::Decided(rule, verdict) = self.gate_and_resolve(GATE_RULES, &gate)? {
            return Ok(Self::apply_verdict(
                status,
                CONDITION_SYSTEM_AGENT_UPGRADED,
                rule,
                verdict,
                control_plane,
            ));
        }

        let plan = Observed::from_lookup(
            self.plans
                .get(SYSTEM_NAMESPACE, SYSTEM_AGENT_UPGRADER)
                .await,
        )?;

        let observation = PlanObservation {
            plan_name: SYSTEM_AGENT_UPGRADER.to_string(),
            target_version: target_version.to_string(),
            plan,
        };
        let (rule, verdict) = evaluate(PLAN_RULES, &observation).unwrap_or(("none", Verdict::Keep));
        Ok(Self::apply_verdict(
            status,
            CONDITION_SYSTEM_AGENT_UPGRADED,
            rule,
            verdict,
            control_plane,
        ))
    }
}
