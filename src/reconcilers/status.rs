// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `RKEControlPlane` resources.
//!
//! Conditions are never mutated in place: every helper takes the current
//! condition list and returns a new one. Callers decide whether and how to
//! persist the result.
//!
//! # Condition Format
//!
//! - `type`: The aspect being reported (e.g. `SystemAgentUpgraded`)
//! - `status`: `True`, `False` or `Unknown`
//! - `reason`: A short machine-oriented reason, empty on success
//! - `message`: On success, the version that is now current
//! - `lastUpdateTime`: RFC3339 timestamp of the last change to any of the above
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use upgrade_readiness::crd::{ConditionStatus, RKEControlPlaneStatus};
//! use upgrade_readiness::reconcilers::status::{set_condition, ConditionUpdate};
//!
//! let status = RKEControlPlaneStatus::default();
//! let next = set_condition(
//!     &status,
//!     "SystemUpgradeControllerReady",
//!     &ConditionUpdate::ready("160.1.0"),
//!     Utc::now(),
//! );
//! assert_eq!(next.conditions[0].status, ConditionStatus::True);
//! assert!(status.conditions.is_empty());
//! ```

use crate::crd::{Condition, ConditionStatus, RKEControlPlaneStatus};
use chrono::{DateTime, Utc};

/// Desired state of a single condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionUpdate {
    pub status: ConditionStatus,
    pub reason: String,
    /// New message, or `None` to keep the stored one
    pub message: Option<String>,
}

impl ConditionUpdate {
    /// `False` with `reason`, keeping the stored message.
    #[must_use]
    pub fn waiting(reason: impl Into<String>) -> Self {
        Self {
            status: ConditionStatus::False,
            reason: reason.into(),
            message: None,
        }
    }

    /// `True` with the reason cleared and `message` recorded.
    #[must_use]
    pub fn ready(message: impl Into<String>) -> Self {
        Self {
            status: ConditionStatus::True,
            reason: String::new(),
            message: Some(message.into()),
        }
    }
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Apply `update` to the condition of `condition_type`, returning a new list.
///
/// `lastUpdateTime` is set to `now` only when status, reason or message
/// actually change, `lastTransitionTime` only when status changes. Applying the
/// same update twice yields an identical list. Other conditions are copied as is.
#[must_use]
pub fn with_condition(
    conditions: &[Condition],
    condition_type: &str,
    update: &ConditionUpdate,
    now: DateTime<Utc>,
) -> Vec<Condition> {
    let mut next = conditions.to_vec();

    match next.iter_mut().find(|c| c.r#type == condition_type) {
        Some(existing) => {
            let message = update
                .message
                .clone()
                .unwrap_or_else(|| existing.message.clone());
            if existing.status != update.status
                || existing.reason != update.reason
                || existing.message != message
            {
                if existing.status != update.status {
                    existing.last_transition_time = Some(now.to_rfc3339());
                }
                existing.status = update.status;
                existing.reason.clone_from(&update.reason);
                existing.message = message;
                existing.last_update_time = Some(now.to_rfc3339());
            }
        }
        None => next.push(Condition {
            r#type: condition_type.to_string(),
            status: update.status,
            reason: update.reason.clone(),
            message: update.message.clone().unwrap_or_default(),
            last_update_time: Some(now.to_rfc3339()),
            last_transition_time: Some(now.to_rfc3339()),
            ..Condition::default()
        }),
    }

    next
}

/// Apply `update` to a copy of a control-plane status.
#[must_use]
pub fn set_condition(
    status: &RKEControlPlaneStatus,
    condition_type: &str,
    update: &ConditionUpdate,
    now: DateTime<Utc>,
) -> RKEControlPlaneStatus {
    RKEControlPlaneStatus {
        conditions: with_condition(&status.conditions, condition_type, update, now),
        extra: status.extra.clone(),
    }
}

/// Status of a condition, `None` when the condition is absent.
#[must_use]
pub fn condition_status(
    status: &RKEControlPlaneStatus,
    condition_type: &str,
) -> Option<ConditionStatus> {
    find_condition(&status.conditions, condition_type).map(|c| c.status)
}

/// Message of a condition, empty when the condition is absent.
#[must_use]
pub fn condition_message<'a>(status: &'a RKEControlPlaneStatus, condition_type: &str) -> &'a str {
    find_condition(&status.conditions, condition_type).map_or("", |c| c.message.as_str())
}

/// Compare two condition lists semantically, ignoring timestamps.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        find_condition(current, &new_cond.r#type).is_some_and(|curr| {
            curr.status == new_cond.status
                && curr.reason == new_cond.reason
                && curr.message == new_cond.message
        })
    })
}
