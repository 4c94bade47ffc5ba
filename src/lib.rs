// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Upgrade Readiness - Cross-cluster upgrade gating for RKE clusters
//!
//! Upgrade readiness is a Kubernetes controller written in Rust that tracks
//! whether the system-upgrade-controller and the system-agent of a downstream
//! cluster have been upgraded, and delivers the system-agent upgrader to it.
//!
//! ## Overview
//!
//! - Readiness conditions on `RKEControlPlane` status, derived from the
//!   downstream chart release and upgrade plan
//! - Construction of the system-agent upgrade plans and their RBAC
//! - Deterministic serialization of those objects into a Fleet `Bundle`
//!
//! ## Modules
//!
//! - [`crd`] - Resource types read and written by the controllers
//! - [`reconcilers`] - Condition engine and bundle delivery
//! - [`upgrader_resources`] - Desired upgrader objects for a cluster
//! - [`bundle_digest`] - Bundle resource serialization and hashing
//! - [`repository`] - Generic object access and the cluster index
//! - [`version_gate`] - Kubernetes version thresholds
//! - [`naming`] - Release-safe resource names
//! - [`settings`] - Explicit reconciler settings
//!
//! ## Example
//!
//! ```rust
//! use upgrade_readiness::crd::ConditionStatus;
//! use upgrade_readiness::reconcilers::status::{with_condition, ConditionUpdate};
//! use upgrade_readiness::status_reasons::CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY;
//! use chrono::Utc;
//!
//! let conditions = with_condition(
//!     &[],
//!     CONDITION_SYSTEM_UPGRADE_CONTROLLER_READY,
//!     &ConditionUpdate::ready("160.1.0"),
//!     Utc::now(),
//! );
//! assert_eq!(conditions[0].status, ConditionStatus::True);
//! assert_eq!(conditions[0].message, "160.1.0");
//! ```

pub mod bundle_digest;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod naming;
pub mod reconcilers;
pub mod repository;
pub mod settings;
pub mod status_reasons;
pub mod upgrader_resources;
pub mod version_gate;

#[cfg(test)]
mod test_fixtures;

#[cfg(test)]
mod errors_tests;
#[cfg(test)]
mod naming_tests;
#[cfg(test)]
mod settings_tests;
#[cfg(test)]
mod version_gate_tests;
