// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation logic for upgrade readiness.
//!
//! Two controllers share this module:
//!
//! 1. **Conditions** - For each `RKEControlPlane` of the served management
//!    cluster, derive `SystemUpgradeControllerReady` and `SystemAgentUpgraded`
//!    from the downstream release and plan, and patch status only when the
//!    conditions changed
//! 2. **Delivery** - For each provisioning cluster, build the system-agent
//!    upgrader objects and apply them as a Fleet `Bundle` once the
//!    system-upgrade-controller is ready at the target version
//!
//! # Available Reconcilers
//!
//! - [`reconcile_control_plane`] - Recomputes and persists readiness conditions
//! - [`reconcile_system_agent_bundle`] - Delivers the system-agent upgrader
//!
//! # Example: Using a Reconciler
//!
//! ```rust,no_run
//! use upgrade_readiness::context::Context;
//! use upgrade_readiness::crd::RKEControlPlane;
//! use upgrade_readiness::reconcilers::reconcile_control_plane;
//! use std::sync::Arc;
//!
//! async fn reconcile(ctx: Arc<Context>, cp: RKEControlPlane) -> anyhow::Result<()> {
//!     let written = reconcile_control_plane(&ctx.conditions, ctx.control_planes.as_ref(), &cp).await?;
//!     println!("status written: {written}");
//!     Ok(())
//! }
//! ```

pub mod bundle_delivery;
pub mod cluster_resolver;
pub mod controlplane;
pub mod precedence;
pub mod status;

#[cfg(test)]
mod precedence_tests;

pub use bundle_delivery::{reconcile_system_agent_bundle, BundleDelivery, DeliveryOutcome};
pub use controlplane::{reconcile_control_plane, ConditionHandler};
