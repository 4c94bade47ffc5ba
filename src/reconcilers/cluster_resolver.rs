// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resolution of a management cluster name to its provisioning cluster.

use crate::crd::{is_condition_true, ProvisioningCluster};
use crate::errors::ResolveError;
use crate::repository::ClusterIndex;
use crate::status_reasons::CONDITION_CONNECTED;
use std::sync::Arc;
use tracing::debug;

/// Look up the single provisioning cluster backing `management_cluster`.
///
/// # Errors
///
/// Returns [`ResolveError::Lookup`] when the index cannot be queried and
/// [`ResolveError::Ambiguous`] when it does not yield exactly one cluster.
pub fn resolve_cluster(
    index: &dyn ClusterIndex,
    management_cluster: &str,
) -> Result<Arc<ProvisioningCluster>, ResolveError> {
    let mut clusters = index
        .clusters_for_management_cluster(management_cluster)
        .map_err(|source| ResolveError::Lookup {
            management_cluster: management_cluster.to_string(),
            source,
        })?;

    if clusters.len() != 1 {
        return Err(ResolveError::Ambiguous {
            management_cluster: management_cluster.to_string(),
            count: clusters.len(),
        });
    }

    let cluster = clusters.remove(0);
    debug!(
        management_cluster = %management_cluster,
        namespace = ?cluster.metadata.namespace,
        name = ?cluster.metadata.name,
        "Resolved provisioning cluster"
    );
    Ok(cluster)
}

/// Returns `true` when the cluster reports `Connected=True`.
#[must_use]
pub fn is_connected(cluster: &ProvisioningCluster) -> bool {
    cluster
        .status
        .as_ref()
        .is_some_and(|s| is_condition_true(&s.conditions, CONDITION_CONNECTED))
}
