// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the upgrade-readiness reconciler.
//!
//! This module contains the well-known names, namespaces and numeric limits
//! shared by the condition engine and the system-agent bundle delivery.

// ============================================================================
// Namespaces
// ============================================================================

/// Namespace holding the system components in every downstream cluster
pub const SYSTEM_NAMESPACE: &str = "cattle-system";

/// Fleet workspace namespace of the local (management) cluster
pub const FLEET_LOCAL_NAMESPACE: &str = "fleet-local";

/// Management cluster name of the local cluster
pub const LOCAL_CLUSTER_NAME: &str = "local";

// ============================================================================
// Well-known object names
// ============================================================================

/// Registration token read for the local cluster's aggregation secret
pub const DEFAULT_TOKEN_NAME: &str = "default-token";

/// Name of the linux system-agent upgrade plan, its service account and RBAC objects
pub const SYSTEM_AGENT_UPGRADER: &str = "system-agent-upgrader";

/// Name of the windows system-agent upgrade plan
pub const SYSTEM_AGENT_UPGRADER_WINDOWS: &str = "system-agent-upgrader-windows";

/// Secret carrying the forced-redeploy generation counter
pub const GENERATION_SECRET_NAME: &str = "system-agent-upgrade-generation";

/// Secret holding the agent connection settings in downstream clusters
pub const AGGREGATION_SECRET_NAME: &str = "stv-aggregation";

/// Prefix of the content-keyed aggregation secret of the local cluster
pub const LOCAL_AGGREGATION_SECRET_PREFIX: &str = "stv-aggregation-local-";

/// Suffix of the system-upgrade-controller release name
pub const SYSTEM_UPGRADE_CONTROLLER: &str = "system-upgrade-controller";

/// Suffix of the system-agent bundle name
pub const SYSTEM_AGENT: &str = "system-agent";

/// Infix shared by all managed release and bundle names
pub const MANAGED_INFIX: &str = "managed";

/// Version used when an image reference carries no tag
pub const DEFAULT_IMAGE_TAG: &str = "latest";

// ============================================================================
// Name length limits
// ============================================================================

/// Maximum length of a Helm release name
pub const MAX_HELM_RELEASE_NAME_LENGTH: usize = 53;

/// Maximum length of the system-upgrade-controller release name
pub const MAX_SUC_RELEASE_NAME_LENGTH: usize = 48;

/// Length of the hash suffix appended by `safe_concat_name`
pub const NAME_HASH_LENGTH: usize = 6;

/// Number of hex characters kept from content digests
pub const DIGEST_PREFIX_LENGTH: usize = 12;

// ============================================================================
// Plan tuning
// ============================================================================

/// Number of nodes upgraded in parallel by each plan
pub const PLAN_CONCURRENCY: i64 = 10;

/// Windows account the upgrader runs as
pub const WINDOWS_RUN_AS_USER: &str = "NT AUTHORITY\\SYSTEM";

// ============================================================================
// Agent environment
// ============================================================================

/// Environment variable toggling strict TLS verification in the agent
pub const ENV_STRICT_VERIFY: &str = "STRICT_VERIFY";

/// Environment variable marking every node as a worker
pub const ENV_ROLE_WORKER: &str = "CATTLE_ROLE_WORKER";

/// Environment variable overriding the system-agent data directory
pub const ENV_AGENT_VAR_DIR: &str = "CATTLE_AGENT_VAR_DIR";

/// Aggregation secret key holding the server URL
pub const SECRET_KEY_SERVER: &str = "CATTLE_SERVER";

/// Aggregation secret key holding the registration token
pub const SECRET_KEY_TOKEN: &str = "CATTLE_TOKEN";

/// Aggregation secret key holding the CA checksum
pub const SECRET_KEY_CA_CHECKSUM: &str = "CATTLE_CA_CHECKSUM";

// ============================================================================
// Controller timing
// ============================================================================

/// Requeue delay after a reconcile error
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue delay after a skip or a saturated delivery queue
pub const SKIP_REQUEUE_DURATION_SECS: u64 = 5;

/// Periodic resync of control planes whose conditions are settled
pub const READY_REQUEUE_DURATION_SECS: u64 = 300;

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "upgrade-readiness";
