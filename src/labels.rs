// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label and annotation constants used on generated and observed objects.

// ============================================================================
// Kubernetes Standard Labels
// ============================================================================

/// Well-known node label carrying the operating system
pub const K8S_OS_LABEL: &str = "kubernetes.io/os";

/// Standard label for the tool managing the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value for `app.kubernetes.io/managed-by` on delivered bundles
pub const MANAGED_BY_UPGRADE_READINESS: &str = "upgrade-readiness";

/// Operating system label values
pub const OS_LINUX: &str = "linux";
pub const OS_WINDOWS: &str = "windows";

// ============================================================================
// Annotations
// ============================================================================

/// Plan annotation listing the fields the system-upgrade-controller digests
pub const UPGRADE_DIGEST_ANNOTATION: &str = "upgrade.cattle.io/digest";

/// Value of [`UPGRADE_DIGEST_ANNOTATION`] on system-agent plans
pub const UPGRADE_DIGEST_FIELDS: &str = "spec.upgrade.envs,spec.upgrade.envFrom";

/// Bundle annotation recording the digest of the applied payload
pub const APPLIED_PAYLOAD_HASH_ANNOTATION: &str = "rke.cattle.io/applied-system-agent-upgrader-hash";
