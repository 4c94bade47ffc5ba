// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deterministic, length-bounded object names.

use crate::constants::{
    MANAGED_INFIX, MAX_HELM_RELEASE_NAME_LENGTH, MAX_SUC_RELEASE_NAME_LENGTH, NAME_HASH_LENGTH,
    SYSTEM_AGENT, SYSTEM_UPGRADE_CONTROLLER,
};
use sha2::{Digest, Sha256};

/// Join `parts` with `-`, keeping the result at most `max_length` bytes long.
///
/// Names that fit are returned unchanged. Longer names are truncated and
/// suffixed with a short SHA-256 digest of the full name so that distinct
/// inputs stay distinct. When `max_length` is 5 or less the name is simply
/// cut. Since truncation may land on a character Kubernetes rejects at the
/// end of a name, the cut point is moved one character left in that case.
///
/// Kubernetes names are ASCII and lengths are counted in bytes. Should a part
/// contain multi-byte characters, every cut backs off to the previous
/// character boundary, so the result may be shorter than `max_length`.
///
/// # Example
///
/// ```rust
/// use upgrade_readiness::naming::safe_concat_name;
///
/// assert_eq!(safe_concat_name(53, &["dev", "managed", "system-agent"]), "dev-managed-system-agent");
/// assert!(safe_concat_name(20, &["a-very-long-cluster-name", "managed", "system-agent"]).len() <= 20);
/// ```
#[must_use]
pub fn safe_concat_name(max_length: usize, parts: &[&str]) -> String {
    let full = parts.join("-");
    if full.len() <= max_length {
        return full;
    }
    if max_length == 0 {
        return String::new();
    }
    if max_length <= 5 {
        return prefix(&full, max_length).to_string();
    }

    let digest = format!("{:x}", Sha256::digest(full.as_bytes()));
    let trailing = max_length.saturating_sub(NAME_HASH_LENGTH + 1);
    let c = full.as_bytes()[trailing];

    if c.is_ascii_lowercase() || c.is_ascii_digit() {
        let remaining = prefix(&full, max_length - NAME_HASH_LENGTH);
        let hash = &digest[..NAME_HASH_LENGTH - 1];
        if remaining.is_empty() {
            return hash.to_string();
        }
        return format!("{remaining}-{hash}");
    }

    format!(
        "{}-{}",
        prefix(&full, max_length - (NAME_HASH_LENGTH + 1)),
        &digest[..NAME_HASH_LENGTH]
    )
}

/// Longest prefix of `s` at most `len` bytes long that ends on a char boundary.
fn prefix(s: &str, len: usize) -> &str {
    let mut end = len.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Name of the system-upgrade-controller release deployed for `cluster_name`.
#[must_use]
pub fn system_upgrade_controller_app_name(cluster_name: &str) -> String {
    safe_concat_name(
        MAX_SUC_RELEASE_NAME_LENGTH,
        &[cluster_name, MANAGED_INFIX, SYSTEM_UPGRADE_CONTROLLER],
    )
}

/// Name of the Fleet bundle delivering the system-agent upgrader to `cluster_name`.
#[must_use]
pub fn system_agent_bundle_name(cluster_name: &str) -> String {
    safe_concat_name(
        MAX_HELM_RELEASE_NAME_LENGTH,
        &[cluster_name, MANAGED_INFIX, SYSTEM_AGENT],
    )
}
