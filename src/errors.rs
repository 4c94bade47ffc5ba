// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the upgrade-readiness reconciler.
//!
//! The taxonomy follows how each failure is handled:
//! - [`LookupError::NotFound`] on a dependent object is recovered locally and
//!   turned into a `False` condition
//! - [`ResolveError`] (zero or multiple cluster matches) is fatal and retried
//! - [`LookupError::Api`] (transport, permission) is fatal and retried
//! - [`SerializeError`] aborts a whole bundle payload
//! - [`ReconcileError::Conflict`] means a status write raced another writer and
//!   is retried against a fresh copy
//!
//! Malformed version strings never surface as errors; the version gate
//! fails safe instead.

use thiserror::Error;

/// Errors returned when fetching a single object or querying an index.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The object does not exist.
    ///
    /// The display form mirrors the Kubernetes API message
    /// (`<resource>.<group> "<name>" not found`) because it ends up verbatim in
    /// condition reasons.
    #[error("{resource} \"{name}\" not found")]
    NotFound {
        /// Qualified resource (e.g. `apps.catalog.cattle.io`)
        resource: String,
        /// Namespace that was queried
        namespace: String,
        /// Name that was queried
        name: String,
    },

    /// The API server rejected or failed the request.
    #[error("failed to get {resource} {namespace}/{name}: {source}")]
    Api {
        resource: String,
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    /// A cache or index could not answer the query.
    #[error("lookup of {resource} {key} failed: {reason}")]
    Unavailable {
        resource: String,
        key: String,
        reason: String,
    },
}

impl LookupError {
    /// Returns `true` when the object simply does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failure to map a management cluster to exactly one provisioning cluster.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("cluster resolution failed for management cluster {management_cluster}: {source}")]
    Lookup {
        management_cluster: String,
        #[source]
        source: LookupError,
    },

    #[error(
        "cluster resolution failed for management cluster {management_cluster}: expected exactly one cluster, found {count}"
    )]
    Ambiguous {
        management_cluster: String,
        count: usize,
    },
}

/// Failure to turn a desired object into a bundle resource.
#[derive(Error, Debug)]
pub enum SerializeError {
    /// The object does not carry a kind or apiVersion after stamping.
    #[error("object {name} has no type metadata")]
    MissingTypeMeta { name: String },

    /// The object could not be rendered as YAML.
    #[error("failed to serialize {kind} {name}: {source}")]
    Yaml {
        kind: String,
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The object could not be converted to a JSON value.
    #[error("failed to convert {kind} {name}: {source}")]
    Json {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal reconcile errors; every variant triggers a retry.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    /// A setting required to build the desired objects is empty.
    #[error("cluster {namespace}/{name}: the {setting} setting is not set")]
    SettingNotSet {
        namespace: String,
        name: String,
        setting: &'static str,
    },

    /// The object is missing a field required by the reconciler.
    #[error("{kind} is missing {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    /// The object changed since it was read; the write was rejected.
    #[error("operation cannot be fulfilled on {resource} \"{name}\": the object has been modified")]
    Conflict {
        resource: String,
        namespace: String,
        name: String,
    },

    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

impl ReconcileError {
    /// Returns `true` when a write lost an optimistic concurrency race.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
