// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic object access used by the reconcilers.
//!
//! Every object type goes through the same [`Repository`] trait instead of a
//! dedicated client per resource kind. Status writes replace the status
//! subresource under the resource version that was read, so a stale copy
//! never overwrites newer conditions. [`KubeRepository`] talks to an API
//! server; [`MemoryRepository`] keeps objects in memory and is what the unit
//! and integration tests drive the reconcilers with.
//!
//! Provisioning clusters are looked up through a [`ClusterIndex`], which the
//! operator backs with a reflector [`Store`].
//!
//! # Example
//!
//! ```rust,no_run
//! use upgrade_readiness::crd::App;
//! use upgrade_readiness::repository::{KubeRepository, Repository};
//! use kube::Client;
//!
//! async fn example(client: Client) {
//!     let apps: KubeRepository<App> = KubeRepository::new(client);
//!     match apps.get("cattle-system", "dev-cluster-managed-system-upgrade-controller").await {
//!         Ok(app) => println!("chart version {}", app.chart_version()),
//!         Err(e) if e.is_not_found() => println!("not installed"),
//!         Err(e) => println!("lookup failed: {e}"),
//!     }
//! }
//! ```

use crate::constants::FIELD_MANAGER;
use crate::crd::ProvisioningCluster;
use crate::errors::{LookupError, ReconcileError};
use async_trait::async_trait;
use kube::api::{Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::runtime::reflector::Store;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Read and write access to namespaced objects of one kind.
#[async_trait]
pub trait Repository<K>: Send + Sync {
    /// Fetch a single object.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] when the object does not exist and
    /// another [`LookupError`] variant for any other failure.
    async fn get(&self, namespace: &str, name: &str) -> Result<K, LookupError>;

    /// Create or update `object` with server-side apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the object has no name or namespace, or the API call fails.
    async fn apply(&self, object: &K) -> Result<K, ReconcileError>;

    /// Replace the status subresource of `object`.
    ///
    /// The write carries `metadata.resourceVersion` of `object`, so it only
    /// succeeds against the version that was read.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Conflict`] when the stored object has moved
    /// on, and another error if the object has no name or namespace or the API
    /// call fails.
    async fn replace_status(&self, object: &K) -> Result<K, ReconcileError>;
}

fn object_key<K: Resource>(object: &K) -> Result<(&str, &str), ReconcileError> {
    let name = object.meta().name.as_deref().ok_or(ReconcileError::MissingField {
        kind: "object",
        field: "metadata.name",
    })?;
    let namespace = object
        .meta()
        .namespace
        .as_deref()
        .ok_or(ReconcileError::MissingField {
            kind: "object",
            field: "metadata.namespace",
        })?;
    Ok((namespace, name))
}

/// Qualified resource name (`<plural>.<group>`) used in lookup errors.
#[must_use]
pub fn qualified_resource<K>() -> String
where
    K: Resource<DynamicType = ()>,
{
    let group = K::group(&());
    if group.is_empty() {
        K::plural(&()).to_string()
    } else {
        format!("{}.{}", K::plural(&()), group)
    }
}

/// [`Repository`] backed by the Kubernetes API.
pub struct KubeRepository<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeRepository<K> {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> Clone for KubeRepository<K> {
    fn clone(&self) -> Self {
        Self::new(self.client.clone())
    }
}

#[async_trait]
impl<K> Repository<K> for KubeRepository<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<K, LookupError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(object) => Ok(object),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(LookupError::NotFound {
                resource: qualified_resource::<K>(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            Err(source) => Err(LookupError::Api {
                resource: qualified_resource::<K>(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            }),
        }
    }

    async fn apply(&self, object: &K) -> Result<K, ReconcileError> {
        let (namespace, name) = object_key(object)?;

        debug!(
            namespace = %namespace,
            name = %name,
            kind = %K::kind(&()),
            "Applying resource"
        );

        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let applied = api
            .patch(
                name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(object),
            )
            .await?;
        Ok(applied)
    }

    async fn replace_status(&self, object: &K) -> Result<K, ReconcileError> {
        let (namespace, name) = object_key(object)?;

        debug!(
            namespace = %namespace,
            name = %name,
            kind = %K::kind(&()),
            resource_version = ?object.meta().resource_version,
            "Replacing status"
        );

        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PostParams::default()
        };
        match api.replace_status(name, &params, object).await {
            Ok(replaced) => Ok(replaced),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(ReconcileError::Conflict {
                resource: qualified_resource::<K>(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Resource version following `current`, as an API server would assign it.
fn next_resource_version(current: Option<&str>) -> String {
    current
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(1, |v| v + 1)
        .to_string()
}

type ObjectKey = (String, String);

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`Repository`] with call accounting and injectable failures.
pub struct MemoryRepository<K> {
    resource: String,
    objects: Mutex<BTreeMap<ObjectKey, K>>,
    failures: Mutex<BTreeMap<ObjectKey, String>>,
    status_writes: Mutex<Vec<K>>,
    gets: AtomicUsize,
    applies: AtomicUsize,
}

impl<K> MemoryRepository<K>
where
    K: Resource<DynamicType = ()> + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            resource: qualified_resource::<K>(),
            objects: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(BTreeMap::new()),
            status_writes: Mutex::new(Vec::new()),
            gets: AtomicUsize::new(0),
            applies: AtomicUsize::new(0),
        }
    }

    /// Create a repository pre-populated with `objects`.
    #[must_use]
    pub fn with_objects(objects: impl IntoIterator<Item = K>) -> Self {
        let repo = Self::new();
        for object in objects {
            repo.insert(object);
        }
        repo
    }

    /// Store or replace an object.
    pub fn insert(&self, object: K) {
        let key = (object.namespace().unwrap_or_default(), object.name_any());
        lock(&self.objects).insert(key, object);
    }

    /// Make every `get` of `namespace/name` fail with a non-not-found error.
    pub fn fail_with(&self, namespace: &str, name: &str, reason: &str) {
        lock(&self.failures).insert((namespace.to_string(), name.to_string()), reason.to_string());
    }

    /// Current copy of a stored object.
    #[must_use]
    pub fn stored(&self, namespace: &str, name: &str) -> Option<K> {
        lock(&self.objects)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of `get` calls made so far.
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `apply` calls made so far.
    #[must_use]
    pub fn apply_calls(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }

    /// Objects accepted by `replace_status` so far, oldest first, as sent.
    #[must_use]
    pub fn status_writes(&self) -> Vec<K> {
        lock(&self.status_writes).clone()
    }
}

impl<K> Default for MemoryRepository<K>
where
    K: Resource<DynamicType = ()> + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K> Repository<K> for MemoryRepository<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<K, LookupError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let key = (namespace.to_string(), name.to_string());

        if let Some(reason) = lock(&self.failures).get(&key) {
            return Err(LookupError::Unavailable {
                resource: self.resource.clone(),
                key: format!("{namespace}/{name}"),
                reason: reason.clone(),
            });
        }

        lock(&self.objects)
            .get(&key)
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                resource: self.resource.clone(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn apply(&self, object: &K) -> Result<K, ReconcileError> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        self.insert(object.clone());
        Ok(object.clone())
    }

    async fn replace_status(&self, object: &K) -> Result<K, ReconcileError> {
        let (namespace, name) = object_key(object)?;
        let key = (namespace.to_string(), name.to_string());

        let mut objects = lock(&self.objects);
        let Some(current) = objects.get(&key) else {
            return Err(LookupError::NotFound {
                resource: self.resource.clone(),
                namespace: key.0,
                name: key.1,
            }
            .into());
        };
        if current.meta().resource_version != object.meta().resource_version {
            return Err(ReconcileError::Conflict {
                resource: self.resource.clone(),
                namespace: key.0,
                name: key.1,
            });
        }

        let mut stored = object.clone();
        stored.meta_mut().resource_version = Some(next_resource_version(
            object.meta().resource_version.as_deref(),
        ));
        objects.insert(key, stored.clone());
        lock(&self.status_writes).push(object.clone());
        Ok(stored)
    }
}

/// Index of provisioning clusters keyed by management cluster name.
pub trait ClusterIndex: Send + Sync {
    /// All provisioning clusters whose `status.clusterName` equals `management_cluster`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be queried.
    fn clusters_for_management_cluster(
        &self,
        management_cluster: &str,
    ) -> Result<Vec<Arc<ProvisioningCluster>>, LookupError>;
}

fn manages(cluster: &ProvisioningCluster, management_cluster: &str) -> bool {
    cluster
        .status
        .as_ref()
        .is_some_and(|s| s.cluster_name == management_cluster)
}

impl ClusterIndex for Store<ProvisioningCluster> {
    fn clusters_for_management_cluster(
        &self,
        management_cluster: &str,
    ) -> Result<Vec<Arc<ProvisioningCluster>>, LookupError> {
        Ok(self
            .state()
            .into_iter()
            .filter(|c| manages(c, management_cluster))
            .collect())
    }
}

/// Fixed [`ClusterIndex`] with call accounting and an injectable failure.
#[derive(Default)]
pub struct StaticClusterIndex {
    clusters: Vec<Arc<ProvisioningCluster>>,
    failure: Option<String>,
    lookups: AtomicUsize,
}

impl StaticClusterIndex {
    #[must_use]
    pub fn new(clusters: impl IntoIterator<Item = ProvisioningCluster>) -> Self {
        Self {
            clusters: clusters.into_iter().map(Arc::new).collect(),
            failure: None,
            lookups: AtomicUsize::new(0),
        }
    }

    /// Make every lookup fail with `reason`.
    #[must_use]
    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    /// Number of lookups made so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ClusterIndex for StaticClusterIndex {
    fn clusters_for_management_cluster(
        &self,
        management_cluster: &str,
    ) -> Result<Vec<Arc<ProvisioningCluster>>, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.failure {
            return Err(LookupError::Unavailable {
                resource: qualified_resource::<ProvisioningCluster>(),
                key: management_cluster.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .clusters
            .iter()
            .filter(|c| manages(c, management_cluster))
            .cloned()
            .collect())
    }
}
