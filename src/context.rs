// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for both controllers.
//!
//! Every controller receives an `Arc<Context>` that contains:
//! - The management cluster client
//! - The provisioning cluster reflector store
//! - The condition handler and the bundle delivery reconciler
//!
//! The reflector store backs the [`ClusterIndex`] the condition handler
//! resolves provisioning clusters through, so resolution never hits the API.

use crate::crd::{
    App, Bundle, ClusterRegistrationToken, Plan, ProvisioningCluster, RKEControlPlane,
};
use crate::reconcilers::{BundleDelivery, ConditionHandler};
use crate::repository::{ClusterIndex, KubeRepository, Repository};
use crate::settings::Settings;
use kube::runtime::reflector::Store;
use kube::Client;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Client for the management cluster
    pub client: Client,

    /// Reflector stores
    pub stores: Stores,

    /// Control planes whose status the condition handler patches
    pub control_planes: Arc<dyn Repository<RKEControlPlane>>,

    pub conditions: ConditionHandler,

    pub delivery: BundleDelivery,
}

/// Reflector stores populated by dedicated watch tasks.
#[derive(Clone)]
pub struct Stores {
    pub provisioning_clusters: Store<ProvisioningCluster>,
}

/// Options the operator is started with, besides the [`Settings`].
#[derive(Clone, Debug)]
pub struct ContextOptions {
    /// Name of the management cluster this process serves
    pub management_cluster_name: String,
    /// Maximum number of bundles applied at the same time
    pub delivery_concurrency: usize,
    pub settings: Settings,
}

impl Context {
    /// Wire both reconcilers to their clients and stores.
    ///
    /// `downstream` is the client of the cluster whose Helm releases and
    /// upgrade plans are observed. Control planes, bundles and registration
    /// tokens always live on the management cluster.
    #[must_use]
    pub fn new(client: Client, downstream: Client, stores: Stores, options: ContextOptions) -> Self {
        let control_planes: Arc<dyn Repository<RKEControlPlane>> =
            Arc::new(KubeRepository::<RKEControlPlane>::new(client.clone()));
        let clusters: Arc<dyn ClusterIndex> = Arc::new(stores.provisioning_clusters.clone());

        let conditions = ConditionHandler {
            management_cluster_name: options.management_cluster_name,
            settings: options.settings.clone(),
            clusters,
            apps: Arc::new(KubeRepository::<App>::new(downstream.clone())),
            plans: Arc::new(KubeRepository::<Plan>::new(downstream)),
        };

        let delivery = BundleDelivery {
            settings: options.settings,
            control_planes: control_planes.clone(),
            bundles: Arc::new(KubeRepository::<Bundle>::new(client.clone())),
            tokens: Arc::new(KubeRepository::<ClusterRegistrationToken>::new(client.clone())),
            permits: Arc::new(Semaphore::new(options.delivery_concurrency)),
        };

        Self {
            client,
            stores,
            control_planes,
            conditions,
            delivery,
        }
    }
}
