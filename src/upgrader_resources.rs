// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! System-agent upgrader resource builders
//!
//! This module builds the Kubernetes objects that upgrade the system-agent on
//! the nodes of a downstream cluster: the upgrade `Plan`s, their service
//! account and RBAC, and the secrets the plans read. All functions are pure;
//! the same cluster and settings always yield the same objects in the same
//! order.
//!
//! # Object order
//!
//! 1. Aggregation secret (local cluster only)
//! 2. Linux plan
//! 3. Windows plan, when the cluster's Kubernetes version allows it
//! 4. `ServiceAccount`, `ClusterRole`, `ClusterRoleBinding`
//! 5. Generation secret, when a redeploy generation is set

use crate::constants::{
    AGGREGATION_SECRET_NAME, DIGEST_PREFIX_LENGTH, ENV_AGENT_VAR_DIR, ENV_ROLE_WORKER,
    ENV_STRICT_VERIFY, FLEET_LOCAL_NAMESPACE, GENERATION_SECRET_NAME,
    LOCAL_AGGREGATION_SECRET_PREFIX, LOCAL_CLUSTER_NAME, PLAN_CONCURRENCY, SECRET_KEY_CA_CHECKSUM,
    SECRET_KEY_SERVER, SECRET_KEY_TOKEN, SYSTEM_AGENT_UPGRADER, SYSTEM_AGENT_UPGRADER_WINDOWS,
    SYSTEM_NAMESPACE, WINDOWS_RUN_AS_USER,
};
use crate::crd::{Plan, PlanContainer, PlanSecret, PlanSpec, ProvisioningCluster};
use crate::labels::{
    K8S_MANAGED_BY, K8S_OS_LABEL, MANAGED_BY_UPGRADE_READINESS, OS_LINUX, OS_WINDOWS,
    UPGRADE_DIGEST_ANNOTATION, UPGRADE_DIGEST_FIELDS,
};
use crate::settings::Settings;
use crate::version_gate::resolves_windows_plan_defect;
use k8s_openapi::api::core::v1::{
    EnvFromSource, EnvVar, Secret, SecretEnvSource, SecurityContext, ServiceAccount, Toleration,
    WindowsSecurityContextOptions,
};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    LabelSelector, LabelSelectorRequirement, ObjectMeta,
};
use k8s_openapi::ByteString;
use kube::ResourceExt;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

/// Connection details written into the local cluster's aggregation secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregationInput {
    pub server_url: String,
    pub token: String,
    pub ca_checksum: String,
}

/// One object of the system-agent upgrader payload.
#[derive(Clone, Debug)]
pub enum DesiredObject {
    Secret(Secret),
    Plan(Plan),
    ServiceAccount(ServiceAccount),
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
}

impl DesiredObject {
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Secret(o) => o.name_any(),
            Self::Plan(o) => o.name_any(),
            Self::ServiceAccount(o) => o.name_any(),
            Self::ClusterRole(o) => o.name_any(),
            Self::ClusterRoleBinding(o) => o.name_any(),
        }
    }

    /// Namespace of the object, `None` for cluster-scoped objects.
    #[must_use]
    pub fn namespace(&self) -> Option<String> {
        match self {
            Self::Secret(o) => o.namespace(),
            Self::Plan(o) => o.namespace(),
            Self::ServiceAccount(o) => o.namespace(),
            Self::ClusterRole(o) => o.namespace(),
            Self::ClusterRoleBinding(o) => o.namespace(),
        }
    }
}

/// Returns `true` for the provisioning cluster record of the local cluster.
#[must_use]
pub fn is_local_cluster(cluster: &ProvisioningCluster) -> bool {
    cluster
        .status
        .as_ref()
        .is_some_and(|s| s.cluster_name == LOCAL_CLUSTER_NAME)
        && cluster.namespace().as_deref() == Some(FLEET_LOCAL_NAMESPACE)
}

/// Name of the local cluster's aggregation secret.
///
/// The name embeds the first 12 hex characters of
/// `SHA-256(server_url || token || ca_checksum)`, so a change to any input
/// produces a new secret and makes the plans pick it up.
#[must_use]
pub fn aggregation_secret_name(input: &AggregationInput) -> String {
    let mut digest = Sha256::new();
    digest.update(input.server_url.as_bytes());
    digest.update(input.token.as_bytes());
    digest.update(input.ca_checksum.as_bytes());
    let hex = format!("{:x}", digest.finalize());
    format!(
        "{LOCAL_AGGREGATION_SECRET_PREFIX}{}",
        &hex[..DIGEST_PREFIX_LENGTH]
    )
}

fn build_labels() -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_UPGRADE_READINESS.into());
    labels
}

fn system_meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.into()),
        namespace: Some(SYSTEM_NAMESPACE.into()),
        labels: Some(build_labels()),
        ..Default::default()
    }
}

fn cluster_meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.into()),
        labels: Some(build_labels()),
        ..Default::default()
    }
}

/// Builds the aggregation secret of the local cluster.
#[must_use]
pub fn build_aggregation_secret(name: &str, input: &AggregationInput) -> Secret {
    let mut data = BTreeMap::new();
    data.insert(
        SECRET_KEY_SERVER.to_string(),
        ByteString(input.server_url.as_bytes().to_vec()),
    );
    data.insert(
        SECRET_KEY_TOKEN.to_string(),
        ByteString(input.token.as_bytes().to_vec()),
    );
    data.insert(
        SECRET_KEY_CA_CHECKSUM.to_string(),
        ByteString(input.ca_checksum.as_bytes().to_vec()),
    );

    Secret {
        metadata: system_meta(name),
        data: Some(data),
        ..Default::default()
    }
}

/// Builds the environment of the upgrader containers.
///
/// Starts from the cluster's agent env vars, then adds:
/// - `STRICT_VERIFY` from the agent TLS mode, unless the user already set it
/// - `CATTLE_ROLE_WORKER=true` when no machine selector config exists
/// - `CATTLE_AGENT_VAR_DIR` when a system-agent data directory is configured
#[must_use]
pub fn build_agent_env(cluster: &ProvisioningCluster, settings: &Settings) -> Vec<EnvVar> {
    let mut env: Vec<EnvVar> = cluster
        .spec
        .agent_env_vars
        .iter()
        .map(|e| env_var(&e.name, &e.value))
        .collect();

    if !env.iter().any(|e| e.name == ENV_STRICT_VERIFY) {
        env.push(env_var(ENV_STRICT_VERIFY, settings.strict_verify()));
    }

    if let Some(rke_config) = &cluster.spec.rke_config {
        if rke_config.machine_selector_config.is_empty() {
            env.push(env_var(ENV_ROLE_WORKER, "true"));
        }
        let system_agent_dir = &rke_config.data_directories.system_agent;
        if !system_agent_dir.is_empty() {
            env.push(env_var(ENV_AGENT_VAR_DIR, system_agent_dir));
        }
    }

    env
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    }
}

fn os_selector(os: &str) -> LabelSelector {
    LabelSelector {
        match_expressions: Some(vec![LabelSelectorRequirement {
            key: K8S_OS_LABEL.to_string(),
            operator: "In".to_string(),
            values: Some(vec![os.to_string()]),
        }]),
        match_labels: None,
    }
}

fn tolerate_everything() -> Vec<Toleration> {
    vec![Toleration {
        operator: Some("Exists".to_string()),
        ..Default::default()
    }]
}

fn env_from_secret(secret_name: &str) -> Vec<EnvFromSource> {
    vec![EnvFromSource {
        secret_ref: Some(SecretEnvSource {
            name: secret_name.to_string(),
            optional: None,
        }),
        ..Default::default()
    }]
}

fn plan_meta(name: &str) -> ObjectMeta {
    let mut annotations = BTreeMap::new();
    annotations.insert(
        UPGRADE_DIGEST_ANNOTATION.to_string(),
        UPGRADE_DIGEST_FIELDS.to_string(),
    );
    ObjectMeta {
        annotations: Some(annotations),
        ..system_meta(name)
    }
}

/// Builds the linux upgrade plan.
///
/// The plan always mounts the `stv-aggregation` secret so that the
/// system-upgrade-controller re-runs it when the secret changes, while the
/// environment comes from `env_secret_name`.
#[must_use]
pub fn build_linux_plan(
    settings: &Settings,
    env: &[EnvVar],
    env_secret_name: &str,
    redeploy_generation: bool,
) -> Plan {
    let mut secrets = vec![PlanSecret {
        name: AGGREGATION_SECRET_NAME.to_string(),
        path: String::new(),
    }];
    if redeploy_generation {
        secrets.push(generation_plan_secret());
    }

    Plan {
        metadata: plan_meta(SYSTEM_AGENT_UPGRADER),
        spec: PlanSpec {
            concurrency: PLAN_CONCURRENCY,
            version: settings.system_agent_upgrader_version().to_string(),
            node_selector: Some(os_selector(OS_LINUX)),
            service_account_name: SYSTEM_AGENT_UPGRADER.to_string(),
            tolerations: tolerate_everything(),
            secrets,
            upgrade: Some(PlanContainer {
                image: settings.system_agent_upgrade_repository().to_string(),
                env: env.to_vec(),
                env_from: env_from_secret(env_secret_name),
                security_context: None,
            }),
        },
        status: None,
    }
}

/// Builds the windows upgrade plan.
///
/// Runs as a host process under the local system account. Its version is the
/// tag of the windows upgrade image, `latest` when untagged.
#[must_use]
pub fn build_windows_plan(
    settings: &Settings,
    env: &[EnvVar],
    env_secret_name: &str,
    redeploy_generation: bool,
) -> Plan {
    let (repository, version) = settings.wins_agent_upgrade_image_parts();
    let secrets = if redeploy_generation {
        vec![generation_plan_secret()]
    } else {
        Vec::new()
    };

    Plan {
        metadata: plan_meta(SYSTEM_AGENT_UPGRADER_WINDOWS),
        spec: PlanSpec {
            concurrency: PLAN_CONCURRENCY,
            version: version.to_string(),
            node_selector: Some(os_selector(OS_WINDOWS)),
            service_account_name: SYSTEM_AGENT_UPGRADER.to_string(),
            tolerations: tolerate_everything(),
            secrets,
            upgrade: Some(PlanContainer {
                image: repository.to_string(),
                env: env.to_vec(),
                env_from: env_from_secret(env_secret_name),
                security_context: Some(SecurityContext {
                    windows_options: Some(WindowsSecurityContextOptions {
                        host_process: Some(true),
                        run_as_user_name: Some(WINDOWS_RUN_AS_USER.to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
            }),
        },
        status: None,
    }
}

fn generation_plan_secret() -> PlanSecret {
    PlanSecret {
        name: GENERATION_SECRET_NAME.to_string(),
        path: String::new(),
    }
}

#[must_use]
pub fn build_service_account() -> ServiceAccount {
    ServiceAccount {
        metadata: system_meta(SYSTEM_AGENT_UPGRADER),
        ..Default::default()
    }
}

/// Builds the cluster role of the upgrader: read access to nodes.
#[must_use]
pub fn build_cluster_role() -> ClusterRole {
    ClusterRole {
        metadata: cluster_meta(SYSTEM_AGENT_UPGRADER),
        rules: Some(vec![PolicyRule {
            verbs: vec!["get".to_string()],
            api_groups: Some(vec![String::new()]),
            resources: Some(vec!["nodes".to_string()]),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

#[must_use]
pub fn build_cluster_role_binding() -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: cluster_meta(SYSTEM_AGENT_UPGRADER),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: SYSTEM_AGENT_UPGRADER.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: SYSTEM_AGENT_UPGRADER.to_string(),
            namespace: Some(SYSTEM_NAMESPACE.to_string()),
            api_group: None,
        }]),
    }
}

/// Builds the secret whose content changes with the redeploy generation.
#[must_use]
pub fn build_generation_secret(cluster: &ProvisioningCluster) -> Secret {
    let mut string_data = BTreeMap::new();
    string_data.insert(
        "cluster-uid".to_string(),
        cluster.metadata.uid.clone().unwrap_or_default(),
    );
    string_data.insert(
        "generation".to_string(),
        cluster.spec.redeploy_system_agent_generation.to_string(),
    );

    Secret {
        metadata: system_meta(GENERATION_SECRET_NAME),
        string_data: Some(string_data),
        ..Default::default()
    }
}

/// Builds the complete, ordered system-agent upgrader payload for `cluster`.
///
/// `aggregation` is only honoured for the local cluster; every other cluster
/// reads its agent connection details from the `stv-aggregation` secret that
/// already exists downstream.
#[must_use]
pub fn build_upgrader_objects(
    cluster: &ProvisioningCluster,
    settings: &Settings,
    aggregation: Option<&AggregationInput>,
) -> Vec<DesiredObject> {
    let mut objects = Vec::new();

    let env_secret_name = match aggregation {
        Some(input) if is_local_cluster(cluster) => {
            let name = aggregation_secret_name(input);
            objects.push(DesiredObject::Secret(build_aggregation_secret(&name, input)));
            name
        }
        _ => AGGREGATION_SECRET_NAME.to_string(),
    };

    let env = build_agent_env(cluster, settings);
    let redeploy_generation = cluster.spec.redeploy_system_agent_generation != 0;

    objects.push(DesiredObject::Plan(build_linux_plan(
        settings,
        &env,
        &env_secret_name,
        redeploy_generation,
    )));

    if resolves_windows_plan_defect(&cluster.spec.kubernetes_version) {
        objects.push(DesiredObject::Plan(build_windows_plan(
            settings,
            &env,
            &env_secret_name,
            redeploy_generation,
        )));
    } else {
        debug!(
            cluster = %cluster.name_any(),
            kubernetes_version = %cluster.spec.kubernetes_version,
            "Skipping windows upgrade plan"
        );
    }

    objects.push(DesiredObject::ServiceAccount(build_service_account()));
    objects.push(DesiredObject::ClusterRole(build_cluster_role()));
    objects.push(DesiredObject::ClusterRoleBinding(
        build_cluster_role_binding(),
    ));

    if redeploy_generation {
        objects.push(DesiredObject::Secret(build_generation_secret(cluster)));
    }

    objects
}
