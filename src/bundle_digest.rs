// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Content-addressed serialization of desired objects into bundle resources.
//!
//! Each object is stamped with its `apiVersion` and `kind`, rendered as YAML
//! with sorted keys and named after its digest:
//!
//! ```text
//! <kind>_<namespace>_<name>_<first 12 hex chars of sha256(content)>.yaml
//! ```
//!
//! The kind is lowercased and cluster-scoped objects leave the namespace
//! segment empty. Identical objects always produce byte-identical resources,
//! so an unchanged payload is detected by comparing [`payload_hash`] values.

use crate::constants::DIGEST_PREFIX_LENGTH;
use crate::crd::BundleResource;
use crate::errors::SerializeError;
use crate::upgrader_resources::DesiredObject;
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Convert `object` to a JSON value carrying its type metadata.
///
/// # Errors
///
/// Returns an error if the object cannot be converted or does not serialize
/// to a JSON object.
pub fn stamp_type_meta<K>(object: &K) -> Result<Value, SerializeError>
where
    K: Resource<DynamicType = ()> + Serialize,
{
    let kind = K::kind(&()).to_string();
    let name = object.name_any();

    let mut value = serde_json::to_value(object).map_err(|source| SerializeError::Json {
        kind: kind.clone(),
        name: name.clone(),
        source,
    })?;

    let Some(fields) = value.as_object_mut() else {
        return Err(SerializeError::MissingTypeMeta { name });
    };
    if kind.is_empty() {
        return Err(SerializeError::MissingTypeMeta { name });
    }
    fields.insert(
        "apiVersion".to_string(),
        Value::String(K::api_version(&()).to_string()),
    );
    fields.insert("kind".to_string(), Value::String(kind));
    Ok(value)
}

fn stamp(object: &DesiredObject) -> Result<(String, Value), SerializeError> {
    match object {
        DesiredObject::Secret(o) => Ok((kind_of(o), stamp_type_meta(o)?)),
        DesiredObject::Plan(o) => Ok((kind_of(o), stamp_type_meta(o)?)),
        DesiredObject::ServiceAccount(o) => Ok((kind_of(o), stamp_type_meta(o)?)),
        DesiredObject::ClusterRole(o) => Ok((kind_of(o), stamp_type_meta(o)?)),
        DesiredObject::ClusterRoleBinding(o) => Ok((kind_of(o), stamp_type_meta(o)?)),
    }
}

fn kind_of<K: Resource<DynamicType = ()>>(_: &K) -> String {
    K::kind(&()).to_string()
}

/// File name of a serialized resource.
#[must_use]
pub fn resource_file_name(kind: &str, namespace: &str, name: &str, content: &str) -> String {
    let hex = format!("{:x}", Sha256::digest(content.as_bytes()));
    format!(
        "{}_{}_{}_{}.yaml",
        kind.to_lowercase(),
        namespace,
        name,
        &hex[..DIGEST_PREFIX_LENGTH]
    )
}

/// Serialize a single object into a bundle resource.
///
/// # Errors
///
/// Returns an error if the object cannot be stamped or rendered as YAML.
pub fn serialize_object(object: &DesiredObject) -> Result<BundleResource, SerializeError> {
    let (kind, value) = stamp(object)?;
    let name = object.name();

    let content = serde_yaml::to_string(&value).map_err(|source| SerializeError::Yaml {
        kind: kind.clone(),
        name: name.clone(),
        source,
    })?;

    let namespace = object.namespace().unwrap_or_default();
    Ok(BundleResource {
        name: resource_file_name(&kind, &namespace, &name, &content),
        content,
    })
}

/// Serialize every object, in order.
///
/// # Errors
///
/// Returns the first failure; no resources are returned in that case.
pub fn serialize_objects(objects: &[DesiredObject]) -> Result<Vec<BundleResource>, SerializeError> {
    serialize_all(objects, serialize_object)
}

/// Apply `serialize` to every item, stopping at the first failure.
pub(crate) fn serialize_all<T>(
    items: &[T],
    serialize: impl Fn(&T) -> Result<BundleResource, SerializeError>,
) -> Result<Vec<BundleResource>, SerializeError> {
    items.iter().map(serialize).collect()
}

/// Digest of a whole payload, used to skip re-applying an unchanged bundle.
#[must_use]
pub fn payload_hash(resources: &[BundleResource]) -> String {
    let mut digest = Sha256::new();
    for resource in resources {
        digest.update(resource.name.as_bytes());
        digest.update([0u8]);
        digest.update(resource.content.as_bytes());
        digest.update([0u8]);
    }
    format!("{:x}", digest.finalize())
}
