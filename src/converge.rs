//! Create-or-update of owned child objects.
//!
//! A child that does not exist is created from the desired object. A child
//! that exists is rewritten from the live copy with only the kind's mutable
//! fields taken from the desired object, so server-populated fields
//! (resourceVersion, uid, defaults, foreign annotations) survive the update.

use json_patch::{AddOperation, PatchOperation, RemoveOperation, jsonptr::PointerBuf};
use k8s_openapi::api::{
    apps::v1::{Deployment, StatefulSet},
    batch::v1::Job,
    core::v1::{ConfigMap, PersistentVolumeClaim, Service},
    networking::v1::Ingress,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use serde_json::Value;
use tracing::*;

use crate::store::{Object, ObjectStore};
use crate::{Error, Result};

/// A child kind the engine knows how to converge
pub trait Converge: Object {
    /// JSON pointers copied from the desired object onto the live one on
    /// update. Empty means the kind is create-only.
    const MUTABLE_FIELDS: &'static [&'static str];
}

impl Converge for Deployment {
    const MUTABLE_FIELDS: &'static [&'static str] = &[
        "/metadata/labels",
        "/spec/minReadySeconds",
        "/spec/replicas",
        "/spec/selector/matchLabels",
        "/spec/template/metadata/labels",
        "/spec/template/metadata/annotations",
        "/spec/template/spec/terminationGracePeriodSeconds",
        "/spec/template/spec/hostNetwork",
        "/spec/template/spec/hostPID",
        "/spec/template/spec/hostIPC",
        "/spec/template/spec/serviceAccountName",
        "/spec/template/spec/containers",
        "/spec/template/spec/nodeSelector",
        "/spec/template/spec/tolerations",
        "/spec/template/spec/volumes",
    ];
}

// selector and minReadySeconds are left alone for StatefulSets
impl Converge for StatefulSet {
    const MUTABLE_FIELDS: &'static [&'static str] = &[
        "/metadata/labels",
        "/spec/replicas",
        "/spec/template/metadata/labels",
        "/spec/template/metadata/annotations",
        "/spec/template/spec/terminationGracePeriodSeconds",
        "/spec/template/spec/hostNetwork",
        "/spec/template/spec/hostPID",
        "/spec/template/spec/hostIPC",
        "/spec/template/spec/serviceAccountName",
        "/spec/template/spec/containers",
        "/spec/template/spec/nodeSelector",
        "/spec/template/spec/tolerations",
        "/spec/template/spec/volumes",
    ];
}

impl Converge for Service {
    const MUTABLE_FIELDS: &'static [&'static str] = &[
        "/metadata/labels",
        "/spec/ports",
        "/spec/selector",
        "/spec/type",
    ];
}

impl Converge for Ingress {
    const MUTABLE_FIELDS: &'static [&'static str] = &[
        "/metadata/labels",
        "/metadata/annotations",
        "/spec/rules",
    ];
}

impl Converge for ConfigMap {
    const MUTABLE_FIELDS: &'static [&'static str] = &[];
}

impl Converge for PersistentVolumeClaim {
    const MUTABLE_FIELDS: &'static [&'static str] = &[];
}

impl Converge for Job {
    const MUTABLE_FIELDS: &'static [&'static str] = &[];
}

/// What [`converge`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    /// The child exists and its kind is create-only
    Unchanged,
}

#[derive(Clone, Debug)]
pub struct Converged<K> {
    pub outcome: Outcome,
    pub object: K,
}

/// Kind, name and outcome of one converged child
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub kind: String,
    pub name: String,
    pub outcome: Outcome,
}

impl<K: Resource<DynamicType = ()>> Converged<K> {
    pub fn change(&self) -> Change {
        Change {
            kind: K::kind(&()).to_string(),
            name: self.object.meta().name.clone().unwrap_or_default(),
            outcome: self.outcome,
        }
    }
}

/// Controller owner reference pointing at `parent`
pub fn owner_ref<P: Resource<DynamicType = ()>>(parent: &P) -> Result<OwnerReference> {
    parent.controller_owner_ref(&()).ok_or_else(|| {
        Error::OwnerError(format!(
            "{} {} has no uid yet",
            P::kind(&()),
            parent.meta().name.as_deref().unwrap_or_default()
        ))
    })
}

/// Mark `owner` as the controller of `child`.
///
/// An existing reference with the same uid is replaced, so repeated calls
/// leave exactly one link. A controller reference to a different owner is
/// an error.
pub fn attach_owner<K: Resource>(mut child: K, owner: &OwnerReference) -> Result<K> {
    let refs = child.meta_mut().owner_references.get_or_insert_with(Vec::new);
    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner.uid)
    {
        return Err(Error::OwnerError(format!(
            "already controlled by {} {}",
            other.kind, other.name
        )));
    }
    refs.retain(|r| r.uid != owner.uid);
    refs.push(owner.clone());
    Ok(child)
}

/// Copy the mutable fields of `desired` onto a copy of `current`.
///
/// A field present in `desired` is written (creating missing parents), a
/// field absent from `desired` is removed from the result. Everything else
/// comes from `current`.
pub fn merge_mutable<K: Converge>(current: &K, desired: &K) -> Result<K> {
    let mut live = serde_json::to_value(current).map_err(Error::SerializationError)?;
    let wanted = serde_json::to_value(desired).map_err(Error::SerializationError)?;
    for path in K::MUTABLE_FIELDS {
        let ops = field_ops(&live, &wanted, path)?;
        json_patch::patch(&mut live, &ops).map_err(Error::PatchError)?;
    }
    serde_json::from_value(live).map_err(Error::SerializationError)
}

fn field_ops(live: &Value, wanted: &Value, path: &str) -> Result<Vec<PatchOperation>> {
    let pointer = |p: &str| {
        PointerBuf::parse(p).map_err(|e| Error::OtherError(format!("bad pointer {p}: {e}")))
    };
    let mut ops = Vec::new();
    match wanted.pointer(path) {
        Some(value) => {
            let tokens: Vec<&str> = path.split('/').skip(1).collect();
            let mut missing = false;
            for depth in 1..tokens.len() {
                let parent = format!("/{}", tokens[..depth].join("/"));
                missing = missing || live.pointer(&parent).is_none_or(Value::is_null);
                if missing {
                    ops.push(PatchOperation::Add(AddOperation {
                        path: pointer(&parent)?,
                        value: Value::Object(Default::default()),
                    }));
                }
            }
            ops.push(PatchOperation::Add(AddOperation {
                path: pointer(path)?,
                value: value.clone(),
            }));
        }
        None if live.pointer(path).is_some() => {
            ops.push(PatchOperation::Remove(RemoveOperation {
                path: pointer(path)?,
            }));
        }
        None => {}
    }
    Ok(ops)
}

/// Make the named child match `desired`.
///
/// Lookup failures other than not-found are returned untouched and nothing
/// is written. Updates are issued every pass, without comparing first.
pub async fn converge<S, K>(store: &S, owner: &OwnerReference, desired: K) -> Result<Converged<K>>
where
    S: ObjectStore,
    K: Converge,
{
    let namespace = desired
        .namespace()
        .ok_or_else(|| Error::MissingField("metadata.namespace".into()))?;
    let name = desired
        .meta()
        .name
        .clone()
        .ok_or_else(|| Error::MissingField("metadata.name".into()))?;
    let kind = K::kind(&());

    match store.get::<K>(&namespace, &name).await {
        Err(e) if e.is_not_found() => {
            let child = attach_owner(desired, owner)?;
            info!("Creating {kind} {namespace}/{name}");
            let object = store.create(&child).await?;
            Ok(Converged {
                outcome: Outcome::Created,
                object,
            })
        }
        Err(e) => Err(e),
        Ok(current) if K::MUTABLE_FIELDS.is_empty() => {
            debug!("{kind} {namespace}/{name} exists, not updating");
            Ok(Converged {
                outcome: Outcome::Unchanged,
                object: current,
            })
        }
        Ok(current) => {
            let child = attach_owner(merge_mutable(&current, &desired)?, owner)?;
            debug!("Updating {kind} {namespace}/{name}");
            let object = store.update(&child).await?;
            Ok(Converged {
                outcome: Outcome::Updated,
                object,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn owner(uid: &str) -> OwnerReference {
        OwnerReference {
            api_version: "operator.healthcheck.dev/v1alpha1".into(),
            kind: "HealthService".into(),
            name: "hs".into(),
            uid: uid.into(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    fn deployment(replicas: Option<i32>, labels: &[(&str, &str)]) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some("d".into()),
                namespace: Some("ns".into()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                ..ObjectMeta::default()
            },
            spec: Some(DeploymentSpec {
                replicas,
                ..DeploymentSpec::default()
            }),
            ..Deployment::default()
        }
    }

    #[test]
    fn attach_owner_is_idempotent() {
        let d = attach_owner(deployment(None, &[]), &owner("u1")).unwrap();
        let d = attach_owner(d, &owner("u1")).unwrap();
        assert_eq!(d.metadata.owner_references.unwrap().len(), 1);
    }

    #[test]
    fn attach_owner_rejects_foreign_controller() {
        let d = attach_owner(deployment(None, &[]), &owner("u1")).unwrap();
        let err = attach_owner(d, &owner("u2")).unwrap_err();
        assert!(matches!(err, Error::OwnerError(_)));
    }

    #[test]
    fn merge_keeps_server_fields_and_takes_mutable_ones() {
        let mut current = deployment(Some(3), &[("app", "old")]);
        current.metadata.resource_version = Some("42".into());
        current.metadata.uid = Some("live-uid".into());
        current.metadata.annotations =
            Some(BTreeMap::from([("deployment.kubernetes.io/revision".into(), "7".into())]));
        let desired = deployment(Some(1), &[("app", "new")]);

        let merged = merge_mutable(&current, &desired).unwrap();
        assert_eq!(merged.metadata.resource_version.as_deref(), Some("42"));
        assert_eq!(merged.metadata.uid.as_deref(), Some("live-uid"));
        assert!(merged.metadata.annotations.is_some());
        assert_eq!(merged.metadata.labels.unwrap()["app"], "new");
        assert_eq!(merged.spec.unwrap().replicas, Some(1));
    }

    #[test]
    fn merge_removes_fields_absent_from_desired() {
        let mut current = deployment(Some(3), &[]);
        current
            .spec
            .as_mut()
            .unwrap()
            .min_ready_seconds = Some(10);
        let desired = deployment(None, &[]);
        let merged = merge_mutable(&current, &desired).unwrap();
        let spec = merged.spec.unwrap();
        assert_eq!(spec.replicas, None);
        assert_eq!(spec.min_ready_seconds, None);
    }

    #[test]
    fn merge_creates_missing_parents() {
        let current = Deployment {
            metadata: ObjectMeta {
                name: Some("d".into()),
                namespace: Some("ns".into()),
                ..ObjectMeta::default()
            },
            ..Deployment::default()
        };
        let mut desired = deployment(Some(2), &[]);
        desired
            .spec
            .as_mut()
            .unwrap()
            .template
            .metadata = Some(ObjectMeta {
            labels: Some(BTreeMap::from([("app".into(), "x".into())])),
            ..ObjectMeta::default()
        });
        let merged = merge_mutable(&current, &desired).unwrap();
        let spec = merged.spec.unwrap();
        assert_eq!(spec.replicas, Some(2));
        assert_eq!(spec.template.metadata.unwrap().labels.unwrap()["app"], "x");
    }
}
