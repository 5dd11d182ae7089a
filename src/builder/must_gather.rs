use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, ObjectFieldSelector, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec,
    Service, Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;

use super::{
    TERMINATION_GRACE_SECONDS, command, http_ingress, http_probe, http_service, labels, meta,
    parent_namespace, product_annotations, pull_policy, replicas, require, service_account,
};
use crate::config::{MUST_GATHER_SERVICE_IMAGE_NAME, OperandImages, operand_image};
use crate::crd::MustGatherService;
use crate::quantity;
use crate::Result;

pub static MUST_GATHER_SERVICE_ACCOUNT: &str = "must-gather-service";
pub static MUST_GATHER_INGRESS_PATH: &str = "/must-gather/";
pub static MUST_GATHER_PROBE_PATH: &str = "/v1alpha1/healthz";
pub static MUST_GATHER_DIR: &str = "/must-gather";
pub static DEFAULT_STORAGE_REQUEST: &str = "2Gi";
pub static NO_PROVISIONER: &str = "kubernetes.io/no-provisioner";
pub static DEFAULT_CLASS_ANNOTATION: &str = "storageclass.kubernetes.io/is-default-class";
const MUST_GATHER_SERVICE_COMMAND: [&str; 3] = ["/bin/must-gather-service", "-v", "1"];
static DATA_VOLUME: &str = "must-gather";

pub fn must_gather_labels(mgs: &MustGatherService) -> BTreeMap<String, String> {
    labels(&mgs.spec.must_gather.name, &mgs.name_any())
}

/// Pick a storage class for a claim that does not name one.
///
/// Classes without a provisioner are skipped. The first class annotated as
/// the cluster default wins, then the first remaining class, then the empty
/// string.
pub fn default_storage_class(classes: &[StorageClass]) -> String {
    let usable: Vec<&StorageClass> = classes
        .iter()
        .filter(|sc| sc.provisioner != NO_PROVISIONER)
        .collect();
    usable
        .iter()
        .find(|sc| {
            sc.annotations()
                .get(DEFAULT_CLASS_ANNOTATION)
                .is_some_and(|v| v == "true")
        })
        .or_else(|| usable.first())
        .map(|sc| sc.name_any())
        .unwrap_or_default()
}

/// Claim backing the archive directory. `default_class` is used when the
/// custom resource names no storage class.
pub fn must_gather_pvc(mgs: &MustGatherService, default_class: &str) -> Result<PersistentVolumeClaim> {
    let spec = &mgs.spec.persistent_volume_claim;
    let name = require(&spec.name, "spec.persistentVolumeClaim.name")?;
    let ns = parent_namespace(mgs)?;
    let storage_class = spec
        .storage_class_name
        .clone()
        .filter(|sc| !sc.is_empty())
        .unwrap_or_else(|| default_class.to_string());
    let storage = spec
        .resources
        .as_ref()
        .and_then(|r| r.requests.as_ref())
        .and_then(|r| r.get("storage"))
        .cloned()
        .unwrap_or_else(|| Quantity(DEFAULT_STORAGE_REQUEST.to_string()));

    Ok(PersistentVolumeClaim {
        metadata: ObjectMeta {
            annotations: Some(product_annotations()),
            ..meta(name, &ns, &labels(name, &mgs.name_any()))
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([("storage".to_string(), storage)])),
                ..VolumeResourceRequirements::default()
            }),
            storage_class_name: Some(storage_class),
            ..PersistentVolumeClaimSpec::default()
        }),
        ..PersistentVolumeClaim::default()
    })
}

pub fn must_gather_deployment(mgs: &MustGatherService, images: &OperandImages) -> Result<Deployment> {
    let spec = &mgs.spec.must_gather;
    let name = require(&spec.name, "spec.mustGather.name")?;
    let claim = require(
        &mgs.spec.persistent_volume_claim.name,
        "spec.persistentVolumeClaim.name",
    )?;
    let ns = parent_namespace(mgs)?;
    let labels = must_gather_labels(mgs);

    let container = Container {
        name: name.to_string(),
        image: Some(operand_image(
            &spec.image,
            MUST_GATHER_SERVICE_IMAGE_NAME,
            images.must_gather_service.as_deref(),
        )),
        image_pull_policy: pull_policy(&spec.image.pull_policy),
        command: Some(command(&spec.command, &MUST_GATHER_SERVICE_COMMAND)),
        security_context: spec.security_context.clone(),
        env: Some(vec![
            EnvVar {
                name: "POD_NAMESPACE".to_string(),
                value_from: Some(EnvVarSource {
                    field_ref: Some(ObjectFieldSelector {
                        field_path: "metadata.namespace".to_string(),
                        ..ObjectFieldSelector::default()
                    }),
                    ..EnvVarSource::default()
                }),
                ..EnvVar::default()
            },
            EnvVar {
                name: "LOGLEVEL".to_string(),
                value: Some("1".to_string()),
                ..EnvVar::default()
            },
        ]),
        resources: Some(quantity::requirements(&spec.resources)),
        volume_mounts: Some(vec![VolumeMount {
            name: DATA_VOLUME.to_string(),
            mount_path: MUST_GATHER_DIR.to_string(),
            ..VolumeMount::default()
        }]),
        liveness_probe: Some(http_probe(MUST_GATHER_PROBE_PATH, 3)),
        readiness_probe: Some(http_probe(MUST_GATHER_PROBE_PATH, 1)),
        ..Container::default()
    };

    Ok(Deployment {
        metadata: meta(name, &ns, &labels),
        spec: Some(DeploymentSpec {
            min_ready_seconds: Some(0),
            replicas: Some(replicas(spec.replicas)),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    annotations: Some(product_annotations()),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    termination_grace_period_seconds: Some(TERMINATION_GRACE_SECONDS),
                    host_network: Some(spec.host_network),
                    host_pid: Some(false),
                    host_ipc: Some(false),
                    service_account_name: Some(service_account(
                        &spec.service_account_name,
                        MUST_GATHER_SERVICE_ACCOUNT,
                    )),
                    containers: vec![container],
                    node_selector: spec.node_selector.clone(),
                    tolerations: spec.tolerations.clone(),
                    volumes: Some(vec![Volume {
                        name: DATA_VOLUME.to_string(),
                        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                            claim_name: claim.to_string(),
                            ..PersistentVolumeClaimVolumeSource::default()
                        }),
                        ..Volume::default()
                    }]),
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    })
}

pub fn must_gather_service(mgs: &MustGatherService) -> Result<Service> {
    let name = require(&mgs.spec.must_gather.name, "spec.mustGather.name")?;
    let ns = parent_namespace(mgs)?;
    Ok(http_service(name, &ns, &must_gather_labels(mgs)))
}

pub fn must_gather_ingress(mgs: &MustGatherService) -> Result<Ingress> {
    let name = require(&mgs.spec.must_gather.name, "spec.mustGather.name")?;
    let ns = parent_namespace(mgs)?;
    Ok(http_ingress(
        name,
        &ns,
        &must_gather_labels(mgs),
        MUST_GATHER_INGRESS_PATH,
    ))
}
