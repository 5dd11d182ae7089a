use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Affinity, ConfigMap, ConfigMapVolumeSource, Container, EnvVar,
    PersistentVolumeClaimVolumeSource, PodAffinity, PodAffinityTerm, PodSpec, PodTemplateSpec,
    Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;

use super::{
    MANAGED_BY, MUST_GATHER_DIR, MUST_GATHER_SERVICE_ACCOUNT, labels, meta, parent_namespace,
    product_annotations, pull_policy, service_account,
};
use crate::config::{MUST_GATHER_IMAGE_NAME, OperandImages, operand_image};
use crate::crd::{MustGatherConfig, MustGatherJob};
use crate::Result;

pub static MUST_GATHER_JOB_ACCOUNT: &str = "must-gather-job";
pub static MUST_GATHER_JOB_APP: &str = "must-gather-job";
pub static MUST_GATHER_CLAIM: &str = "must-gather-pvc";
pub static GATHER_CONFIG_KEY: &str = "gather_config";
pub const JOB_BACKOFF_LIMIT: i32 = 4;
static DEFAULT_GATHER_COMMAND: &str = "gather";

/// One-shot collection pod scheduled next to the must-gather service so it
/// can share the archive volume.
pub fn must_gather_job(job: &MustGatherJob, images: &OperandImages) -> Result<Job> {
    let name = job.name_any();
    let ns = parent_namespace(job)?;
    let spec = &job.spec;
    let labels = labels(MUST_GATHER_JOB_APP, &name);

    let user_command = spec
        .must_gather_command
        .as_deref()
        .filter(|c| !c.trim().is_empty());
    let command: Vec<String> = match user_command {
        Some(cmd) => cmd.split(' ').map(str::to_string).collect(),
        None => vec![DEFAULT_GATHER_COMMAND.to_string()],
    };

    let mut volume_mounts = vec![VolumeMount {
        name: MUST_GATHER_CLAIM.to_string(),
        mount_path: MUST_GATHER_DIR.to_string(),
        ..VolumeMount::default()
    }];
    let mut volumes = vec![Volume {
        name: MUST_GATHER_CLAIM.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: MUST_GATHER_CLAIM.to_string(),
            ..PersistentVolumeClaimVolumeSource::default()
        }),
        ..Volume::default()
    }];
    // the gather configuration is only read by the default command
    if user_command.is_none() {
        volume_mounts.push(VolumeMount {
            name: "must-gather-config".to_string(),
            mount_path: format!("/usr/bin/{GATHER_CONFIG_KEY}"),
            sub_path: Some(GATHER_CONFIG_KEY.to_string()),
            ..VolumeMount::default()
        });
        volumes.push(Volume {
            name: "must-gather-config".to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: spec.must_gather_config_name.clone().unwrap_or_default(),
                ..ConfigMapVolumeSource::default()
            }),
            ..Volume::default()
        });
    }

    let service_pods = BTreeMap::from([
        (
            "app.kubernetes.io/name".to_string(),
            MUST_GATHER_SERVICE_ACCOUNT.to_string(),
        ),
        (
            "app.kubernetes.io/instance".to_string(),
            MUST_GATHER_SERVICE_ACCOUNT.to_string(),
        ),
        (
            "app.kubernetes.io/managed-by".to_string(),
            MANAGED_BY.to_string(),
        ),
    ]);

    Ok(Job {
        metadata: meta(&name, &ns, &labels),
        spec: Some(JobSpec {
            backoff_limit: Some(JOB_BACKOFF_LIMIT),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    name: Some(name.clone()),
                    labels: Some(labels),
                    annotations: Some(product_annotations()),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    service_account_name: Some(service_account(
                        &spec.service_account_name,
                        MUST_GATHER_JOB_ACCOUNT,
                    )),
                    affinity: Some(Affinity {
                        pod_affinity: Some(PodAffinity {
                            required_during_scheduling_ignored_during_execution: Some(vec![
                                PodAffinityTerm {
                                    label_selector: Some(LabelSelector {
                                        match_labels: Some(service_pods),
                                        ..LabelSelector::default()
                                    }),
                                    topology_key: "kubernetes.io/hostname".to_string(),
                                    ..PodAffinityTerm::default()
                                },
                            ]),
                            ..PodAffinity::default()
                        }),
                        ..Affinity::default()
                    }),
                    containers: vec![Container {
                        name: name.clone(),
                        image: Some(operand_image(
                            &spec.image,
                            MUST_GATHER_IMAGE_NAME,
                            images.must_gather.as_deref(),
                        )),
                        image_pull_policy: pull_policy(&spec.image.pull_policy),
                        command: Some(command),
                        env: Some(vec![
                            EnvVar {
                                name: "FROM_OPERATOR".to_string(),
                                value: Some("1".to_string()),
                                ..EnvVar::default()
                            },
                            EnvVar {
                                name: "INSTANCE_NAME".to_string(),
                                value: Some(name.clone()),
                                ..EnvVar::default()
                            },
                        ]),
                        volume_mounts: Some(volume_mounts),
                        ..Container::default()
                    }],
                    volumes: Some(volumes),
                    ..PodSpec::default()
                }),
            },
            ..JobSpec::default()
        }),
        ..Job::default()
    })
}

/// Config map publishing a gather configuration under `gather_config`
pub fn gather_config_map(cfg: &MustGatherConfig) -> Result<ConfigMap> {
    let name = cfg.name_any();
    let ns = parent_namespace(cfg)?;
    Ok(ConfigMap {
        metadata: meta(&name, &ns, &BTreeMap::from([("app".to_string(), name.clone())])),
        data: Some(BTreeMap::from([(
            GATHER_CONFIG_KEY.to_string(),
            cfg.spec.gather_config.clone(),
        )])),
        ..ConfigMap::default()
    })
}
