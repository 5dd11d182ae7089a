use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, EmptyDirVolumeSource, EnvVar, EnvVarSource,
    KeyToPath, ObjectFieldSelector, PodSpec, PodTemplateSpec, Service, Volume, VolumeMount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;

use super::{
    TERMINATION_GRACE_SECONDS, http_ingress, http_probe, http_service, labels, meta,
    parent_namespace, product_annotations, pull_policy, replicas, require, service_account,
};
use crate::config::{HEALTH_SERVICE_IMAGE_NAME, OperandImages, TemplateSource, operand_image};
use crate::crd::HealthService;
use crate::quantity;
use crate::Result;

pub static HEALTH_SERVICE_ACCOUNT: &str = "healthcheck-service";
pub static HEALTH_INGRESS_PATH: &str = "/cluster-health/";
pub static HEALTH_PROBE_PATH: &str = "/v1alpha1/health";
pub static HEALTH_CONFIG_DIR: &str = "/etc/health";
static CPNAMES_FILE: &str = "cpnames.yaml";
static DATA_VOLUME: &str = "cluster-healthcheck-data";
static TMP_VOLUME: &str = "tmp-volume";
// rwxr--r--
const CONFIG_FILE_MODE: i32 = 0o744;

pub fn health_labels(hs: &HealthService) -> BTreeMap<String, String> {
    labels(&hs.spec.health_service.name, &hs.name_any())
}

/// Health service configuration, seeded from the template and renamed
pub fn health_config_map(hs: &HealthService, templates: &dyn TemplateSource) -> Result<ConfigMap> {
    let spec = &hs.spec.health_service;
    require(&spec.name, "spec.healthService.name")?;
    let cm_name = require(&spec.configmap_name, "spec.healthService.configmapName")?;
    let ns = parent_namespace(hs)?;
    let mut cm = templates.health_config_map()?;
    cm.metadata.name = Some(cm_name.to_string());
    cm.metadata.namespace = Some(ns);
    cm.metadata.labels = Some(health_labels(hs));
    Ok(cm)
}

fn env_value(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..EnvVar::default()
    }
}

fn health_env(hs: &HealthService) -> Vec<EnvVar> {
    let spec = &hs.spec.health_service;
    vec![
        EnvVar {
            name: "HEALTHNAMESPACE".to_string(),
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "metadata.namespace".to_string(),
                    ..ObjectFieldSelector::default()
                }),
                ..EnvVarSource::default()
            }),
            ..EnvVar::default()
        },
        env_value(
            "CPNAMESCONFIGPATH",
            &format!("{HEALTH_CONFIG_DIR}/{CPNAMES_FILE}"),
        ),
        env_value("LOGLEVEL", "1"),
        env_value("MEMCACHEDPORT", &super::MEMCACHED_PORT.to_string()),
        env_value("CLOUDPAKNAME_SETTING", &spec.cloudpak_name_setting),
        env_value("SERVICENAME_SETTING", &spec.service_name_setting),
        env_value("DEPENDS_SETTING", &spec.depends_setting),
    ]
}

pub fn health_deployment(hs: &HealthService, images: &OperandImages) -> Result<Deployment> {
    let spec = &hs.spec.health_service;
    let name = require(&spec.name, "spec.healthService.name")?;
    let cm_name = require(&spec.configmap_name, "spec.healthService.configmapName")?;
    let ns = parent_namespace(hs)?;
    let labels = health_labels(hs);

    let container = Container {
        name: name.to_string(),
        image: Some(operand_image(
            &spec.image,
            HEALTH_SERVICE_IMAGE_NAME,
            images.health_service.as_deref(),
        )),
        image_pull_policy: pull_policy(&spec.image.pull_policy),
        security_context: spec.security_context.clone(),
        env: Some(health_env(hs)),
        resources: Some(quantity::requirements(&spec.resources)),
        volume_mounts: Some(vec![
            VolumeMount {
                name: DATA_VOLUME.to_string(),
                mount_path: HEALTH_CONFIG_DIR.to_string(),
                ..VolumeMount::default()
            },
            VolumeMount {
                name: TMP_VOLUME.to_string(),
                mount_path: "/tmp".to_string(),
                ..VolumeMount::default()
            },
        ]),
        liveness_probe: Some(http_probe(HEALTH_PROBE_PATH, 3)),
        readiness_probe: Some(http_probe(HEALTH_PROBE_PATH, 1)),
        ..Container::default()
    };

    Ok(Deployment {
        metadata: meta(name, &ns, &labels),
        spec: Some(DeploymentSpec {
            min_ready_seconds: Some(0),
            replicas: Some(replicas(spec.replica_count)),
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
                        HEALTH_SERVICE_ACCOUNT,
                    )),
                    containers: vec![container],
                    node_selector: spec.node_selector.clone(),
                    tolerations: spec.tolerations.clone(),
                    volumes: Some(vec![
                        Volume {
                            name: TMP_VOLUME.to_string(),
                            empty_dir: Some(EmptyDirVolumeSource::default()),
                            ..Volume::default()
                        },
                        Volume {
                            name: DATA_VOLUME.to_string(),
                            config_map: Some(ConfigMapVolumeSource {
                                name: cm_name.to_string(),
                                default_mode: Some(CONFIG_FILE_MODE),
                                items: Some(vec![KeyToPath {
                                    key: CPNAMES_FILE.to_string(),
                                    path: CPNAMES_FILE.to_string(),
                                    ..KeyToPath::default()
                                }]),
                                ..ConfigMapVolumeSource::default()
                            }),
                            ..Volume::default()
                        },
                    ]),
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    })
}

pub fn health_service(hs: &HealthService) -> Result<Service> {
    let name = require(&hs.spec.health_service.name, "spec.healthService.name")?;
    let ns = parent_namespace(hs)?;
    Ok(http_service(name, &ns, &health_labels(hs)))
}

pub fn health_ingress(hs: &HealthService) -> Result<Ingress> {
    let name = require(&hs.spec.health_service.name, "spec.healthService.name")?;
    let ns = parent_namespace(hs)?;
    Ok(http_ingress(name, &ns, &health_labels(hs), HEALTH_INGRESS_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticTemplates;
    use crate::crd::{HealthCheckSpec, HealthServiceSpec};

    fn hs() -> HealthService {
        let mut hs = HealthService::new(
            "hs",
            HealthServiceSpec {
                health_service: HealthCheckSpec {
                    name: "system-healthcheck-service".into(),
                    configmap_name: "system-healthcheck-service-config".into(),
                    cloudpak_name_setting: "cloudpakName".into(),
                    ..HealthCheckSpec::default()
                },
                ..HealthServiceSpec::default()
            },
        );
        hs.metadata.namespace = Some("cs".into());
        hs
    }

    #[test]
    fn config_map_takes_template_body_and_our_identity() {
        let templates = StaticTemplates {
            health_config_map: ConfigMap {
                metadata: ObjectMeta {
                    name: Some("from-template".into()),
                    annotations: Some(BTreeMap::from([(
                        "description".to_string(),
                        "health check config".to_string(),
                    )])),
                    ..ObjectMeta::default()
                },
                data: Some(BTreeMap::from([(CPNAMES_FILE.to_string(), "x: y".to_string())])),
                ..ConfigMap::default()
            },
        };
        let cm = health_config_map(&hs(), &templates).unwrap();
        assert_eq!(
            cm.metadata.name.as_deref(),
            Some("system-healthcheck-service-config")
        );
        assert_eq!(cm.metadata.namespace.as_deref(), Some("cs"));
        assert_eq!(cm.metadata.labels, Some(health_labels(&hs())));
        assert_eq!(
            cm.metadata.annotations.unwrap()["description"],
            "health check config"
        );
        assert_eq!(cm.data.unwrap()[CPNAMES_FILE], "x: y");
    }

    #[test]
    fn deployment_wires_config_and_env() {
        let dep = health_deployment(&hs(), &OperandImages::default()).unwrap();
        let pod = dep.spec.unwrap().template.spec.unwrap();
        assert_eq!(pod.termination_grace_period_seconds, Some(60));
        assert_eq!(
            pod.service_account_name.as_deref(),
            Some(HEALTH_SERVICE_ACCOUNT)
        );
        let volumes = pod.volumes.unwrap();
        let cm = volumes[1].config_map.as_ref().unwrap();
        assert_eq!(cm.name, "system-healthcheck-service-config");
        assert_eq!(cm.default_mode, Some(484));
        let env = pod.containers[0].env.clone().unwrap();
        let setting = env.iter().find(|e| e.name == "CLOUDPAKNAME_SETTING").unwrap();
        assert_eq!(setting.value.as_deref(), Some("cloudpakName"));
        let probe = pod.containers[0].readiness_probe.clone().unwrap();
        assert_eq!(
            probe.http_get.unwrap().path.as_deref(),
            Some(HEALTH_PROBE_PATH)
        );
    }

    #[test]
    fn missing_configmap_name_is_rejected() {
        let mut h = hs();
        h.spec.health_service.configmap_name.clear();
        assert!(health_deployment(&h, &OperandImages::default()).is_err());
        assert!(health_config_map(&h, &StaticTemplates::default()).is_err());
    }

    #[test]
    fn ingress_path() {
        let ing = health_ingress(&hs()).unwrap();
        let rules = ing.spec.unwrap().rules.unwrap();
        assert_eq!(
            rules[0].http.as_ref().unwrap().paths[0].path.as_deref(),
            Some(HEALTH_INGRESS_PATH)
        );
    }
}
