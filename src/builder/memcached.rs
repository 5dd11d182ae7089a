use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use super::{
    command, labels, meta, parent_namespace, product_annotations, pull_policy, replicas, require,
    service_account, tcp_probe,
};
use crate::config::{MEMCACHED_IMAGE_NAME, OperandImages, operand_image};
use crate::crd::HealthService;
use crate::quantity;
use crate::Result;

pub static MEMCACHED_SERVICE_NAME: &str = "memcached";
pub static MEMCACHED_SERVICE_ACCOUNT: &str = "healthcheck-memcached";
pub const MEMCACHED_PORT: i32 = 11211;
const MEMCACHED_COMMAND: [&str; 5] = ["memcached", "-m 64", "-o", "modern", "-v"];

/// Labels shared by the memcached workload, its pods and its service
pub fn memcached_labels(hs: &HealthService) -> BTreeMap<String, String> {
    labels(&hs.spec.memcached.name, &hs.name_any())
}

fn memcached_pod_template(hs: &HealthService, images: &OperandImages) -> Result<PodTemplateSpec> {
    let spec = &hs.spec.memcached;
    let name = require(&spec.name, "spec.memcached.name")?;
    let labels = memcached_labels(hs);
    Ok(PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels),
            annotations: Some(product_annotations()),
            ..ObjectMeta::default()
        }),
        spec: Some(PodSpec {
            host_network: Some(false),
            host_pid: Some(false),
            host_ipc: Some(false),
            service_account_name: Some(service_account(
                &spec.service_account_name,
                MEMCACHED_SERVICE_ACCOUNT,
            )),
            containers: vec![Container {
                name: name.to_string(),
                image: Some(operand_image(
                    &spec.image,
                    MEMCACHED_IMAGE_NAME,
                    images.memcached.as_deref(),
                )),
                image_pull_policy: pull_policy(&spec.image.pull_policy),
                command: Some(command(&spec.command, &MEMCACHED_COMMAND)),
                ports: Some(vec![ContainerPort {
                    container_port: MEMCACHED_PORT,
                    name: Some(name.to_string()),
                    ..ContainerPort::default()
                }]),
                security_context: spec.security_context.clone(),
                liveness_probe: Some(tcp_probe(name, 30, 5)),
                readiness_probe: Some(tcp_probe(name, 5, 1)),
                resources: Some(quantity::requirements(&spec.resources)),
                ..Container::default()
            }],
            node_selector: spec.node_selector.clone(),
            tolerations: spec.tolerations.clone(),
            ..PodSpec::default()
        }),
    })
}

/// Memcached cache run as a Deployment
pub fn memcached_deployment(hs: &HealthService, images: &OperandImages) -> Result<Deployment> {
    let spec = &hs.spec.memcached;
    let name = require(&spec.name, "spec.memcached.name")?;
    let ns = parent_namespace(hs)?;
    let labels = memcached_labels(hs);
    Ok(Deployment {
        metadata: meta(name, &ns, &labels),
        spec: Some(DeploymentSpec {
            replicas: Some(replicas(spec.replica_count)),
            selector: LabelSelector {
                match_labels: Some(labels),
                ..LabelSelector::default()
            },
            template: memcached_pod_template(hs, images)?,
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    })
}

/// Memcached cache run as a StatefulSet governed by the headless service
pub fn memcached_stateful_set(hs: &HealthService, images: &OperandImages) -> Result<StatefulSet> {
    let spec = &hs.spec.memcached;
    let name = require(&spec.name, "spec.memcached.name")?;
    let ns = parent_namespace(hs)?;
    let labels = memcached_labels(hs);
    Ok(StatefulSet {
        metadata: meta(name, &ns, &labels),
        spec: Some(StatefulSetSpec {
            replicas: Some(replicas(spec.replica_count)),
            service_name: Some(MEMCACHED_SERVICE_NAME.to_string()),
            selector: LabelSelector {
                match_labels: Some(labels),
                ..LabelSelector::default()
            },
            template: memcached_pod_template(hs, images)?,
            ..StatefulSetSpec::default()
        }),
        ..StatefulSet::default()
    })
}

/// Headless service in front of the memcached pods
pub fn memcached_service(hs: &HealthService) -> Result<Service> {
    let name = require(&hs.spec.memcached.name, "spec.memcached.name")?;
    let ns = parent_namespace(hs)?;
    let labels = memcached_labels(hs);
    Ok(Service {
        metadata: meta(MEMCACHED_SERVICE_NAME, &ns, &labels),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                name: Some(name.to_string()),
                port: MEMCACHED_PORT,
                target_port: Some(IntOrString::String(name.to_string())),
                ..ServicePort::default()
            }]),
            selector: Some(labels),
            cluster_ip: Some("None".to_string()),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{HealthServiceSpec, MemcachedSpec};

    fn hs(replicas: i32) -> HealthService {
        let mut hs = HealthService::new(
            "hs",
            HealthServiceSpec {
                memcached: MemcachedSpec {
                    name: "icp-memcached".into(),
                    replica_count: replicas,
                    ..MemcachedSpec::default()
                },
                ..HealthServiceSpec::default()
            },
        );
        hs.metadata.namespace = Some("cs".into());
        hs
    }

    #[test]
    fn deployment_defaults() {
        let dep = memcached_deployment(&hs(0), &OperandImages::default()).unwrap();
        assert_eq!(dep.metadata.name.as_deref(), Some("icp-memcached"));
        assert_eq!(dep.metadata.namespace.as_deref(), Some("cs"));
        let spec = dep.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));
        let pod = spec.template.spec.unwrap();
        assert_eq!(pod.service_account_name.as_deref(), Some(MEMCACHED_SERVICE_ACCOUNT));
        let c = &pod.containers[0];
        assert_eq!(
            c.image.as_deref(),
            Some("quay.io/opencloudio/icp-memcached:latest")
        );
        assert_eq!(c.command.as_ref().unwrap()[0], "memcached");
        assert_eq!(c.ports.as_ref().unwrap()[0].container_port, MEMCACHED_PORT);
    }

    #[test]
    fn deployment_is_deterministic() {
        let images = OperandImages {
            memcached: Some("env/memcached:1".into()),
            ..OperandImages::default()
        };
        let a = serde_json::to_value(memcached_deployment(&hs(2), &images).unwrap()).unwrap();
        let b = serde_json::to_value(memcached_deployment(&hs(2), &images).unwrap()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a["spec"]["replicas"], 2);
        assert_eq!(
            a["spec"]["template"]["spec"]["containers"][0]["image"],
            "env/memcached:1"
        );
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut h = hs(1);
        h.spec.memcached.name.clear();
        assert!(matches!(
            memcached_deployment(&h, &OperandImages::default()),
            Err(crate::Error::MissingField(_))
        ));
    }

    #[test]
    fn stateful_set_uses_headless_service() {
        let sts = memcached_stateful_set(&hs(3), &OperandImages::default()).unwrap();
        let spec = sts.spec.unwrap();
        assert_eq!(spec.service_name.as_deref(), Some(MEMCACHED_SERVICE_NAME));
        assert_eq!(spec.replicas, Some(3));
        let svc = memcached_service(&hs(3)).unwrap();
        assert_eq!(svc.spec.unwrap().cluster_ip.as_deref(), Some("None"));
    }
}
