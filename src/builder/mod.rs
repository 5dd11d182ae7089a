//! Pure constructors for the desired state of every owned child.
//!
//! Builders never talk to the cluster and never set owner references; the
//! same input always yields the same object.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    HTTPGetAction, Probe, Service, ServicePort, ServiceSpec, TCPSocketAction,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Resource, ResourceExt};

use crate::{Error, Result};

mod health;
mod job;
mod memcached;
mod must_gather;

pub use health::*;
pub use job::*;
pub use memcached::*;
pub use must_gather::*;

pub static MANAGED_BY: &str = "healthcheck-operator";
pub const SERVICE_PORT: i32 = 6967;
pub static DEFAULT_PULL_POLICY: &str = "IfNotPresent";
pub const TERMINATION_GRACE_SECONDS: i64 = 60;

/// Standard label set, also used as the pod selector
pub fn labels(name: &str, release: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), name.to_string()),
        ("release".to_string(), release.to_string()),
        ("app.kubernetes.io/name".to_string(), name.to_string()),
        ("app.kubernetes.io/instance".to_string(), release.to_string()),
        ("app.kubernetes.io/managed-by".to_string(), MANAGED_BY.to_string()),
    ])
}

/// Product metadata carried by every pod template
pub fn product_annotations() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "productName".to_string(),
            "IBM Cloud Platform Common Services".to_string(),
        ),
        (
            "productID".to_string(),
            "068a62892a1e4db39641342e592daa25".to_string(),
        ),
        ("productMetric".to_string(), "FREE".to_string()),
    ])
}

pub fn ingress_annotations() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "kubernetes.io/ingress.class".to_string(),
            "ibm-icp-management".to_string(),
        ),
        (
            "icp.management.ibm.com/rewrite-target".to_string(),
            "/".to_string(),
        ),
        (
            "icp.management.ibm.com/configuration-snippet".to_string(),
            [
                r#"add_header Cache-Control "no-cache, no-store, must-revalidate";"#,
                "add_header Pragma no-cache;",
                "add_header Expires 0;",
                r#"add_header X-Frame-Options "SAMEORIGIN";"#,
                "add_header X-Content-Type-Options nosniff;",
                r#"add_header X-XSS-Protection "1; mode=block";"#,
            ]
            .join("\n"),
        ),
    ])
}

/// Zero or negative replica counts mean one
pub fn replicas(requested: i32) -> i32 {
    if requested > 0 { requested } else { 1 }
}

pub fn service_account(requested: &Option<String>, default: &str) -> String {
    requested
        .as_deref()
        .filter(|sa| !sa.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// User command, or `default` when none was given
pub fn command(requested: &Option<Vec<String>>, default: &[&str]) -> Vec<String> {
    match requested {
        Some(cmd) if !cmd.is_empty() => cmd.clone(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

pub(crate) fn pull_policy(requested: &Option<String>) -> Option<String> {
    Some(
        requested
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PULL_POLICY)
            .to_string(),
    )
}

pub(crate) fn require<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::MissingField(field.to_string()));
    }
    Ok(value)
}

pub(crate) fn parent_namespace<P: Resource>(parent: &P) -> Result<String> {
    parent
        .namespace()
        .ok_or_else(|| Error::MissingField("metadata.namespace".into()))
}

pub(crate) fn meta(name: &str, namespace: &str, labels: &BTreeMap<String, String>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(labels.clone()),
        ..ObjectMeta::default()
    }
}

pub(crate) fn http_probe(path: &str, failure_threshold: i32) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            port: IntOrString::Int(SERVICE_PORT),
            path: Some(path.to_string()),
            scheme: Some("HTTP".to_string()),
            ..HTTPGetAction::default()
        }),
        failure_threshold: Some(failure_threshold),
        initial_delay_seconds: Some(10),
        period_seconds: Some(10),
        success_threshold: Some(1),
        timeout_seconds: Some(2),
        ..Probe::default()
    }
}

pub(crate) fn tcp_probe(port_name: &str, initial_delay: i32, timeout: i32) -> Probe {
    Probe {
        tcp_socket: Some(TCPSocketAction {
            port: IntOrString::String(port_name.to_string()),
            host: None,
        }),
        initial_delay_seconds: Some(initial_delay),
        timeout_seconds: Some(timeout),
        ..Probe::default()
    }
}

/// ClusterIP service on the operand HTTP port
pub(crate) fn http_service(
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
) -> Service {
    Service {
        metadata: meta(name, namespace, labels),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port: SERVICE_PORT,
                target_port: Some(IntOrString::Int(SERVICE_PORT)),
                ..ServicePort::default()
            }]),
            selector: Some(labels.clone()),
            type_: Some("ClusterIP".to_string()),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

/// Ingress routing `path` to the service of the same name
pub(crate) fn http_ingress(
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    path: &str,
) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            annotations: Some(ingress_annotations()),
            ..meta(name, namespace, labels)
        },
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some(path.to_string()),
                        path_type: "ImplementationSpecific".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: name.to_string(),
                                port: Some(ServiceBackendPort {
                                    number: Some(SERVICE_PORT),
                                    ..ServiceBackendPort::default()
                                }),
                            }),
                            ..IngressBackend::default()
                        },
                    }],
                }),
                ..IngressRule::default()
            }]),
            ..IngressSpec::default()
        }),
        ..Ingress::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicas_default_to_one() {
        assert_eq!(replicas(0), 1);
        assert_eq!(replicas(-2), 1);
        assert_eq!(replicas(3), 3);
    }

    #[test]
    fn service_account_and_command_defaults() {
        assert_eq!(service_account(&None, "sa"), "sa");
        assert_eq!(service_account(&Some(String::new()), "sa"), "sa");
        assert_eq!(service_account(&Some("mine".into()), "sa"), "mine");
        assert_eq!(command(&None, &["a", "b"]), vec!["a", "b"]);
        assert_eq!(command(&Some(vec![]), &["a"]), vec!["a"]);
        assert_eq!(command(&Some(vec!["x".into()]), &["a"]), vec!["x"]);
    }

    #[test]
    fn label_set_is_complete() {
        let l = labels("memcached", "hs");
        assert_eq!(l.len(), 5);
        assert_eq!(l["app"], "memcached");
        assert_eq!(l["app.kubernetes.io/instance"], "hs");
        assert_eq!(l["app.kubernetes.io/managed-by"], MANAGED_BY);
    }

    #[test]
    fn ingress_routes_to_service_port() {
        let ing = http_ingress("svc", "ns", &labels("svc", "r"), "/x/");
        let rules = ing.spec.unwrap().rules.unwrap();
        let path = &rules[0].http.as_ref().unwrap().paths[0];
        assert_eq!(path.path.as_deref(), Some("/x/"));
        let backend = path.backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "svc");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(SERVICE_PORT));
        assert!(ing.metadata.annotations.unwrap().contains_key("kubernetes.io/ingress.class"));
    }
}
