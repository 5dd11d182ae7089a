use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{SecurityContext, Toleration};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::common::{ImageSpec, Resources};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "operator.healthcheck.dev",
    version = "v1alpha1",
    kind = "HealthService",
    derive = "Default",
    namespaced,
    shortname = "hs",
    doc = "HealthService runs the cluster health-check service together with its memcached cache",
    printcolumn = r#"{"name":"Service","jsonPath":".spec.healthService.name","type":"string"}"#,
    printcolumn = r#"{"name":"Memcached","jsonPath":".spec.memcached.name","type":"string"}"#,
    status = "HealthServiceStatus"
)]
pub struct HealthServiceSpec {
    #[serde(default)]
    pub memcached: MemcachedSpec,
    #[serde(default)]
    pub health_service: HealthCheckSpec,
}

/// How the memcached cache is run
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum MemcachedWorkload {
    #[default]
    Deployment,
    StatefulSet,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct MemcachedSpec {
    /// memcached workload name
    pub name: String,
    /// deprecated, define the image through the operator environment
    pub image: ImageSpec,
    /// workload kind, default is Deployment
    pub workload: MemcachedWorkload,
    /// replicas, 0 or unset means 1
    pub replica_count: i32,
    pub service_account_name: Option<String>,
    pub node_selector: Option<BTreeMap<String, String>>,
    pub tolerations: Option<Vec<Toleration>>,
    pub security_context: Option<SecurityContext>,
    /// startup command, default is `memcached -m 64 -o modern -v`
    pub command: Option<Vec<String>>,
    pub resources: Resources,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct HealthCheckSpec {
    /// health service deployment name
    pub name: String,
    /// deprecated, define the image through the operator environment
    pub image: ImageSpec,
    /// config map holding the health service configuration files
    pub configmap_name: String,
    /// label/annotation used to read a pod's cloudpak name
    pub cloudpak_name_setting: String,
    /// label/annotation used to read a pod's service name
    pub service_name_setting: String,
    /// label/annotation used to read a pod's dependencies
    pub depends_setting: String,
    /// replicas, 0 or unset means 1
    pub replica_count: i32,
    pub service_account_name: Option<String>,
    pub node_selector: Option<BTreeMap<String, String>>,
    pub tolerations: Option<Vec<Toleration>>,
    pub security_context: Option<SecurityContext>,
    pub host_network: bool,
    pub resources: Resources,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct HealthServiceStatus {
    /// Names of the memcached pods
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub memcached_nodes: Vec<String>,
    /// Names of the health service pods
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub health_check_nodes: Vec<String>,
}

impl HealthService {
    pub fn memcached_nodes(&mut self) -> &mut Vec<String> {
        &mut self.status.get_or_insert_with(Default::default).memcached_nodes
    }

    pub fn health_check_nodes(&mut self) -> &mut Vec<String> {
        &mut self.status.get_or_insert_with(Default::default).health_check_nodes
    }
}
