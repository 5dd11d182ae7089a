use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ResourceRequirements, SecurityContext, Toleration};
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
    kind = "MustGatherService",
    derive = "Default",
    namespaced,
    shortname = "mgs",
    doc = "MustGatherService serves collected must-gather archives from a persistent volume",
    printcolumn = r#"{"name":"Service","jsonPath":".spec.mustGather.name","type":"string"}"#,
    printcolumn = r#"{"name":"PVC","jsonPath":".spec.persistentVolumeClaim.name","type":"string"}"#,
    status = "MustGatherServiceStatus"
)]
pub struct MustGatherServiceSpec {
    #[serde(default)]
    pub must_gather: MustGatherSpec,
    #[serde(default)]
    pub persistent_volume_claim: PersistentVolumeClaimSpec,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct MustGatherSpec {
    /// must-gather service deployment name
    pub name: String,
    /// deprecated, define the image through the operator environment
    pub image: ImageSpec,
    pub service_account_name: Option<String>,
    /// replicas, 0 or unset means 1
    pub replicas: i32,
    pub node_selector: Option<BTreeMap<String, String>>,
    pub tolerations: Option<Vec<Toleration>>,
    pub security_context: Option<SecurityContext>,
    /// startup command, default is `/bin/must-gather-service -v 1`
    pub command: Option<Vec<String>>,
    pub resources: Resources,
    pub host_network: bool,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct PersistentVolumeClaimSpec {
    pub name: String,
    /// requested storage size, default is 2Gi
    pub resources: Option<ResourceRequirements>,
    /// default is the cluster's default storage class
    pub storage_class_name: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct MustGatherServiceStatus {
    /// Names of the must-gather service pods
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must_gather_service_nodes: Vec<String>,
}

impl MustGatherService {
    pub fn must_gather_service_nodes(&mut self) -> &mut Vec<String> {
        &mut self
            .status
            .get_or_insert_with(Default::default)
            .must_gather_service_nodes
    }
}
