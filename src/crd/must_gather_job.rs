use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::common::ImageSpec;

#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "operator.healthcheck.dev",
    version = "v1alpha1",
    kind = "MustGatherJob",
    derive = "Default",
    namespaced,
    shortname = "mgj",
    doc = "MustGatherJob runs a one-shot diagnostic collection into the must-gather volume"
)]
#[serde(default)]
pub struct MustGatherJobSpec {
    /// overrides MUST_GATHER_IMAGE when both repository and tag are set
    pub image: ImageSpec,
    pub service_account_name: Option<String>,
    /// space separated command line, default is `gather`
    pub must_gather_command: Option<String>,
    /// config map mounted as the gather configuration for the default command
    pub must_gather_config_name: Option<String>,
}
