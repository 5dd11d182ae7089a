use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "operator.healthcheck.dev",
    version = "v1alpha1",
    kind = "MustGatherConfig",
    derive = "Default",
    namespaced,
    shortname = "mgc",
    doc = "MustGatherConfig publishes a gather configuration for must-gather jobs"
)]
pub struct MustGatherConfigSpec {
    /// body of the `gather_config` file
    #[serde(default)]
    pub gather_config: String,
}
