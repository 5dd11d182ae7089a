use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Deprecated per-resource image override. Operand images normally come
/// from the operator's environment.
#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct ImageSpec {
    /// image repository, default is empty
    pub repository: String,
    /// image tag or `sha256:` digest, default is empty
    pub tag: String,
    /// image pull policy, default is IfNotPresent
    pub pull_policy: Option<String>,
}

/// Raw cpu/memory strings as written by the user. Empty means unset.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct ResourceSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cpu: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub memory: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct Resources {
    pub requests: ResourceSpec,
    pub limits: ResourceSpec,
}
