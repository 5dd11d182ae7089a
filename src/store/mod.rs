use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::Resource;
use serde::{Serialize, de::DeserializeOwned};

use crate::Result;

mod client;
pub mod memory;

pub use client::KubeStore;
pub use memory::MemoryStore;

/// A namespaced object the operator reads or writes
pub trait Object:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> Object for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// A cluster scoped object the operator only lists
pub trait ClusterObject:
    Resource<DynamicType = (), Scope = ClusterResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> ClusterObject for K where
    K: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Typed access to the API server.
///
/// `get` reports a missing object as [`crate::Error::NotFound`] so callers
/// can tell "absent" apart from every other failure. `create`, `update` and
/// `update_status` take the namespace and name from the object's metadata.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<K>;

    /// List objects whose labels contain every pair in `labels`
    async fn list<K: Object>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<K>>;

    async fn list_cluster<K: ClusterObject>(&self) -> Result<Vec<K>>;

    async fn create<K: Object>(&self, obj: &K) -> Result<K>;

    /// Replace the whole object. Carries the object's resourceVersion, so a
    /// stale copy is rejected.
    async fn update<K: Object>(&self, obj: &K) -> Result<K>;

    /// Replace only the status subresource
    async fn update_status<K: Object>(&self, obj: &K) -> Result<K>;
}

/// Render a label map as an equality selector, `k1=v1,k2=v2`
pub fn selector_string(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Namespace and name of an object about to be written
pub(crate) fn object_key<K: Resource>(obj: &K) -> Result<(String, String)> {
    let meta = obj.meta();
    let namespace = meta
        .namespace
        .clone()
        .ok_or_else(|| crate::Error::MissingField("metadata.namespace".into()))?;
    let name = meta
        .name
        .clone()
        .ok_or_else(|| crate::Error::MissingField("metadata.name".into()))?;
    Ok((namespace, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_string_is_sorted_and_joined() {
        let labels = BTreeMap::from([
            ("release".to_string(), "hs".to_string()),
            ("app".to_string(), "memcached".to_string()),
        ]);
        assert_eq!(selector_string(&labels), "app=memcached,release=hs");
        assert_eq!(selector_string(&BTreeMap::new()), "");
    }
}
