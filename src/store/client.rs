use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use kube::{
    Client,
    api::{Api, ListParams, PostParams},
};
use tracing::*;

use super::{ClusterObject, Object, ObjectStore, object_key, selector_string};
use crate::{Error, Result};

/// [`ObjectStore`] backed by a live cluster. Every call is bounded by
/// `timeout`.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    timeout: Duration,
}

impl KubeStore {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn call<T, F>(&self, what: impl Into<String>, fut: F) -> Result<T>
    where
        F: Future<Output = kube::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(Error::KubeError),
            Err(_) => {
                let what = what.into();
                warn!("{what} timed out after {:?}", self.timeout);
                Err(Error::Timeout(what))
            }
        }
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<K> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let kind = K::kind(&()).to_string();
        match self
            .call(format!("get {kind} {namespace}/{name}"), api.get(name))
            .await
        {
            Err(Error::KubeError(kube::Error::Api(resp))) if resp.code == 404 => {
                Err(Error::NotFound {
                    kind,
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                })
            }
            other => other,
        }
    }

    async fn list<K: Object>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<K>> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().labels(&selector_string(labels));
        let list = self
            .call(format!("list {} in {namespace}", K::kind(&())), api.list(&lp))
            .await?;
        Ok(list.items)
    }

    async fn list_cluster<K: ClusterObject>(&self) -> Result<Vec<K>> {
        let api: Api<K> = Api::all(self.client.clone());
        let list = self
            .call(
                format!("list {}", K::kind(&())),
                api.list(&ListParams::default()),
            )
            .await?;
        Ok(list.items)
    }

    async fn create<K: Object>(&self, obj: &K) -> Result<K> {
        let (namespace, name) = object_key(obj)?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        self.call(
            format!("create {} {namespace}/{name}", K::kind(&())),
            api.create(&PostParams::default(), obj),
        )
        .await
    }

    async fn update<K: Object>(&self, obj: &K) -> Result<K> {
        let (namespace, name) = object_key(obj)?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        self.call(
            format!("update {} {namespace}/{name}", K::kind(&())),
            api.replace(&name, &PostParams::default(), obj),
        )
        .await
    }

    async fn update_status<K: Object>(&self, obj: &K) -> Result<K> {
        let (namespace, name) = object_key(obj)?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        let data = serde_json::to_vec(obj).map_err(Error::SerializationError)?;
        self.call(
            format!("update {} {namespace}/{name} status", K::kind(&())),
            api.replace_status(&name, &PostParams::default(), data),
        )
        .await
    }
}
