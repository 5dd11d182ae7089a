//! In-memory [`ObjectStore`] used by the reconcile tests.
//!
//! Objects are kept as JSON and keyed by kind, namespace and name. Writes
//! behave like the API server where the tests depend on it: `create` rejects
//! duplicates and assigns a uid, `update` rejects a stale resourceVersion and
//! keeps the stored status, `update_status` only touches `status`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use kube::Resource;
use serde_json::Value;

use super::{ClusterObject, Object, ObjectStore, object_key};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    List,
    Create,
    Update,
    UpdateStatus,
}

/// One recorded call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub verb: Verb,
    pub kind: String,
    pub name: String,
}

type Key = (String, String, String);

#[derive(Default)]
struct Inner {
    objects: BTreeMap<Key, Value>,
    calls: Vec<Call>,
    failures: Vec<(Verb, String)>,
    next_uid: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording a call
    pub fn insert<K: Resource<DynamicType = ()> + serde::Serialize>(&self, obj: &K) {
        let namespace = obj.meta().namespace.clone().unwrap_or_default();
        let name = obj.meta().name.clone().unwrap_or_default();
        let key = (K::kind(&()).to_string(), namespace, name);
        let mut inner = self.lock();
        let Ok(mut value) = serde_json::to_value(obj) else {
            return;
        };
        inner.next_uid += 1;
        let uid = format!("uid-{}", inner.next_uid);
        let meta = &mut value["metadata"];
        if meta.get("uid").is_none() {
            meta["uid"] = Value::String(uid);
        }
        if meta.get("resourceVersion").is_none() {
            meta["resourceVersion"] = Value::String("1".into());
        }
        inner.objects.insert(key, value);
    }

    /// Typed copy of a stored object
    pub fn object<K: Object>(&self, namespace: &str, name: &str) -> Option<K> {
        let key = (K::kind(&()).to_string(), namespace.to_string(), name.to_string());
        let inner = self.lock();
        let value = inner.objects.get(&key)?.clone();
        serde_json::from_value(value).ok()
    }

    /// Make every later `verb` call on `kind` fail
    pub fn fail_on(&self, verb: Verb, kind: &str) {
        self.lock().failures.push((verb, kind.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of recorded `verb` calls on `kind`
    pub fn count(&self, verb: Verb, kind: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.verb == verb && c.kind == kind)
            .count()
    }

    /// Number of recorded writes of any kind
    pub fn writes(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c.verb, Verb::Create | Verb::Update | Verb::UpdateStatus))
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, verb: Verb, kind: &str, name: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(Call {
            verb,
            kind: kind.to_string(),
            name: name.to_string(),
        });
        if inner.failures.iter().any(|(v, k)| *v == verb && k == kind) {
            return Err(Error::OtherError(format!("injected {verb:?} failure for {kind} {name}")));
        }
        Ok(())
    }
}

fn bump_version(value: &mut Value) {
    let next = value["metadata"]["resourceVersion"]
        .as_str()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    value["metadata"]["resourceVersion"] = Value::String(next.to_string());
}

fn labels_match(value: &Value, wanted: &BTreeMap<String, String>) -> bool {
    let labels = &value["metadata"]["labels"];
    wanted
        .iter()
        .all(|(k, v)| labels.get(k).and_then(Value::as_str) == Some(v.as_str()))
}

fn decode<K: serde::de::DeserializeOwned>(value: Value) -> Result<K> {
    serde_json::from_value(value).map_err(Error::SerializationError)
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<K> {
        let kind = K::kind(&()).to_string();
        self.record(Verb::Get, &kind, name)?;
        let key = (kind.clone(), namespace.to_string(), name.to_string());
        let found = self.lock().objects.get(&key).cloned();
        match found {
            Some(value) => decode(value),
            None => Err(Error::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
        }
    }

    async fn list<K: Object>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<K>> {
        let kind = K::kind(&()).to_string();
        self.record(Verb::List, &kind, "")?;
        let values: Vec<Value> = self
            .lock()
            .objects
            .iter()
            .filter(|((k, ns, _), v)| *k == kind && ns == namespace && labels_match(v, labels))
            .map(|(_, v)| v.clone())
            .collect();
        values.into_iter().map(decode).collect()
    }

    async fn list_cluster<K: ClusterObject>(&self) -> Result<Vec<K>> {
        let kind = K::kind(&()).to_string();
        self.record(Verb::List, &kind, "")?;
        let values: Vec<Value> = self
            .lock()
            .objects
            .iter()
            .filter(|((k, _, _), _)| *k == kind)
            .map(|(_, v)| v.clone())
            .collect();
        values.into_iter().map(decode).collect()
    }

    async fn create<K: Object>(&self, obj: &K) -> Result<K> {
        let kind = K::kind(&()).to_string();
        let (namespace, name) = object_key(obj)?;
        self.record(Verb::Create, &kind, &name)?;
        let mut value = serde_json::to_value(obj).map_err(Error::SerializationError)?;
        let mut inner = self.lock();
        let key = (kind.clone(), namespace, name.clone());
        if inner.objects.contains_key(&key) {
            return Err(Error::OtherError(format!("{kind} {name} already exists")));
        }
        inner.next_uid += 1;
        value["metadata"]["uid"] = Value::String(format!("uid-{}", inner.next_uid));
        value["metadata"]["resourceVersion"] = Value::String("1".into());
        inner.objects.insert(key, value.clone());
        decode(value)
    }

    async fn update<K: Object>(&self, obj: &K) -> Result<K> {
        let kind = K::kind(&()).to_string();
        let (namespace, name) = object_key(obj)?;
        self.record(Verb::Update, &kind, &name)?;
        let mut value = serde_json::to_value(obj).map_err(Error::SerializationError)?;
        let mut inner = self.lock();
        let key = (kind.clone(), namespace.clone(), name.clone());
        let Some(stored) = inner.objects.get(&key) else {
            return Err(Error::NotFound { kind, namespace, name });
        };
        let stored_version = &stored["metadata"]["resourceVersion"];
        let sent_version = &value["metadata"]["resourceVersion"];
        if !sent_version.is_null() && sent_version != stored_version {
            return Err(Error::OtherError(format!("conflict updating {kind} {name}")));
        }
        value["metadata"]["uid"] = stored["metadata"]["uid"].clone();
        value["metadata"]["resourceVersion"] = stored_version.clone();
        match stored.get("status") {
            Some(status) => value["status"] = status.clone(),
            None => {
                if let Some(map) = value.as_object_mut() {
                    map.remove("status");
                }
            }
        }
        bump_version(&mut value);
        inner.objects.insert(key, value.clone());
        decode(value)
    }

    async fn update_status<K: Object>(&self, obj: &K) -> Result<K> {
        let kind = K::kind(&()).to_string();
        let (namespace, name) = object_key(obj)?;
        self.record(Verb::UpdateStatus, &kind, &name)?;
        let sent = serde_json::to_value(obj).map_err(Error::SerializationError)?;
        let mut inner = self.lock();
        let key = (kind.clone(), namespace.clone(), name.clone());
        let Some(stored) = inner.objects.get_mut(&key) else {
            return Err(Error::NotFound { kind, namespace, name });
        };
        if let (Some(map), Some(status)) = (stored.as_object_mut(), sent.get("status")) {
            map.insert("status".into(), status.clone());
        }
        bump_version(stored);
        decode(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn cm(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some("ns".into()),
                ..ObjectMeta::default()
            },
            ..ConfigMap::default()
        }
    }

    #[tokio::test]
    async fn create_then_get_and_reject_duplicate() {
        let store = MemoryStore::new();
        let created = store.create(&cm("a")).await.unwrap();
        assert!(created.metadata.uid.is_some());
        let got: ConfigMap = store.get("ns", "a").await.unwrap();
        assert_eq!(got.metadata.uid, created.metadata.uid);
        assert!(store.create(&cm("a")).await.is_err());
        assert_eq!(store.count(Verb::Create, "ConfigMap"), 2);
    }

    #[tokio::test]
    async fn stale_update_is_rejected() {
        let store = MemoryStore::new();
        let first = store.create(&cm("a")).await.unwrap();
        store.update(&first).await.unwrap();
        assert!(store.update(&first).await.is_err());
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get::<ConfigMap>("ns", "nope").await.unwrap_err();
        assert!(err.is_not_found());
        store.fail_on(Verb::Get, "ConfigMap");
        let err = store.get::<ConfigMap>("ns", "nope").await.unwrap_err();
        assert!(!err.is_not_found());
    }
}
