use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tracing::*;

use crate::store::{Object, ObjectStore};
use crate::{Error, Result};

/// Names of `pods`, in the order the API returned them
pub fn pod_names(pods: &[Pod]) -> Vec<String> {
    pods.iter().map(|p| p.name_any()).collect()
}

/// Record the names of the pods matching `selector` in a status list of
/// `parent`.
///
/// The status is written only when the list differs (order included) from
/// what `parent` already carries. On a write `parent` is replaced with the
/// server's copy so later writes in the same pass see the new
/// resourceVersion. Returns whether a write happened.
pub async fn report_pods<S, P>(
    store: &S,
    parent: &mut P,
    selector: &BTreeMap<String, String>,
    field: fn(&mut P) -> &mut Vec<String>,
) -> Result<bool>
where
    S: ObjectStore,
    P: Object,
{
    let namespace = parent
        .namespace()
        .ok_or_else(|| Error::MissingField("metadata.namespace".into()))?;
    let pods: Vec<Pod> = store.list(&namespace, selector).await?;
    let names = pod_names(&pods);

    let mut observed = parent.clone();
    if *field(&mut observed) == names {
        return Ok(false);
    }
    *field(&mut observed) = names;
    info!(
        "Updating {} {} status: {:?}",
        P::kind(&()),
        parent.name_any(),
        field(&mut observed)
    );
    *parent = store.update_status(&observed).await?;
    Ok(true)
}
