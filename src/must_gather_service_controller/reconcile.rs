use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::api::storage::v1::StorageClass;
use tracing::*;

use crate::builder::{
    default_storage_class, must_gather_deployment, must_gather_ingress, must_gather_labels,
    must_gather_pvc, must_gather_service,
};
use crate::config::OperandImages;
use crate::controller::fetch_parent;
use crate::converge::{Change, converge, owner_ref};
use crate::crd::MustGatherService;
use crate::status::report_pods;
use crate::store::ObjectStore;
use crate::Result;

/// Storage class for the claim: the one named on the resource, else the
/// cluster default. An existing claim is never updated, so the cluster is
/// not asked when the claim is already there.
async fn storage_class<S: ObjectStore>(
    store: &S,
    mgs: &MustGatherService,
    namespace: &str,
) -> Result<String> {
    let spec = &mgs.spec.persistent_volume_claim;
    if let Some(sc) = spec.storage_class_name.as_deref().filter(|sc| !sc.is_empty()) {
        return Ok(sc.to_string());
    }
    if spec.name.trim().is_empty() {
        return Ok(String::new());
    }
    match store.get::<PersistentVolumeClaim>(namespace, &spec.name).await {
        Ok(_) => return Ok(String::new()),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }
    let classes = store.list_cluster::<StorageClass>().await?;
    let class = default_storage_class(&classes);
    if class.is_empty() {
        warn!("no usable storage class for claim {namespace}/{}", spec.name);
    }
    Ok(class)
}

/// One pass over a MustGatherService: claim, deployment, pod report,
/// service, ingress. The first failure ends the pass.
pub async fn reconcile<S: ObjectStore>(
    store: &S,
    images: &OperandImages,
    namespace: &str,
    name: &str,
) -> Result<Vec<Change>> {
    let Some(mut mgs) = fetch_parent::<S, MustGatherService>(store, namespace, name).await? else {
        return Ok(Vec::new());
    };
    let owner = owner_ref(&mgs)?;
    let mut changes = Vec::new();

    let default_class = storage_class(store, &mgs, namespace).await?;
    changes.push(
        converge(store, &owner, must_gather_pvc(&mgs, &default_class)?)
            .await?
            .change(),
    );
    changes.push(
        converge(store, &owner, must_gather_deployment(&mgs, images)?)
            .await?
            .change(),
    );
    let selector = must_gather_labels(&mgs);
    report_pods(
        store,
        &mut mgs,
        &selector,
        MustGatherService::must_gather_service_nodes,
    )
    .await?;
    changes.push(converge(store, &owner, must_gather_service(&mgs)?).await?.change());
    changes.push(converge(store, &owner, must_gather_ingress(&mgs)?).await?.change());

    debug!("MustGatherService {namespace}/{name} reconciled");
    Ok(changes)
}
