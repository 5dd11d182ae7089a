use tracing::*;

use crate::builder::{
    health_config_map, health_deployment, health_ingress, health_labels, health_service,
    memcached_deployment, memcached_labels, memcached_service, memcached_stateful_set,
};
use crate::config::{OperandImages, TemplateSource};
use crate::controller::fetch_parent;
use crate::converge::{Change, converge, owner_ref};
use crate::crd::{HealthService, MemcachedWorkload};
use crate::status::report_pods;
use crate::store::ObjectStore;
use crate::Result;

/// One pass over a HealthService.
///
/// Children are converged in a fixed order and the first failure ends the
/// pass; whatever was written before it stays written. Pod names are
/// reported right after each workload is converged.
pub async fn reconcile<S: ObjectStore>(
    store: &S,
    templates: &dyn TemplateSource,
    images: &OperandImages,
    namespace: &str,
    name: &str,
) -> Result<Vec<Change>> {
    let Some(mut hs) = fetch_parent::<S, HealthService>(store, namespace, name).await? else {
        return Ok(Vec::new());
    };
    let owner = owner_ref(&hs)?;
    let mut changes = Vec::new();

    // memcached
    let converged = match hs.spec.memcached.workload {
        MemcachedWorkload::Deployment => {
            converge(store, &owner, memcached_deployment(&hs, images)?)
                .await?
                .change()
        }
        MemcachedWorkload::StatefulSet => {
            converge(store, &owner, memcached_stateful_set(&hs, images)?)
                .await?
                .change()
        }
    };
    changes.push(converged);
    let selector = memcached_labels(&hs);
    report_pods(store, &mut hs, &selector, HealthService::memcached_nodes).await?;
    changes.push(converge(store, &owner, memcached_service(&hs)?).await?.change());

    // health service
    changes.push(
        converge(store, &owner, health_config_map(&hs, templates)?)
            .await?
            .change(),
    );
    changes.push(
        converge(store, &owner, health_deployment(&hs, images)?)
            .await?
            .change(),
    );
    let selector = health_labels(&hs);
    report_pods(store, &mut hs, &selector, HealthService::health_check_nodes).await?;
    changes.push(converge(store, &owner, health_service(&hs)?).await?.change());
    changes.push(converge(store, &owner, health_ingress(&hs)?).await?.change());

    debug!("HealthService {namespace}/{name} reconciled");
    Ok(changes)
}
