use crate::builder::gather_config_map;
use crate::controller::fetch_parent;
use crate::converge::{Change, converge, owner_ref};
use crate::crd::MustGatherConfig;
use crate::store::ObjectStore;
use crate::Result;

/// Publish the gather configuration as a config map of the same name.
/// The config map is created once; later edits to the resource are not
/// propagated.
pub async fn reconcile<S: ObjectStore>(
    store: &S,
    namespace: &str,
    name: &str,
) -> Result<Vec<Change>> {
    let Some(cfg) = fetch_parent::<S, MustGatherConfig>(store, namespace, name).await? else {
        return Ok(Vec::new());
    };
    let owner = owner_ref(&cfg)?;
    let converged = converge(store, &owner, gather_config_map(&cfg)?).await?;
    Ok(vec![converged.change()])
}
