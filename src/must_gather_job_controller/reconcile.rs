use crate::builder::must_gather_job;
use crate::config::OperandImages;
use crate::controller::fetch_parent;
use crate::converge::{Change, converge, owner_ref};
use crate::crd::MustGatherJob;
use crate::store::ObjectStore;
use crate::Result;

/// Create the collection Job once. An existing Job is never touched, so a
/// finished run stays in place until the MustGatherJob is deleted.
pub async fn reconcile<S: ObjectStore>(
    store: &S,
    images: &OperandImages,
    namespace: &str,
    name: &str,
) -> Result<Vec<Change>> {
    let Some(job) = fetch_parent::<S, MustGatherJob>(store, namespace, name).await? else {
        return Ok(Vec::new());
    };
    let owner = owner_ref(&job)?;
    let converged = converge(store, &owner, must_gather_job(&job, images)?).await?;
    Ok(vec![converged.change()])
}
