use k8s_openapi::api::batch::v1::Job;
use kube::{ResourceExt, runtime::controller::Action};
use std::sync::Arc;
use tracing::*;

use crate::config::OperandImages;
use crate::crd::MustGatherJob;
use crate::events_helper::{emit_changes, emit_warning};
use crate::{Error, Result};

crate::controller_scaffold! {
    controller_ty: MustGatherJob,
    reporter: "mustgatherjob-controller",
    run_fn: run_must_gather_job,
    reconcile_fn: reconcile_must_gather_job,
    error_policy_fn: must_gather_job_error_policy,
    owns: [Job],
    preflight: |api: kube::Api<MustGatherJob>| async move {
        if let Err(e) = api.list(&kube::api::ListParams::default().limit(1)).await {
            error!("MustGatherJob CRD is not queryable; {e:?}. Is the CRD installed?");
            std::process::exit(1);
        }
    }
}

async fn reconcile_must_gather_job(job: Arc<MustGatherJob>, ctx: Arc<Context>) -> Result<Action> {
    let ns = job
        .namespace()
        .ok_or_else(|| Error::MissingField("metadata.namespace".into()))?;
    info!("Reconciling MustGatherJob \"{}\" in {}", job.name_any(), ns);

    let images = OperandImages::from_env();
    let res = super::reconcile(&ctx.store, &images, &ns, &job.name_any()).await;
    ctx.state.record(REPORTER, res.is_ok()).await;
    match res {
        Ok(changes) => {
            emit_changes(&ctx.recorder, job.as_ref(), &changes).await;
            Ok(Action::await_change())
        }
        Err(e) => {
            emit_warning(&ctx.recorder, job.as_ref(), "ReconcileFailed", "Reconcile", e.to_string())
                .await;
            Err(e)
        }
    }
}
