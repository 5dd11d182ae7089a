use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{ResourceExt, runtime::controller::Action};
use std::sync::Arc;
use tracing::*;

use crate::config::OperandImages;
use crate::crd::MustGatherService;
use crate::events_helper::{emit_changes, emit_warning};
use crate::{Error, Result};

crate::controller_scaffold! {
    controller_ty: MustGatherService,
    reporter: "mustgatherservice-controller",
    run_fn: run_must_gather_service,
    reconcile_fn: reconcile_must_gather_service,
    error_policy_fn: must_gather_service_error_policy,
    owns: [PersistentVolumeClaim, Deployment, Service, Ingress],
    preflight: |api: kube::Api<MustGatherService>| async move {
        if let Err(e) = api.list(&kube::api::ListParams::default().limit(1)).await {
            error!("MustGatherService CRD is not queryable; {e:?}. Is the CRD installed?");
            info!("Installation: gencrd --output - | kubectl apply -f -");
            std::process::exit(1);
        }
    }
}

async fn reconcile_must_gather_service(
    mgs: Arc<MustGatherService>,
    ctx: Arc<Context>,
) -> Result<Action> {
    let ns = mgs
        .namespace()
        .ok_or_else(|| Error::MissingField("metadata.namespace".into()))?;
    info!("Reconciling MustGatherService \"{}\" in {}", mgs.name_any(), ns);

    let images = OperandImages::from_env();
    let res = super::reconcile(&ctx.store, &images, &ns, &mgs.name_any()).await;
    ctx.state.record(REPORTER, res.is_ok()).await;
    match res {
        Ok(changes) => {
            emit_changes(&ctx.recorder, mgs.as_ref(), &changes).await;
            Ok(Action::await_change())
        }
        Err(e) => {
            emit_warning(&ctx.recorder, mgs.as_ref(), "ReconcileFailed", "Reconcile", e.to_string())
                .await;
            Err(e)
        }
    }
}
