use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{ResourceExt, runtime::controller::Action};
use std::sync::Arc;
use tracing::*;

use crate::config::OperandImages;
use crate::crd::HealthService;
use crate::events_helper::{emit_changes, emit_warning};
use crate::{Error, Result};

crate::controller_scaffold! {
    controller_ty: HealthService,
    reporter: "healthservice-controller",
    run_fn: run_health,
    reconcile_fn: reconcile_health,
    error_policy_fn: health_error_policy,
    owns: [Deployment, StatefulSet, Service, ConfigMap, Ingress],
    preflight: |api: kube::Api<HealthService>| async move {
        if let Err(e) = api.list(&kube::api::ListParams::default().limit(1)).await {
            error!("HealthService CRD is not queryable; {e:?}. Is the CRD installed?");
            info!("Installation: gencrd --output - | kubectl apply -f -");
            std::process::exit(1);
        }
    }
}

async fn reconcile_health(hs: Arc<HealthService>, ctx: Arc<Context>) -> Result<Action> {
    let ns = hs
        .namespace()
        .ok_or_else(|| Error::MissingField("metadata.namespace".into()))?;
    info!("Reconciling HealthService \"{}\" in {}", hs.name_any(), ns);

    let images = OperandImages::from_env();
    let res = super::reconcile(
        &ctx.store,
        ctx.state.templates.as_ref(),
        &images,
        &ns,
        &hs.name_any(),
    )
    .await;
    ctx.state.record(REPORTER, res.is_ok()).await;
    match res {
        Ok(changes) => {
            emit_changes(&ctx.recorder, hs.as_ref(), &changes).await;
            Ok(Action::await_change())
        }
        Err(e) => {
            emit_warning(&ctx.recorder, hs.as_ref(), "ReconcileFailed", "Reconcile", e.to_string())
                .await;
            Err(e)
        }
    }
}
