use k8s_openapi::api::core::v1::ConfigMap;
use kube::{ResourceExt, runtime::controller::Action};
use std::sync::Arc;
use tracing::*;

use crate::crd::MustGatherConfig;
use crate::events_helper::{emit_changes, emit_warning};
use crate::{Error, Result};

crate::controller_scaffold! {
    controller_ty: MustGatherConfig,
    reporter: "mustgatherconfig-controller",
    run_fn: run_must_gather_config,
    reconcile_fn: reconcile_must_gather_config,
    error_policy_fn: must_gather_config_error_policy,
    owns: [ConfigMap],
    preflight: |api: kube::Api<MustGatherConfig>| async move {
        if let Err(e) = api.list(&kube::api::ListParams::default().limit(1)).await {
            error!("MustGatherConfig CRD is not queryable; {e:?}. Is the CRD installed?");
            std::process::exit(1);
        }
    }
}

async fn reconcile_must_gather_config(
    cfg: Arc<MustGatherConfig>,
    ctx: Arc<Context>,
) -> Result<Action> {
    let ns = cfg
        .namespace()
        .ok_or_else(|| Error::MissingField("metadata.namespace".into()))?;
    debug!("Reconciling MustGatherConfig \"{}\" in {}", cfg.name_any(), ns);

    let res = super::reconcile(&ctx.store, &ns, &cfg.name_any()).await;
    ctx.state.record(REPORTER, res.is_ok()).await;
    match res {
        Ok(changes) => {
            emit_changes(&ctx.recorder, cfg.as_ref(), &changes).await;
            Ok(Action::await_change())
        }
        Err(e) => {
            emit_warning(&ctx.recorder, cfg.as_ref(), "ReconcileFailed", "Reconcile", e.to_string())
                .await;
            Err(e)
        }
    }
}
