/// Generates the kube-runtime wiring shared by every controller: a
/// `Context`, an error policy and a `run` function watching the custom
/// resource plus every owned child kind.
#[macro_export]
macro_rules! controller_scaffold {
    (
        controller_ty: $resource:ty,
        reporter: $reporter:expr,
        run_fn: $run_fn:ident,
        reconcile_fn: $reconcile_fn:path,
        error_policy_fn: $error_policy_fn:ident,
        owns: [$($child:ty),* $(,)?]
        $(, preflight: $preflight:expr)?
    ) => {
        #[allow(unused_imports)]
        use futures::StreamExt;

        pub static REPORTER: &str = $reporter;

        #[derive(Clone)]
        pub struct Context {
            /// API access, every call bounded by the configured timeout
            pub store: $crate::store::KubeStore,
            /// Event recorder for publishing Kubernetes Events
            pub recorder: kube::runtime::events::Recorder,
            /// State shared with the HTTP server
            pub state: $crate::controller::State,
        }

        fn $error_policy_fn(
            obj: std::sync::Arc<$resource>,
            error: &$crate::Error,
            ctx: std::sync::Arc<Context>,
        ) -> kube::runtime::controller::Action {
            tracing::warn!(
                "reconcile of {} failed: {:?}",
                kube::ResourceExt::name_any(obj.as_ref()),
                error
            );
            kube::runtime::controller::Action::requeue(ctx.state.settings.error_requeue)
        }

        pub async fn $run_fn(client: kube::Client, state: $crate::controller::State) {
            let api: kube::Api<$resource> = kube::Api::all(client.clone());
            $( ($preflight)(api.clone()).await; )?
            let ctx = std::sync::Arc::new(Context {
                store: $crate::store::KubeStore::new(client.clone(), state.settings.api_timeout),
                recorder: kube::runtime::events::Recorder::new(client.clone(), REPORTER.into()),
                state,
            });
            kube::runtime::controller::Controller::new(
                api,
                kube::runtime::watcher::Config::default().any_semantic(),
            )
            $(
                .owns(
                    kube::Api::<$child>::all(client.clone()),
                    kube::runtime::watcher::Config::default(),
                )
            )*
            .shutdown_on_signal()
            .run($reconcile_fn, $error_policy_fn, ctx)
            .filter_map(async |x| std::result::Result::ok(x))
            .for_each(async |_| ())
            .await;
        }
    };
}
