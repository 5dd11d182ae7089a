use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::*;

use crate::config::{Settings, TemplateSource};
use crate::store::{Object, ObjectStore};
use crate::Result;

/// Per-controller counters served on `/`
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    pub reconciles: u64,
    pub failures: u64,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
            reconciles: 0,
            failures: 0,
        }
    }
}

/// State shared by every controller and the HTTP server
#[derive(Clone)]
pub struct State {
    diagnostics: Arc<RwLock<BTreeMap<String, Diagnostics>>>,
    pub settings: Settings,
    pub templates: Arc<dyn TemplateSource>,
}

impl State {
    pub fn new(settings: Settings, templates: Arc<dyn TemplateSource>) -> Self {
        Self {
            diagnostics: Arc::default(),
            settings,
            templates,
        }
    }

    pub async fn diagnostics(&self) -> BTreeMap<String, Diagnostics> {
        self.diagnostics.read().await.clone()
    }

    /// Count one reconcile pass of `reporter`
    pub async fn record(&self, reporter: &str, ok: bool) {
        let mut diagnostics = self.diagnostics.write().await;
        let entry = diagnostics.entry(reporter.to_string()).or_default();
        entry.last_event = Utc::now();
        entry.reconciles += 1;
        if !ok {
            entry.failures += 1;
        }
    }
}

/// Re-read the parent being reconciled.
///
/// `None` means it was deleted after the trigger fired; owned children are
/// left to the garbage collector.
pub async fn fetch_parent<S, P>(store: &S, namespace: &str, name: &str) -> Result<Option<P>>
where
    S: ObjectStore,
    P: Object,
{
    match store.get::<P>(namespace, name).await {
        Ok(parent) => Ok(Some(parent)),
        Err(e) if e.is_not_found() => {
            info!("{} {namespace}/{name} is gone, nothing to do", P::kind(&()));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticTemplates;

    #[tokio::test]
    async fn record_counts_failures() {
        let state = State::new(Settings::default(), Arc::new(StaticTemplates::default()));
        state.record("hs", true).await;
        state.record("hs", false).await;
        let d = state.diagnostics().await;
        assert_eq!(d["hs"].reconciles, 2);
        assert_eq!(d["hs"].failures, 1);
    }
}
