use kube::runtime::events::{Event, EventType, Recorder};
use kube::{Resource, ResourceExt};
use tracing::*;

use crate::converge::{Change, Outcome};

/// Publish a simple Normal event with given reason and note, ignoring errors.
pub async fn emit_info<R: Resource<DynamicType = ()> + ResourceExt>(
    recorder: &Recorder,
    obj: &R,
    reason: &str,
    action: &str,
    note: impl Into<Option<String>>,
) {
    publish(recorder, obj, EventType::Normal, reason, action, note.into()).await;
}

/// Publish a Warning event, ignoring errors.
pub async fn emit_warning<R: Resource<DynamicType = ()> + ResourceExt>(
    recorder: &Recorder,
    obj: &R,
    reason: &str,
    action: &str,
    note: impl Into<Option<String>>,
) {
    publish(recorder, obj, EventType::Warning, reason, action, note.into()).await;
}

/// One Normal event per child created during a pass. Updates happen on
/// every pass and are not announced.
pub async fn emit_changes<R: Resource<DynamicType = ()> + ResourceExt>(
    recorder: &Recorder,
    obj: &R,
    changes: &[Change],
) {
    for change in changes.iter().filter(|c| c.outcome == Outcome::Created) {
        emit_info(
            recorder,
            obj,
            "Created",
            "Reconcile",
            format!("Created {} {}", change.kind, change.name),
        )
        .await;
    }
}

async fn publish<R: Resource<DynamicType = ()> + ResourceExt>(
    recorder: &Recorder,
    obj: &R,
    type_: EventType,
    reason: &str,
    action: &str,
    note: Option<String>,
) {
    let res = recorder
        .publish(
            &Event {
                type_,
                reason: reason.into(),
                note,
                action: action.into(),
                secondary: None,
            },
            &obj.object_ref(&()),
        )
        .await;
    if let Err(e) = res {
        debug!("failed to publish event for {}: {e}", obj.name_any());
    }
}
