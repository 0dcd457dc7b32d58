//! Pre-dispatch screening of merge-request events.
//!
//! Decides, before any 202 is sent, whether an event gets a pipeline run
//! or a "skipped" answer.

use super::payload::MergeRequestEvent;

/// Actions that trigger a review.
const PROCESSABLE_ACTIONS: &[&str] = &["open", "update", "reopen"];

/// Decision for a validated merge-request event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Dispatch the pipeline for this iid.
    Process,
    /// Answer 200 with the reason; no pipeline run.
    Skip(String),
}

/// Applies the event-level skip rules: action, MR state, draft flag, and
/// the configured-project match (by numeric id or full path).
pub fn screen_event(event: &MergeRequestEvent, configured_project: &str) -> Screen {
    let attrs = &event.object_attributes;

    if !PROCESSABLE_ACTIONS.contains(&attrs.action.as_str()) {
        return Screen::Skip(format!(
            "action '{}' is not processed (only: open, update, reopen)",
            attrs.action
        ));
    }
    if attrs.state != "opened" {
        return Screen::Skip(format!(
            "MR state is '{}'; only opened MRs are processed",
            attrs.state
        ));
    }
    if attrs.draft || attrs.work_in_progress {
        return Screen::Skip("draft/WIP MRs are not processed".into());
    }

    let event_project = event.project.id.to_string();
    let path_matches = event.project.path_with_namespace.as_deref() == Some(configured_project);
    if event_project != configured_project && !path_matches {
        return Screen::Skip(format!(
            "project mismatch: event({event_project}) != configured({configured_project})"
        ));
    }

    Screen::Process
}
