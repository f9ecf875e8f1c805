//! Stateful review of the changes between a before snapshot and the current flow.
//!
//! A [`DiffSession`] holds the before snapshot, the current (after) flow, the merged flow and
//! the action map. Every setter and every applied command recomputes the latter two, so the
//! session never exposes stale results.
//!
//! ```rust,no_run
//! use flowdiff::prelude::*;
//!
//! # fn run(before: FlowValue, after: FlowValue) -> Result<()> {
//! let mut session = DiffSession::builder().edit_mode(true).build();
//! session.set_before_flow(before)?;
//! session.set_current_flow(after)?;
//!
//! for (id, info) in session.module_actions() {
//!     println!("{}: {}", id, info.action);
//! }
//! session.accept_all()?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod reconcile;

pub use builder::SessionBuilder;

use crate::diff::{
    DiffOptions, ModuleAction, ModuleActionInfo, ModuleActions, build_flow_timeline,
    has_input_schema_changed,
};
use crate::error::SessionError;
use crate::flow::FlowValue;
use serde_json::Value;
use tracing::{debug, info};

/// Pseudo module id under which a change of the flow input schema is reported.
pub const INPUT_SCHEMA_ID: &str = "__input_schema__";

/// Result of a command that ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The flows were changed and the diff recomputed.
    Applied,
    /// The id carries no action, so there was nothing to do.
    NoAction,
    /// The module, or the container it belongs in, could not be located.
    NotFound,
}

#[derive(Debug, Clone)]
pub struct DiffSession {
    before: Option<FlowValue>,
    current: Option<FlowValue>,
    merged: Option<FlowValue>,
    current_input_schema: Option<Value>,
    edit_mode: bool,
    mark_removed_as_shadowed: bool,
    auto_clear: bool,
    module_actions: ModuleActions,
    before_actions: ModuleActions,
}

impl Default for DiffSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffSession {
    pub fn new() -> Self {
        SessionBuilder::new().build()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Stores the snapshot the current flow is compared against.
    pub fn set_before_flow(&mut self, flow: FlowValue) -> Result<(), SessionError> {
        flow.validate()?;
        self.before = Some(flow);
        self.recompute();
        Ok(())
    }

    pub fn set_current_flow(&mut self, flow: FlowValue) -> Result<(), SessionError> {
        flow.validate()?;
        self.current = Some(flow);
        self.recompute();
        Ok(())
    }

    /// Sets the input schema of the current flow. Schema changes are only tracked while one
    /// is set.
    pub fn set_current_input_schema(&mut self, schema: Option<Value>) {
        self.current_input_schema = schema;
        self.recompute();
    }

    pub fn set_edit_mode(&mut self, enabled: bool) {
        self.edit_mode = enabled;
        self.recompute();
    }

    pub fn set_mark_removed_as_shadowed(&mut self, enabled: bool) {
        self.mark_removed_as_shadowed = enabled;
        self.recompute();
    }

    pub fn before_flow(&self) -> Option<&FlowValue> {
        self.before.as_ref()
    }

    pub fn current_flow(&self) -> Option<&FlowValue> {
        self.current.as_ref()
    }

    /// Consumes the session and hands back the current flow.
    pub fn into_current_flow(self) -> Option<FlowValue> {
        self.current
    }

    pub fn merged_flow(&self) -> Option<&FlowValue> {
        self.merged.as_ref()
    }

    /// Display-adjusted actions keyed by ids of the merged flow.
    pub fn module_actions(&self) -> &ModuleActions {
        &self.module_actions
    }

    pub fn before_actions(&self) -> &ModuleActions {
        &self.before_actions
    }

    pub fn current_input_schema(&self) -> Option<&Value> {
        self.current_input_schema.as_ref()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.module_actions.values().any(|info| info.pending)
    }

    pub fn is_diffing(&self) -> bool {
        self.before.is_some() && self.current.is_some()
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn mark_removed_as_shadowed(&self) -> bool {
        self.mark_removed_as_shadowed
    }

    /// Drops every flow and action.
    pub fn clear_snapshot(&mut self) {
        self.current = None;
        self.drop_snapshot();
        info!("Snapshot cleared");
    }

    /// Ends the review by handing back `snapshot`, or the before snapshot when `None`, as the
    /// caller's replacement for the current flow. The session is cleared afterwards.
    pub fn revert_to_snapshot(
        &mut self,
        snapshot: Option<FlowValue>,
    ) -> Result<FlowValue, SessionError> {
        let target = match snapshot.or_else(|| self.before.take()) {
            Some(flow) => flow,
            None => {
                return Err(SessionError::MissingSnapshot {
                    operation: "revert to snapshot",
                });
            }
        };
        self.current = None;
        self.drop_snapshot();
        info!(modules = target.modules.len(), "Reverted to snapshot");
        Ok(target)
    }

    fn drop_snapshot(&mut self) {
        self.before = None;
        self.merged = None;
        self.current_input_schema = None;
        self.module_actions.clear();
        self.before_actions.clear();
    }

    pub(crate) fn recompute(&mut self) {
        let (Some(before), Some(current)) = (&self.before, &self.current) else {
            self.merged = None;
            self.module_actions.clear();
            self.before_actions.clear();
            return;
        };

        let options = DiffOptions {
            mark_as_pending: self.edit_mode,
            mark_removed_as_shadowed: self.mark_removed_as_shadowed,
        };
        let timeline = build_flow_timeline(before, current, options);

        let mut actions = timeline.after_actions;
        let schema_changed = self
            .current_input_schema
            .as_ref()
            .is_some_and(|schema| has_input_schema_changed(before.schema.as_ref(), Some(schema)));
        if schema_changed {
            actions.insert(
                INPUT_SCHEMA_ID.to_string(),
                ModuleActionInfo::new(ModuleAction::Modified, self.edit_mode),
            );
        }

        debug!(
            actions = actions.len(),
            pending = actions.values().filter(|info| info.pending).count(),
            "Recomputed flow diff"
        );

        self.merged = Some(timeline.merged_flow);
        self.before_actions = timeline.before_actions;
        self.module_actions = actions;

        if self.module_actions.is_empty() && self.auto_clear {
            // The current flow stays available to the caller.
            self.drop_snapshot();
            info!("No changes left, snapshot cleared");
        }
    }
}
