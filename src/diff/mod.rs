//! Classification of module changes between two versions of a flow.
//!
//! [`compute_module_diff`] compares a before and an after flow by module id and produces two
//! action maps, one describing the before side and one the after side. [`build_flow_timeline`]
//! combines that with the merged flow (see [`merge`]) into everything a reviewer needs.

pub mod merge;
pub mod position;

use crate::flow::FlowValue;
use crate::locate::module_location_index;
use crate::walker;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

pub use merge::{
    find_module_in_flow, insert_module_into_flow, reconstruct_merged_flow, remove_module_from_flow,
};
pub use position::best_insert_index;

/// Prepended to the id of a restored module whose id is taken in the merged flow.
pub const DUPLICATE_MODULE_PREFIX: &str = "old__";

/// Prepended to the id of a current module that has to make room for a rejected removal.
pub const NEW_MODULE_PREFIX: &str = "new__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleAction {
    Added,
    Modified,
    Removed,
    /// A removal that the caller wants rendered apart from outright removals.
    Shadowed,
}

impl ModuleAction {
    /// Removed and shadowed entries both describe a module that only exists in the before flow.
    pub fn is_removal(&self) -> bool {
        matches!(self, ModuleAction::Removed | ModuleAction::Shadowed)
    }
}

impl fmt::Display for ModuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleAction::Added => "added",
            ModuleAction::Modified => "modified",
            ModuleAction::Removed => "removed",
            ModuleAction::Shadowed => "shadowed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleActionInfo {
    pub action: ModuleAction,
    /// Whether the change still awaits an accept or reject decision.
    pub pending: bool,
}

impl ModuleActionInfo {
    pub fn new(action: ModuleAction, pending: bool) -> Self {
        Self { action, pending }
    }
}

/// Module id to action. An unchanged module has no entry.
pub type ModuleActions = BTreeMap<String, ModuleActionInfo>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Flag every produced action as pending.
    pub mark_as_pending: bool,
    /// Keep `shadowed` in the after-side actions instead of folding it into `removed`.
    pub mark_removed_as_shadowed: bool,
}

/// Both action maps together with the merged flow they describe.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowTimeline {
    pub before_actions: ModuleActions,
    /// Display-adjusted actions keyed by ids of the merged flow.
    pub after_actions: ModuleActions,
    /// The after flow with every removed module restored at its original position.
    pub merged_flow: FlowValue,
}

/// Classifies every module id of `before` and `after`.
///
/// Returns `(before_actions, after_actions)`. A module that changed container or variant is
/// reported as removed on the before side and added on the after side; it is never
/// `modified`. Removed modules get a `shadowed` placeholder on the after side.
pub fn compute_module_diff(
    before: &FlowValue,
    after: &FlowValue,
    options: DiffOptions,
) -> (ModuleActions, ModuleActions) {
    let before_index = module_location_index(before);
    let after_index = module_location_index(after);
    let info = |action| ModuleActionInfo::new(action, options.mark_as_pending);

    let mut before_actions = ModuleActions::new();
    let mut after_actions = ModuleActions::new();

    let ids = before_index
        .keys()
        .chain(after_index.keys())
        .copied()
        .unique();

    for id in ids {
        match (before_index.get(id), after_index.get(id)) {
            (None, Some(_)) => {
                after_actions.insert(id.to_string(), info(ModuleAction::Added));
            }
            (Some(_), None) => {
                before_actions.insert(id.to_string(), info(ModuleAction::Removed));
                after_actions.insert(id.to_string(), info(ModuleAction::Shadowed));
            }
            (Some((old, old_location)), Some((new, new_location))) => {
                if !old_location.same_container(new_location) || old.kind() != new.kind() {
                    before_actions.insert(id.to_string(), info(ModuleAction::Removed));
                    after_actions.insert(id.to_string(), info(ModuleAction::Added));
                } else if !old.content_eq(new) {
                    before_actions.insert(id.to_string(), info(ModuleAction::Modified));
                    after_actions.insert(id.to_string(), info(ModuleAction::Modified));
                }
            }
            (None, None) => {}
        }
    }

    debug!(
        before = before_actions.len(),
        after = after_actions.len(),
        "Computed module diff"
    );
    (before_actions, after_actions)
}

/// Rewrites after-side actions for presentation against `merged_flow`.
///
/// Unless shadowed display is requested, `shadowed` becomes `removed`. Every merged id that
/// carries [`DUPLICATE_MODULE_PREFIX`] and whose real id was removed gets an entry of its own,
/// so the restored copy can be told apart from its replacement. A removal the merged flow
/// could not restore is left out, so every entry names a module of `merged_flow`.
pub fn adjust_actions_for_display(
    after_actions: &ModuleActions,
    before_actions: &ModuleActions,
    mark_removed_as_shadowed: bool,
    merged_flow: &FlowValue,
) -> ModuleActions {
    let removal = if mark_removed_as_shadowed {
        ModuleAction::Shadowed
    } else {
        ModuleAction::Removed
    };

    let mut adjusted: ModuleActions = after_actions
        .iter()
        .map(|(id, info)| {
            let info = match info.action {
                ModuleAction::Shadowed => ModuleActionInfo::new(removal, info.pending),
                _ => *info,
            };
            (id.clone(), info)
        })
        .collect();

    let merged_ids = walker::all_module_ids(merged_flow);
    adjusted.retain(|id, info| !info.action.is_removal() || merged_ids.contains(id));

    for id in merged_ids {
        if adjusted.contains_key(&id) {
            continue;
        }
        let Some(real_id) = id.strip_prefix(DUPLICATE_MODULE_PREFIX) else {
            continue;
        };
        match before_actions.get(real_id) {
            Some(original) if original.action == ModuleAction::Removed => {
                adjusted.insert(id.clone(), ModuleActionInfo::new(removal, original.pending));
            }
            _ => {}
        }
    }

    adjusted
}

/// Runs the full pipeline: diff, merge reconstruction and display adjustment.
pub fn build_flow_timeline(before: &FlowValue, after: &FlowValue, options: DiffOptions) -> FlowTimeline {
    let (before_actions, after_actions) = compute_module_diff(before, after, options);
    let merged_flow = reconstruct_merged_flow(before, after, &before_actions);
    let after_actions = adjust_actions_for_display(
        &after_actions,
        &before_actions,
        options.mark_removed_as_shadowed,
        &merged_flow,
    );

    FlowTimeline {
        before_actions,
        after_actions,
        merged_flow,
    }
}

/// Deep comparison of two input schemas.
pub fn has_input_schema_changed(before: Option<&Value>, after: Option<&Value>) -> bool {
    before != after
}
