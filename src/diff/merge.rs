use super::position::best_insert_index;
use super::{DUPLICATE_MODULE_PREFIX, ModuleActions};
use crate::flow::{FlowModule, FlowValue};
use crate::locate::{self, ParentLocation};
use crate::walker;
use ahash::AHashSet;
use tracing::{debug, warn};

/// What to do when a module is placed into an occupied failure or preprocessor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpecialSlot {
    Replace,
    KeepExisting,
}

/// Builds the merged flow: a copy of `after` with every module that `before_actions` marks
/// as removed put back where it used to be.
///
/// A removed module whose container is removed too comes back as part of that container.
/// Restored ids that already exist in the merged flow are renamed with
/// [`DUPLICATE_MODULE_PREFIX`]; the whole restored subtree when the module itself collides,
/// otherwise only the colliding descendants. An occupied special slot is left as is, and the
/// removed module it would have held gets no display action (see
/// [`adjust_actions_for_display`](super::adjust_actions_for_display)).
pub fn reconstruct_merged_flow(
    before: &FlowValue,
    after: &FlowValue,
    before_actions: &ModuleActions,
) -> FlowValue {
    let mut merged = after.clone();

    let removed: AHashSet<&str> = before_actions
        .iter()
        .filter(|(_, info)| info.action.is_removal())
        .map(|(id, _)| id.as_str())
        .collect();
    if removed.is_empty() {
        return merged;
    }

    let mut merged_ids = walker::all_module_ids(&merged);
    let mut seen = AHashSet::new();

    for (module, location) in locate::modules_with_locations(before) {
        if !removed.contains(module.id.as_str()) || !seen.insert(module.id.as_str()) {
            continue;
        }
        if location
            .parent_id()
            .is_some_and(|parent| removed.contains(parent))
        {
            continue;
        }
        if location.is_special() && special_slot(&merged, &location).is_some() {
            debug!(id = %module.id, "Special slot occupied, not restoring");
            continue;
        }

        let mut restored = module.clone();
        if merged_ids.contains(&restored.id) {
            restored.prefix_ids(DUPLICATE_MODULE_PREFIX);
        } else {
            prefix_colliding_descendants(&mut restored, &merged_ids);
        }
        merged_ids.extend(walker::subtree_ids(&restored).into_iter().map(String::from));

        if !insert_at(&mut merged, restored, before, &location, SpecialSlot::KeepExisting) {
            warn!(id = %module.id, %location, "Could not restore removed module");
        }
    }

    merged
}

fn prefix_colliding_descendants(module: &mut FlowModule, taken: &AHashSet<String>) {
    for (_, children) in module.value.child_lists_mut() {
        for child in children.iter_mut() {
            if taken.contains(&child.id) {
                child.prefix_ids(DUPLICATE_MODULE_PREFIX);
            } else {
                prefix_colliding_descendants(child, taken);
            }
        }
    }
}

fn special_slot<'a>(flow: &'a FlowValue, location: &ParentLocation) -> Option<&'a FlowModule> {
    match location {
        ParentLocation::Failure => flow.failure_module.as_deref(),
        ParentLocation::Preprocessor => flow.preprocessor_module.as_deref(),
        _ => None,
    }
}

/// Inserts `module` into `target` at the place `id` occupies in `source`.
///
/// The position among siblings is derived from `source`'s ordering (see
/// [`best_insert_index`]). A special slot is overwritten. Returns `false` when `id` is not
/// in `source` or its container is missing from `target`.
pub fn insert_module_into_flow(
    target: &mut FlowValue,
    module: FlowModule,
    source: &FlowValue,
    id: &str,
) -> bool {
    let Some(location) = locate::find_module_parent(source, id) else {
        warn!(id, "Module not found in source flow");
        return false;
    };
    insert_at(target, module, source, &location, SpecialSlot::Replace)
}

/// Places `module` into the container `location` names, resolving that container in
/// `target` and the sibling order in `source`.
pub(crate) fn insert_at(
    target: &mut FlowValue,
    module: FlowModule,
    source: &FlowValue,
    location: &ParentLocation,
    special: SpecialSlot,
) -> bool {
    let slot = match location {
        ParentLocation::Failure => &mut target.failure_module,
        ParentLocation::Preprocessor => &mut target.preprocessor_module,
        ParentLocation::Root { index } => {
            let at = best_insert_index(&target.modules, &source.modules, *index);
            target.modules.insert(at, module);
            return true;
        }
        nested => return insert_nested(target, module, source, nested),
    };

    if slot.is_some() && special == SpecialSlot::KeepExisting {
        return false;
    }
    *slot = Some(Box::new(module));
    true
}

fn insert_nested(
    target: &mut FlowValue,
    module: FlowModule,
    source: &FlowValue,
    location: &ParentLocation,
) -> bool {
    let (Some(parent_id), Some(slot), Some(index)) =
        (location.parent_id(), location.slot(), location.index())
    else {
        return false;
    };

    let Some(source_parent) = locate::find_module(source, parent_id) else {
        warn!(parent_id, "Container missing from source flow");
        return false;
    };
    let reference = source_parent.value.child_list(slot).unwrap_or_default();

    let Some(target_parent) = locate::find_module_mut(target, parent_id) else {
        warn!(parent_id, "Container missing from target flow");
        return false;
    };
    let Some(list) = target_parent
        .value
        .child_list_mut(slot, Some(&source_parent.value))
    else {
        warn!(parent_id, ?slot, "Container in target flow has no matching child list");
        return false;
    };

    let at = best_insert_index(list, reference, index);
    list.insert(at, module);
    true
}

/// Removes the first module with `id` from `flow` and returns it.
pub fn remove_module_from_flow(flow: &mut FlowValue, id: &str) -> Option<FlowModule> {
    let location = locate::find_module_parent(flow, id)?;
    remove_module_at(flow, id, &location)
}

/// Removes the module with `id` from the container `location` names.
pub(crate) fn remove_module_at(
    flow: &mut FlowValue,
    id: &str,
    location: &ParentLocation,
) -> Option<FlowModule> {
    let list = match location {
        ParentLocation::Failure => {
            return flow
                .failure_module
                .take_if(|m| m.id == id)
                .map(|m| *m);
        }
        ParentLocation::Preprocessor => {
            return flow
                .preprocessor_module
                .take_if(|m| m.id == id)
                .map(|m| *m);
        }
        ParentLocation::Root { .. } => &mut flow.modules,
        nested => {
            let parent = locate::find_module_mut(flow, nested.parent_id()?)?;
            parent.value.child_list_mut(nested.slot()?, None)?
        }
    };
    let at = list.iter().position(|m| m.id == id)?;
    Some(list.remove(at))
}

/// Finds a module by id anywhere in `flow`, special slots included.
pub fn find_module_in_flow<'a>(flow: &'a FlowValue, id: &str) -> Option<&'a FlowModule> {
    locate::find_module(flow, id)
}
