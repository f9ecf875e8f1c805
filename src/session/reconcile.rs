use super::{DiffSession, INPUT_SCHEMA_ID, Outcome};
use crate::diff::merge::{SpecialSlot, insert_at, remove_module_at};
use crate::diff::{
    DUPLICATE_MODULE_PREFIX, ModuleAction, NEW_MODULE_PREFIX, insert_module_into_flow,
    remove_module_from_flow,
};
use crate::error::SessionError;
use crate::flow::{FlowModule, FlowValue};
use crate::locate::{self, ParentLocation};
use crate::walker;
use tracing::{debug, warn};

/// Upper bound on passes of `accept_all` / `reject_all`. A pass can surface follow-up actions,
/// such as a renamed `new__` module after a rejected type change.
const MAX_RESOLVE_PASSES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Accept,
    Reject,
}

impl DiffSession {
    /// Folds the change recorded for `id` into the before snapshot.
    pub fn accept_module(&mut self, id: &str) -> Result<Outcome, SessionError> {
        let outcome = self.apply_accept(id)?;
        self.finish(id, "accept", outcome);
        Ok(outcome)
    }

    /// Reverts the change recorded for `id` in the current flow.
    pub fn reject_module(&mut self, id: &str) -> Result<Outcome, SessionError> {
        let outcome = self.apply_reject(id)?;
        self.finish(id, "reject", outcome);
        Ok(outcome)
    }

    /// Accepts every pending change, in ascending id order.
    pub fn accept_all(&mut self) -> Result<Outcome, SessionError> {
        self.require_snapshot("accept all changes")?;
        self.resolve_all(Resolution::Accept)
    }

    /// Rejects every pending change, in descending id order.
    pub fn reject_all(&mut self) -> Result<Outcome, SessionError> {
        self.require_snapshot("reject all changes")?;
        self.resolve_all(Resolution::Reject)
    }

    fn resolve_all(&mut self, resolution: Resolution) -> Result<Outcome, SessionError> {
        let mut outcome = Outcome::NoAction;

        for _ in 0..MAX_RESOLVE_PASSES {
            let mut ids: Vec<String> = self
                .module_actions
                .iter()
                .filter(|(_, info)| info.pending)
                .map(|(id, _)| id.clone())
                .collect();
            if ids.is_empty() {
                break;
            }
            if resolution == Resolution::Reject {
                ids.reverse();
            }

            let mut progressed = false;
            for id in &ids {
                let still_pending = self.module_actions.get(id).is_some_and(|info| info.pending);
                if !still_pending {
                    continue;
                }
                let outcome = match resolution {
                    Resolution::Accept => self.accept_module(id)?,
                    Resolution::Reject => self.reject_module(id)?,
                };
                progressed |= outcome == Outcome::Applied;
            }
            if !progressed {
                break;
            }
            outcome = Outcome::Applied;
        }

        Ok(outcome)
    }

    fn require_snapshot(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.before.is_none() {
            return Err(SessionError::MissingSnapshot { operation });
        }
        if self.current.is_none() {
            return Err(SessionError::MissingCurrentFlow { operation });
        }
        Ok(())
    }

    fn finish(&mut self, id: &str, command: &str, outcome: Outcome) {
        match outcome {
            Outcome::Applied => {
                debug!(id, command, "Change resolved");
                self.recompute();
            }
            Outcome::NotFound => warn!(id, command, "Module could not be located, nothing changed"),
            Outcome::NoAction => debug!(id, command, "No action recorded for module"),
        }
    }

    fn apply_accept(&mut self, id: &str) -> Result<Outcome, SessionError> {
        self.require_snapshot("accept a module")?;
        let Some(info) = self.module_actions.get(id).copied() else {
            return Ok(Outcome::NoAction);
        };
        let (Some(before), Some(current)) = (self.before.as_mut(), self.current.as_ref()) else {
            return Err(SessionError::MissingSnapshot {
                operation: "accept a module",
            });
        };

        if id == INPUT_SCHEMA_ID {
            before.schema = self.current_input_schema.clone();
            return Ok(Outcome::Applied);
        }

        let real_id = strip_duplicate_prefix(id);
        let outcome = match info.action {
            ModuleAction::Removed | ModuleAction::Shadowed => accept_removal(before, current, real_id),
            ModuleAction::Added => accept_addition(before, current, real_id, false),
            ModuleAction::Modified => overwrite_module(before, current, real_id),
        };
        Ok(outcome)
    }

    fn apply_reject(&mut self, id: &str) -> Result<Outcome, SessionError> {
        self.require_snapshot("reject a module")?;
        let Some(info) = self.module_actions.get(id).copied() else {
            return Ok(Outcome::NoAction);
        };
        let (Some(before), Some(current)) = (self.before.as_ref(), self.current.as_mut()) else {
            return Err(SessionError::MissingSnapshot {
                operation: "reject a module",
            });
        };

        if id == INPUT_SCHEMA_ID {
            current.schema = before.schema.clone();
            self.current_input_schema = before.schema.clone();
            return Ok(Outcome::Applied);
        }

        let real_id = strip_duplicate_prefix(id);
        let outcome = match info.action {
            ModuleAction::Added => match remove_module_from_flow(current, real_id) {
                Some(_) => Outcome::Applied,
                None => Outcome::NotFound,
            },
            ModuleAction::Removed | ModuleAction::Shadowed => restore_removal(current, before, real_id),
            ModuleAction::Modified => overwrite_module(current, before, real_id),
        };
        Ok(outcome)
    }
}

fn strip_duplicate_prefix(id: &str) -> &str {
    id.strip_prefix(DUPLICATE_MODULE_PREFIX).unwrap_or(id)
}

/// Deletes the before-side copy of a removed module, preferring one outside the module's
/// current container.
fn accept_removal(before: &mut FlowValue, current: &FlowValue, id: &str) -> Outcome {
    let locations = locate::find_module_locations(before, id);
    let current_location = locate::find_module_parent(current, id);

    let stale = locations
        .iter()
        .find(|location| {
            current_location
                .as_ref()
                .is_some_and(|now| !location.same_container(now))
        })
        .or(locations.first());

    match stale.and_then(|location| remove_module_at(before, id, location)) {
        Some(_) => Outcome::Applied,
        None => Outcome::NotFound,
    }
}

/// Copies an added module from the current flow into the before flow. A container missing
/// from the before flow is accepted first as a skeleton, so its other children stay pending.
fn accept_addition(before: &mut FlowValue, current: &FlowValue, id: &str, skeleton: bool) -> Outcome {
    let (Some(module), Some(location)) = (
        locate::find_module(current, id),
        locate::find_module_parent(current, id),
    ) else {
        return Outcome::NotFound;
    };

    let missing_parent = location
        .parent_id()
        .filter(|parent_id| !before.contains(parent_id));
    if let Some(parent_id) = missing_parent {
        debug!(id, parent_id, "Accepting container skeleton first");
        if accept_addition(before, current, parent_id, true) != Outcome::Applied {
            return Outcome::NotFound;
        }
    }

    let placed = if skeleton {
        module.skeleton()
    } else {
        module.clone()
    };

    let Some(stale) = stale_copies(before, &placed, &location) else {
        debug!(id, %location, "Destination container sits inside a copy that would be dropped");
        return Outcome::NotFound;
    };
    drop_copies(before, stale);

    if let Some(existing) = entry_in_container(before, &location, id) {
        *existing = placed;
        return Outcome::Applied;
    }
    if insert_module_into_flow(before, placed, current, id) {
        Outcome::Applied
    } else {
        Outcome::NotFound
    }
}

/// The module with `id` inside the container `location` names, resolved in `flow`.
fn entry_in_container<'a>(
    flow: &'a mut FlowValue,
    location: &ParentLocation,
    id: &str,
) -> Option<&'a mut FlowModule> {
    let list = match location {
        ParentLocation::Failure => return flow.failure_module.as_deref_mut().filter(|m| m.id == id),
        ParentLocation::Preprocessor => {
            return flow.preprocessor_module.as_deref_mut().filter(|m| m.id == id);
        }
        ParentLocation::Root { .. } => &mut flow.modules,
        nested => {
            let parent = locate::find_module_mut(flow, nested.parent_id()?)?;
            parent.value.child_list_mut(nested.slot()?, None)?
        }
    };
    list.iter_mut().find(|m| m.id == id)
}

/// Replaces the module `id` in `target` with its counterpart from `source`. Children the
/// replacement brings along are dropped from wherever else `target` holds them.
fn overwrite_module(target: &mut FlowValue, source: &FlowValue, id: &str) -> Outcome {
    let (Some(replacement), Some(location)) = (
        locate::find_module(source, id),
        locate::find_module_parent(target, id),
    ) else {
        return Outcome::NotFound;
    };

    let Some(stale) = stale_copies(target, replacement, &location) else {
        debug!(id, %location, "Module sits inside a copy that would be dropped");
        return Outcome::NotFound;
    };
    drop_copies(target, stale);

    match target.module_mut(id) {
        Some(existing) => {
            *existing = replacement.clone();
            Outcome::Applied
        }
        None => Outcome::NotFound,
    }
}

/// Occurrences in `flow` of every id in `placed`'s subtree, except the entry `placed` will
/// overwrite inside `destination`'s container. `None` when one of them encloses that
/// container.
fn stale_copies(
    flow: &FlowValue,
    placed: &FlowModule,
    destination: &ParentLocation,
) -> Option<Vec<(String, ParentLocation)>> {
    let mut stale = Vec::new();

    for (position, id) in walker::subtree_ids(placed).into_iter().enumerate() {
        for location in locate::find_module_locations(flow, id) {
            if position == 0 && location.same_container(destination) {
                continue;
            }
            let encloses = destination.parent_id().is_some_and(|parent_id| {
                module_at(flow, &location, id)
                    .is_some_and(|m| walker::subtree_ids(m).contains(&parent_id))
            });
            if encloses {
                return None;
            }
            stale.push((id.to_string(), location));
        }
    }

    Some(stale)
}

fn drop_copies(flow: &mut FlowValue, stale: Vec<(String, ParentLocation)>) {
    for (id, location) in stale {
        // Nested copies vanish with their enclosing copy.
        if remove_module_at(flow, &id, &location).is_some() {
            debug!(id = id.as_str(), %location, "Dropped stale copy");
        }
    }
}

fn module_at<'a>(flow: &'a FlowValue, location: &ParentLocation, id: &str) -> Option<&'a FlowModule> {
    match location {
        ParentLocation::Failure => flow.failure_module.as_deref(),
        ParentLocation::Preprocessor => flow.preprocessor_module.as_deref(),
        nested => locate::container_list(flow, nested)?.iter().find(|m| m.id == id),
    }
}

/// Puts the before-side copy of a removed module back into the current flow.
///
/// Current modules sharing an id with the restored subtree are renamed with
/// [`NEW_MODULE_PREFIX`] first so they can still be resolved on their own. Nothing changes
/// when the container to restore into is missing or would itself be renamed.
fn restore_removal(current: &mut FlowValue, before: &FlowValue, id: &str) -> Outcome {
    let (Some(original), Some(location)) = (
        locate::find_module(before, id),
        locate::find_module_parent(before, id),
    ) else {
        return Outcome::NotFound;
    };

    let colliding: Vec<&str> = walker::subtree_ids(original)
        .into_iter()
        .filter(|other| current.contains(other))
        .collect();

    if let Some(parent_id) = location.parent_id() {
        if !current.contains(parent_id) {
            debug!(id, parent_id, "Container no longer exists in current flow");
            return Outcome::NotFound;
        }
        let parent_renamed = colliding.iter().any(|other| {
            current
                .module(other)
                .is_some_and(|m| walker::subtree_ids(m).contains(&parent_id))
        });
        if parent_renamed {
            debug!(id, parent_id, "Container would be renamed by the restore");
            return Outcome::NotFound;
        }
    }

    // A colliding module nested in another colliding one is renamed along with it.
    let outermost: Vec<&str> = colliding
        .iter()
        .copied()
        .filter(|other| {
            !colliding.iter().any(|outer| {
                outer != other
                    && current
                        .module(outer)
                        .is_some_and(|m| walker::subtree_ids(m).contains(other))
            })
        })
        .collect();

    for other in outermost {
        if let Some(module) = current.module_mut(other) {
            debug!(id = other, "Renaming current module to make room");
            module.prefix_ids(NEW_MODULE_PREFIX);
        }
    }

    if insert_at(current, original.clone(), before, &location, SpecialSlot::Replace) {
        Outcome::Applied
    } else {
        Outcome::NotFound
    }
}
