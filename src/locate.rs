//! Structural lookup of modules inside a flow.

use crate::flow::{ChildSlot, FlowModule, FlowValue};
use ahash::AHashMap;
use std::fmt;

/// Where a module sits in a flow: the container list that holds it and its index there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentLocation {
    Root { index: usize },
    ForLoop { parent_id: String, index: usize },
    WhileLoop { parent_id: String, index: usize },
    BranchDefault { parent_id: String, index: usize },
    BranchArm { parent_id: String, branch_index: usize, index: usize },
    ParallelArm { parent_id: String, branch_index: usize, index: usize },
    AgentTools { parent_id: String, index: usize },
    Failure,
    Preprocessor,
}

impl ParentLocation {
    /// Builds the location of the `index`-th entry of `slot` inside container `parent_id`.
    pub fn nested(parent_id: &str, slot: ChildSlot, index: usize) -> Self {
        let parent_id = parent_id.to_string();
        match slot {
            ChildSlot::ForLoopBody => ParentLocation::ForLoop { parent_id, index },
            ChildSlot::WhileLoopBody => ParentLocation::WhileLoop { parent_id, index },
            ChildSlot::BranchDefault => ParentLocation::BranchDefault { parent_id, index },
            ChildSlot::BranchArm(branch_index) => ParentLocation::BranchArm {
                parent_id,
                branch_index,
                index,
            },
            ChildSlot::ParallelArm(branch_index) => ParentLocation::ParallelArm {
                parent_id,
                branch_index,
                index,
            },
            ChildSlot::AgentTools => ParentLocation::AgentTools { parent_id, index },
        }
    }

    /// Id of the enclosing container, `None` for root and special slots.
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            ParentLocation::ForLoop { parent_id, .. }
            | ParentLocation::WhileLoop { parent_id, .. }
            | ParentLocation::BranchDefault { parent_id, .. }
            | ParentLocation::BranchArm { parent_id, .. }
            | ParentLocation::ParallelArm { parent_id, .. }
            | ParentLocation::AgentTools { parent_id, .. } => Some(parent_id),
            ParentLocation::Root { .. } | ParentLocation::Failure | ParentLocation::Preprocessor => {
                None
            }
        }
    }

    /// Position within the holding list. Special slots have no index.
    pub fn index(&self) -> Option<usize> {
        match self {
            ParentLocation::Root { index }
            | ParentLocation::ForLoop { index, .. }
            | ParentLocation::WhileLoop { index, .. }
            | ParentLocation::BranchDefault { index, .. }
            | ParentLocation::BranchArm { index, .. }
            | ParentLocation::ParallelArm { index, .. }
            | ParentLocation::AgentTools { index, .. } => Some(*index),
            ParentLocation::Failure | ParentLocation::Preprocessor => None,
        }
    }

    /// The child slot of the parent container, for nested locations.
    pub fn slot(&self) -> Option<ChildSlot> {
        match self {
            ParentLocation::ForLoop { .. } => Some(ChildSlot::ForLoopBody),
            ParentLocation::WhileLoop { .. } => Some(ChildSlot::WhileLoopBody),
            ParentLocation::BranchDefault { .. } => Some(ChildSlot::BranchDefault),
            ParentLocation::BranchArm { branch_index, .. } => {
                Some(ChildSlot::BranchArm(*branch_index))
            }
            ParentLocation::ParallelArm { branch_index, .. } => {
                Some(ChildSlot::ParallelArm(*branch_index))
            }
            ParentLocation::AgentTools { .. } => Some(ChildSlot::AgentTools),
            ParentLocation::Root { .. } | ParentLocation::Failure | ParentLocation::Preprocessor => {
                None
            }
        }
    }

    pub fn is_special(&self) -> bool {
        matches!(self, ParentLocation::Failure | ParentLocation::Preprocessor)
    }

    /// True when both locations name the same holding list. The index is ignored, so a
    /// reordering within one list is not a change of container.
    pub fn same_container(&self, other: &ParentLocation) -> bool {
        match (self, other) {
            (ParentLocation::Root { .. }, ParentLocation::Root { .. })
            | (ParentLocation::Failure, ParentLocation::Failure)
            | (ParentLocation::Preprocessor, ParentLocation::Preprocessor) => true,
            _ => {
                self.parent_id().is_some()
                    && self.parent_id() == other.parent_id()
                    && self.slot() == other.slot()
            }
        }
    }
}

impl fmt::Display for ParentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentLocation::Root { index } => write!(f, "root[{}]", index),
            ParentLocation::ForLoop { parent_id, index } => {
                write!(f, "{}.modules[{}]", parent_id, index)
            }
            ParentLocation::WhileLoop { parent_id, index } => {
                write!(f, "{}.modules[{}]", parent_id, index)
            }
            ParentLocation::BranchDefault { parent_id, index } => {
                write!(f, "{}.default[{}]", parent_id, index)
            }
            ParentLocation::BranchArm {
                parent_id,
                branch_index,
                index,
            }
            | ParentLocation::ParallelArm {
                parent_id,
                branch_index,
                index,
            } => write!(f, "{}.branches[{}][{}]", parent_id, branch_index, index),
            ParentLocation::AgentTools { parent_id, index } => {
                write!(f, "{}.tools[{}]", parent_id, index)
            }
            ParentLocation::Failure => write!(f, "failure_module"),
            ParentLocation::Preprocessor => write!(f, "preprocessor_module"),
        }
    }
}

/// Finds where `id` lives in `flow`.
///
/// Special slots are checked first, then the root list, then every container in traversal
/// order. Within a container its direct children are checked before descending further.
pub fn find_module_parent(flow: &FlowValue, id: &str) -> Option<ParentLocation> {
    if flow.failure_module.as_ref().is_some_and(|m| m.id == id) {
        return Some(ParentLocation::Failure);
    }
    if flow.preprocessor_module.as_ref().is_some_and(|m| m.id == id) {
        return Some(ParentLocation::Preprocessor);
    }
    if let Some(index) = flow.modules.iter().position(|m| m.id == id) {
        return Some(ParentLocation::Root { index });
    }
    search_nested(&flow.modules, id)
}

fn search_nested(modules: &[FlowModule], id: &str) -> Option<ParentLocation> {
    for module in modules {
        for (slot, children) in module.value.child_lists() {
            if let Some(index) = children.iter().position(|m| m.id == id) {
                return Some(ParentLocation::nested(&module.id, slot, index));
            }
            if let Some(found) = search_nested(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Every location at which `id` occurs. A well-formed flow yields at most one entry.
pub fn find_module_locations(flow: &FlowValue, id: &str) -> Vec<ParentLocation> {
    modules_with_locations(flow)
        .into_iter()
        .filter(|(module, _)| module.id == id)
        .map(|(_, location)| location)
        .collect()
}

/// Every module of the flow paired with its location, in walker order.
pub fn modules_with_locations(flow: &FlowValue) -> Vec<(&FlowModule, ParentLocation)> {
    let mut out = Vec::new();
    for (index, module) in flow.modules.iter().enumerate() {
        out.push((module, ParentLocation::Root { index }));
        collect_nested(module, &mut out);
    }
    if let Some(failure) = &flow.failure_module {
        out.push((failure.as_ref(), ParentLocation::Failure));
    }
    if let Some(preprocessor) = &flow.preprocessor_module {
        out.push((preprocessor.as_ref(), ParentLocation::Preprocessor));
    }
    out
}

fn collect_nested<'a>(parent: &'a FlowModule, out: &mut Vec<(&'a FlowModule, ParentLocation)>) {
    for (slot, children) in parent.value.child_lists() {
        for (index, child) in children.iter().enumerate() {
            out.push((child, ParentLocation::nested(&parent.id, slot, index)));
            collect_nested(child, out);
        }
    }
}

/// Id-indexed view of [`modules_with_locations`]. The first occurrence of an id wins.
pub fn module_location_index(flow: &FlowValue) -> AHashMap<&str, (&FlowModule, ParentLocation)> {
    let mut index = AHashMap::new();
    for (module, location) in modules_with_locations(flow) {
        index.entry(module.id.as_str()).or_insert((module, location));
    }
    index
}

/// Finds a module by id anywhere in the flow, special slots included.
pub fn find_module<'a>(flow: &'a FlowValue, id: &str) -> Option<&'a FlowModule> {
    if let Some(found) = find_in_list(&flow.modules, id) {
        return Some(found);
    }
    [&flow.failure_module, &flow.preprocessor_module]
        .into_iter()
        .flatten()
        .map(|m| m.as_ref())
        .find(|m| m.id == id)
}

fn find_in_list<'a>(modules: &'a [FlowModule], id: &str) -> Option<&'a FlowModule> {
    for module in modules {
        if module.id == id {
            return Some(module);
        }
        for (_, children) in module.value.child_lists() {
            if let Some(found) = find_in_list(children, id) {
                return Some(found);
            }
        }
    }
    None
}

pub fn find_module_mut<'a>(flow: &'a mut FlowValue, id: &str) -> Option<&'a mut FlowModule> {
    if let Some(found) = find_in_list_mut(&mut flow.modules, id) {
        return Some(found);
    }
    if let Some(failure) = flow.failure_module.as_deref_mut().filter(|m| m.id == id) {
        return Some(failure);
    }
    flow.preprocessor_module
        .as_deref_mut()
        .filter(|m| m.id == id)
}

fn find_in_list_mut<'a>(modules: &'a mut [FlowModule], id: &str) -> Option<&'a mut FlowModule> {
    for module in modules.iter_mut() {
        if module.id == id {
            return Some(module);
        }
        for (_, children) in module.value.child_lists_mut() {
            if let Some(found) = find_in_list_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// The list holding the entries at `location`, resolved in `flow`. Special slots have none.
pub fn container_list<'a>(flow: &'a FlowValue, location: &ParentLocation) -> Option<&'a [FlowModule]> {
    match location {
        ParentLocation::Root { .. } => Some(flow.modules.as_slice()),
        ParentLocation::Failure | ParentLocation::Preprocessor => None,
        nested => {
            let parent = find_module(flow, nested.parent_id()?)?;
            parent.value.child_list(nested.slot()?)
        }
    }
}
