//! Common test utilities for building flows and inspecting their shape.
use flowdiff::prelude::*;
use flowdiff::walker;

/// A leaf that does nothing.
#[allow(dead_code)]
pub fn identity(id: &str) -> FlowModule {
    FlowModule::new(id, FlowModuleValue::Identity)
}

/// An inline deno script leaf.
#[allow(dead_code)]
pub fn script(id: &str, content: &str) -> FlowModule {
    FlowModule::new(id, FlowModuleValue::raw_script(content, "deno"))
}

#[allow(dead_code)]
pub fn for_loop(id: &str, modules: Vec<FlowModule>) -> FlowModule {
    FlowModule::new(id, FlowModuleValue::for_loop("flow_input.items", modules))
}

#[allow(dead_code)]
pub fn while_loop(id: &str, modules: Vec<FlowModule>) -> FlowModule {
    FlowModule::new(id, FlowModuleValue::while_loop(modules))
}

/// A `branchone` container; each arm is given as `(expr, modules)`.
#[allow(dead_code)]
pub fn branch_one(
    id: &str,
    default: Vec<FlowModule>,
    arms: Vec<(&str, Vec<FlowModule>)>,
) -> FlowModule {
    let branches = arms
        .into_iter()
        .map(|(expr, modules)| BranchArm::new(expr, modules))
        .collect();
    FlowModule::new(id, FlowModuleValue::branch_one(default, branches))
}

#[allow(dead_code)]
pub fn branch_all(id: &str, arms: Vec<Vec<FlowModule>>) -> FlowModule {
    let branches = arms.into_iter().map(ParallelArm::new).collect();
    FlowModule::new(id, FlowModuleValue::branch_all(branches))
}

#[allow(dead_code)]
pub fn ai_agent(id: &str, tools: Vec<FlowModule>) -> FlowModule {
    FlowModule::new(id, FlowModuleValue::ai_agent(tools))
}

#[allow(dead_code)]
pub fn flow(modules: Vec<FlowModule>) -> FlowValue {
    FlowValue::new(modules)
}

/// Ids of the root list, in order.
#[allow(dead_code)]
pub fn root_ids(flow: &FlowValue) -> Vec<String> {
    flow.modules.iter().map(|m| m.id.clone()).collect()
}

/// Ids of every child list of container `id`, in traversal order.
#[allow(dead_code)]
pub fn child_ids(flow: &FlowValue, id: &str) -> Vec<Vec<String>> {
    let container = flow
        .module(id)
        .unwrap_or_else(|| panic!("container '{}' not found", id));
    container
        .value
        .child_lists()
        .into_iter()
        .map(|(_, list)| list.iter().map(|m| m.id.clone()).collect())
        .collect()
}

/// Ids of every module in traversal order, duplicates included.
#[allow(dead_code)]
pub fn walk_ids(flow: &FlowValue) -> Vec<String> {
    walker::flow_modules(flow)
        .into_iter()
        .map(|m| m.id.clone())
        .collect()
}

/// A session in edit mode that keeps its snapshot when no change is left.
#[allow(dead_code)]
pub fn review_session(before: FlowValue, after: FlowValue) -> DiffSession {
    let mut session = DiffSession::builder()
        .edit_mode(true)
        .auto_clear(false)
        .build();
    session.set_before_flow(before).expect("valid before flow");
    session.set_current_flow(after).expect("valid current flow");
    session
}

#[allow(dead_code)]
pub fn action_of(actions: &ModuleActions, id: &str) -> Option<ModuleAction> {
    actions.get(id).map(|info| info.action)
}
