//! Depth-first traversal of a flow.
//!
//! The descent rule is type-directed and lives in [`FlowModuleValue::child_lists`]:
//! loops descend into their body, `branchone` into `default` then each arm, `branchall` into
//! each arm, agents into their tools. Leaves contribute only themselves.
//!
//! [`FlowModuleValue::child_lists`]: crate::flow::FlowModuleValue::child_lists

use crate::flow::{FlowModule, FlowValue};
use ahash::{AHashMap, AHashSet};

/// Collects every module of `modules` and of their descendants, in pre-order.
pub fn dfs(modules: &[FlowModule]) -> Vec<&FlowModule> {
    let mut out = Vec::new();
    visit(modules, &mut out);
    out
}

fn visit<'a>(modules: &'a [FlowModule], out: &mut Vec<&'a FlowModule>) {
    for module in modules {
        out.push(module);
        for (_, children) in module.value.child_lists() {
            visit(children, out);
        }
    }
}

/// Every module of the flow: the root tree in pre-order, then the failure module, then the
/// preprocessor module.
pub fn flow_modules(flow: &FlowValue) -> Vec<&FlowModule> {
    let mut out = dfs(&flow.modules);
    if let Some(failure) = &flow.failure_module {
        out.push(failure);
    }
    if let Some(preprocessor) = &flow.preprocessor_module {
        out.push(preprocessor);
    }
    out
}

/// Builds an id-indexed map of the whole flow. If an id occurs more than once, the first
/// occurrence in traversal order wins.
pub fn module_index(flow: &FlowValue) -> AHashMap<&str, &FlowModule> {
    let mut index = AHashMap::new();
    for module in flow_modules(flow) {
        index.entry(module.id.as_str()).or_insert(module);
    }
    index
}

pub fn all_module_ids(flow: &FlowValue) -> AHashSet<String> {
    flow_modules(flow).into_iter().map(|m| m.id.clone()).collect()
}

/// Ids of `module` and all of its descendants.
pub fn subtree_ids(module: &FlowModule) -> Vec<&str> {
    dfs(std::slice::from_ref(module))
        .into_iter()
        .map(|m| m.id.as_str())
        .collect()
}
