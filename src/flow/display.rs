use super::{ChildSlot, FlowModule, FlowModuleValue, FlowValue};
use crate::diff::ModuleActions;
use itertools::{Itertools, Position};
use std::fmt;

/// Renders a flow as an indented tree, optionally annotating every module with its action.
pub struct DisplayFlow<'a> {
    pub flow: &'a FlowValue,
    pub actions: Option<&'a ModuleActions>,
}

impl<'a> DisplayFlow<'a> {
    pub fn new(flow: &'a FlowValue) -> Self {
        Self {
            flow,
            actions: None,
        }
    }

    pub fn with_actions(mut self, actions: &'a ModuleActions) -> Self {
        self.actions = Some(actions);
        self
    }
}

impl<'a> fmt::Display for DisplayFlow<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "flow")?;

        let specials: Vec<(&str, &FlowModule)> = [
            ("failure_module", self.flow.failure_module.as_deref()),
            ("preprocessor_module", self.flow.preprocessor_module.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, module)| module.map(|m| (label, m)))
        .collect();

        for (position, module) in self.flow.modules.iter().with_position() {
            let is_last = specials.is_empty() && matches!(position, Position::Last | Position::Only);
            self.fmt_module(module, f, "", is_last)?;
        }

        for (position, (label, module)) in specials.into_iter().with_position() {
            let is_last = matches!(position, Position::Last | Position::Only);
            writeln!(f, "{}{}", marker(is_last), label)?;
            self.fmt_module(module, f, &child_prefix("", is_last), true)?;
        }
        Ok(())
    }
}

impl<'a> DisplayFlow<'a> {
    fn fmt_module(
        &self,
        module: &FlowModule,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        is_last: bool,
    ) -> fmt::Result {
        write!(f, "{}{}{} [{}]", prefix, marker(is_last), module.id, module.kind())?;
        if let Some(summary) = &module.summary {
            write!(f, " \"{}\"", summary)?;
        }
        if let Some(info) = self.actions.and_then(|actions| actions.get(&module.id)) {
            write!(f, " ({}{})", info.action, if info.pending { ", pending" } else { "" })?;
        }
        writeln!(f)?;

        let prefix = child_prefix(prefix, is_last);
        let lists = module.value.child_lists();
        for (position, (slot, children)) in lists.into_iter().with_position() {
            let slot_is_last = matches!(position, Position::Last | Position::Only);
            writeln!(
                f,
                "{}{}{}",
                prefix,
                marker(slot_is_last),
                slot_label(&module.value, slot)
            )?;

            let slot_prefix = child_prefix(&prefix, slot_is_last);
            if children.is_empty() {
                writeln!(f, "{}└── <empty>", slot_prefix)?;
            }
            for (position, child) in children.iter().with_position() {
                let child_is_last = matches!(position, Position::Last | Position::Only);
                self.fmt_module(child, f, &slot_prefix, child_is_last)?;
            }
        }
        Ok(())
    }
}

fn marker(is_last: bool) -> &'static str {
    if is_last { "└── " } else { "├── " }
}

fn child_prefix(prefix: &str, is_last: bool) -> String {
    format!("{}{}", prefix, if is_last { "    " } else { "│   " })
}

fn slot_label(value: &FlowModuleValue, slot: ChildSlot) -> String {
    match (value, slot) {
        (_, ChildSlot::ForLoopBody | ChildSlot::WhileLoopBody) => "modules".to_string(),
        (_, ChildSlot::BranchDefault) => "default".to_string(),
        (FlowModuleValue::BranchOne { branches, .. }, ChildSlot::BranchArm(i)) => {
            match branches.get(i) {
                Some(arm) => format!("branches[{}] if {}", i, arm.expr),
                None => format!("branches[{}]", i),
            }
        }
        (_, ChildSlot::BranchArm(i) | ChildSlot::ParallelArm(i)) => format!("branches[{}]", i),
        (_, ChildSlot::AgentTools) => "tools".to_string(),
    }
}
