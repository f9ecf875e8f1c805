use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

fn default_true() -> bool {
    true
}

/// A single step of a flow.
///
/// Per-module controls that the engine never interprets (retry, timeout, `stop_after_if`,
/// `skip_if`, sleep, suspend, mock, ...) are kept in `controls` so they take part in
/// equality checks and survive a JSON round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowModule {
    pub id: String,
    pub value: FlowModuleValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(flatten)]
    pub controls: Map<String, Value>,
}

/// The typed payload of a module. Leaf variants carry no children; container variants own
/// one or more child module lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FlowModuleValue {
    RawScript {
        content: String,
        language: String,
        #[serde(default)]
        input_transforms: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lock: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assets: Option<Vec<Value>>,
    },
    Script {
        path: String,
        #[serde(default)]
        input_transforms: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hash: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag_override: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assets: Option<Vec<Value>>,
    },
    Flow {
        path: String,
        #[serde(default)]
        input_transforms: Map<String, Value>,
    },
    Identity,
    ForloopFlow {
        iterator: Value,
        modules: Vec<FlowModule>,
        #[serde(default = "default_true")]
        skip_failures: bool,
        #[serde(default)]
        parallel: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parallelism: Option<Value>,
    },
    WhileloopFlow {
        modules: Vec<FlowModule>,
        #[serde(default)]
        skip_failures: bool,
    },
    BranchOne {
        branches: Vec<BranchArm>,
        #[serde(default)]
        default: Vec<FlowModule>,
    },
    BranchAll {
        branches: Vec<ParallelArm>,
        #[serde(default = "default_true")]
        parallel: bool,
    },
    AiAgent {
        #[serde(default)]
        input_transforms: Map<String, Value>,
        #[serde(default)]
        tools: Vec<FlowModule>,
    },
}

/// A conditional arm of a `branchone` container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchArm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub expr: String,
    #[serde(default)]
    pub modules: Vec<FlowModule>,
}

/// An arm of a `branchall` container. All arms run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelArm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_failure: Option<bool>,
    #[serde(default)]
    pub modules: Vec<FlowModule>,
}

/// The variant tag of a module, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    RawScript,
    Script,
    Flow,
    Identity,
    ForloopFlow,
    WhileloopFlow,
    BranchOne,
    BranchAll,
    AiAgent,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::RawScript => "rawscript",
            ModuleKind::Script => "script",
            ModuleKind::Flow => "flow",
            ModuleKind::Identity => "identity",
            ModuleKind::ForloopFlow => "forloopflow",
            ModuleKind::WhileloopFlow => "whileloopflow",
            ModuleKind::BranchOne => "branchone",
            ModuleKind::BranchAll => "branchall",
            ModuleKind::AiAgent => "aiagent",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ModuleKind::ForloopFlow
                | ModuleKind::WhileloopFlow
                | ModuleKind::BranchOne
                | ModuleKind::BranchAll
                | ModuleKind::AiAgent
        )
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Names one child list inside a container module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildSlot {
    /// Body of a `forloopflow`.
    ForLoopBody,
    /// Body of a `whileloopflow`.
    WhileLoopBody,
    /// `default` list of a `branchone`.
    BranchDefault,
    /// Arm `n` of a `branchone`.
    BranchArm(usize),
    /// Arm `n` of a `branchall`.
    ParallelArm(usize),
    /// Tool list of an `aiagent`.
    AgentTools,
}

impl FlowModule {
    pub fn new(id: impl Into<String>, value: FlowModuleValue) -> Self {
        Self {
            id: id.into(),
            value,
            summary: None,
            controls: Map::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn kind(&self) -> ModuleKind {
        self.value.kind()
    }

    /// Returns a copy of this module with every child list emptied.
    pub fn skeleton(&self) -> FlowModule {
        let mut clone = self.clone();
        for (_, list) in clone.value.child_lists_mut() {
            list.clear();
        }
        clone
    }

    /// Returns a copy of this module with `prefix` prepended to its id and to the id of every
    /// descendant.
    pub fn with_prefixed_ids(&self, prefix: &str) -> FlowModule {
        let mut clone = self.clone();
        clone.prefix_ids(prefix);
        clone
    }

    pub(crate) fn prefix_ids(&mut self, prefix: &str) {
        self.id = format!("{}{}", prefix, self.id);
        for (_, list) in self.value.child_lists_mut() {
            for child in list.iter_mut() {
                child.prefix_ids(prefix);
            }
        }
    }

    /// Returns the comparison form of this module: empty `assets` lists are dropped at every
    /// depth since their presence carries no meaning.
    pub fn normalized(&self) -> FlowModule {
        let mut clone = self.clone();
        clone.strip_empty_assets();
        clone
    }

    fn strip_empty_assets(&mut self) {
        match &mut self.value {
            FlowModuleValue::RawScript { assets, .. } | FlowModuleValue::Script { assets, .. } => {
                if assets.as_ref().is_some_and(|a| a.is_empty()) {
                    *assets = None;
                }
            }
            _ => {}
        }
        for (_, list) in self.value.child_lists_mut() {
            for child in list.iter_mut() {
                child.strip_empty_assets();
            }
        }
    }

    /// Structural equality that ignores insignificant differences (see [`Self::normalized`]).
    pub fn content_eq(&self, other: &FlowModule) -> bool {
        self.normalized() == other.normalized()
    }
}

impl FlowModuleValue {
    pub fn kind(&self) -> ModuleKind {
        match self {
            FlowModuleValue::RawScript { .. } => ModuleKind::RawScript,
            FlowModuleValue::Script { .. } => ModuleKind::Script,
            FlowModuleValue::Flow { .. } => ModuleKind::Flow,
            FlowModuleValue::Identity => ModuleKind::Identity,
            FlowModuleValue::ForloopFlow { .. } => ModuleKind::ForloopFlow,
            FlowModuleValue::WhileloopFlow { .. } => ModuleKind::WhileloopFlow,
            FlowModuleValue::BranchOne { .. } => ModuleKind::BranchOne,
            FlowModuleValue::BranchAll { .. } => ModuleKind::BranchAll,
            FlowModuleValue::AiAgent { .. } => ModuleKind::AiAgent,
        }
    }

    /// Every child list of this value, in traversal order. Leaves return nothing.
    pub fn child_lists(&self) -> Vec<(ChildSlot, &[FlowModule])> {
        match self {
            FlowModuleValue::ForloopFlow { modules, .. } => {
                vec![(ChildSlot::ForLoopBody, modules.as_slice())]
            }
            FlowModuleValue::WhileloopFlow { modules, .. } => {
                vec![(ChildSlot::WhileLoopBody, modules.as_slice())]
            }
            FlowModuleValue::BranchOne { branches, default } => {
                let mut lists = Vec::with_capacity(branches.len() + 1);
                lists.push((ChildSlot::BranchDefault, default.as_slice()));
                for (i, arm) in branches.iter().enumerate() {
                    lists.push((ChildSlot::BranchArm(i), arm.modules.as_slice()));
                }
                lists
            }
            FlowModuleValue::BranchAll { branches, .. } => branches
                .iter()
                .enumerate()
                .map(|(i, arm)| (ChildSlot::ParallelArm(i), arm.modules.as_slice()))
                .collect(),
            FlowModuleValue::AiAgent { tools, .. } => {
                vec![(ChildSlot::AgentTools, tools.as_slice())]
            }
            FlowModuleValue::RawScript { .. }
            | FlowModuleValue::Script { .. }
            | FlowModuleValue::Flow { .. }
            | FlowModuleValue::Identity => Vec::new(),
        }
    }

    /// Mutable counterpart of [`Self::child_lists`].
    pub fn child_lists_mut(&mut self) -> Vec<(ChildSlot, &mut Vec<FlowModule>)> {
        match self {
            FlowModuleValue::ForloopFlow { modules, .. } => vec![(ChildSlot::ForLoopBody, modules)],
            FlowModuleValue::WhileloopFlow { modules, .. } => {
                vec![(ChildSlot::WhileLoopBody, modules)]
            }
            FlowModuleValue::BranchOne { branches, default } => {
                let mut lists = Vec::with_capacity(branches.len() + 1);
                lists.push((ChildSlot::BranchDefault, default));
                for (i, arm) in branches.iter_mut().enumerate() {
                    lists.push((ChildSlot::BranchArm(i), &mut arm.modules));
                }
                lists
            }
            FlowModuleValue::BranchAll { branches, .. } => branches
                .iter_mut()
                .enumerate()
                .map(|(i, arm)| (ChildSlot::ParallelArm(i), &mut arm.modules))
                .collect(),
            FlowModuleValue::AiAgent { tools, .. } => vec![(ChildSlot::AgentTools, tools)],
            FlowModuleValue::RawScript { .. }
            | FlowModuleValue::Script { .. }
            | FlowModuleValue::Flow { .. }
            | FlowModuleValue::Identity => Vec::new(),
        }
    }

    /// The child list named by `slot`, if this value has one.
    pub fn child_list(&self, slot: ChildSlot) -> Option<&[FlowModule]> {
        match (self, slot) {
            (FlowModuleValue::ForloopFlow { modules, .. }, ChildSlot::ForLoopBody)
            | (FlowModuleValue::WhileloopFlow { modules, .. }, ChildSlot::WhileLoopBody) => {
                Some(modules.as_slice())
            }
            (FlowModuleValue::BranchOne { default, .. }, ChildSlot::BranchDefault) => {
                Some(default.as_slice())
            }
            (FlowModuleValue::BranchOne { branches, .. }, ChildSlot::BranchArm(i)) => {
                branches.get(i).map(|arm| arm.modules.as_slice())
            }
            (FlowModuleValue::BranchAll { branches, .. }, ChildSlot::ParallelArm(i)) => {
                branches.get(i).map(|arm| arm.modules.as_slice())
            }
            (FlowModuleValue::AiAgent { tools, .. }, ChildSlot::AgentTools) => Some(tools.as_slice()),
            _ => None,
        }
    }

    /// Mutable access to the child list named by `slot`.
    ///
    /// When an arm index is out of range and `template` (the same container in another
    /// version of the flow) has that arm, the missing arms are recreated: the requested arm
    /// copies the template's metadata with an empty module list, intermediate arms are empty.
    pub fn child_list_mut(
        &mut self,
        slot: ChildSlot,
        template: Option<&FlowModuleValue>,
    ) -> Option<&mut Vec<FlowModule>> {
        match (self, slot) {
            (FlowModuleValue::ForloopFlow { modules, .. }, ChildSlot::ForLoopBody)
            | (FlowModuleValue::WhileloopFlow { modules, .. }, ChildSlot::WhileLoopBody) => {
                Some(modules)
            }
            (FlowModuleValue::BranchOne { default, .. }, ChildSlot::BranchDefault) => {
                Some(default)
            }
            (FlowModuleValue::BranchOne { branches, .. }, ChildSlot::BranchArm(i)) => {
                if i >= branches.len() {
                    let Some(FlowModuleValue::BranchOne {
                        branches: source, ..
                    }) = template
                    else {
                        return None;
                    };
                    let restored = source.get(i)?;
                    while branches.len() < i {
                        branches.push(BranchArm {
                            summary: None,
                            expr: String::new(),
                            modules: Vec::new(),
                        });
                    }
                    branches.push(BranchArm {
                        modules: Vec::new(),
                        ..restored.clone()
                    });
                }
                Some(&mut branches[i].modules)
            }
            (FlowModuleValue::BranchAll { branches, .. }, ChildSlot::ParallelArm(i)) => {
                if i >= branches.len() {
                    let Some(FlowModuleValue::BranchAll {
                        branches: source, ..
                    }) = template
                    else {
                        return None;
                    };
                    let restored = source.get(i)?;
                    while branches.len() < i {
                        branches.push(ParallelArm {
                            summary: None,
                            skip_failure: None,
                            modules: Vec::new(),
                        });
                    }
                    branches.push(ParallelArm {
                        modules: Vec::new(),
                        ..restored.clone()
                    });
                }
                Some(&mut branches[i].modules)
            }
            (FlowModuleValue::AiAgent { tools, .. }, ChildSlot::AgentTools) => Some(tools),
            _ => None,
        }
    }
}

// Convenience constructors used by tests and tools.
impl FlowModuleValue {
    pub fn raw_script(content: impl Into<String>, language: impl Into<String>) -> Self {
        FlowModuleValue::RawScript {
            content: content.into(),
            language: language.into(),
            input_transforms: Map::new(),
            path: None,
            lock: None,
            tag: None,
            assets: None,
        }
    }

    pub fn script(path: impl Into<String>) -> Self {
        FlowModuleValue::Script {
            path: path.into(),
            input_transforms: Map::new(),
            hash: None,
            tag_override: None,
            assets: None,
        }
    }

    pub fn subflow(path: impl Into<String>) -> Self {
        FlowModuleValue::Flow {
            path: path.into(),
            input_transforms: Map::new(),
        }
    }

    pub fn for_loop(iterator: &str, modules: Vec<FlowModule>) -> Self {
        FlowModuleValue::ForloopFlow {
            iterator: serde_json::json!({ "type": "javascript", "expr": iterator }),
            modules,
            skip_failures: true,
            parallel: false,
            parallelism: None,
        }
    }

    pub fn while_loop(modules: Vec<FlowModule>) -> Self {
        FlowModuleValue::WhileloopFlow {
            modules,
            skip_failures: false,
        }
    }

    pub fn branch_one(default: Vec<FlowModule>, branches: Vec<BranchArm>) -> Self {
        FlowModuleValue::BranchOne { branches, default }
    }

    pub fn branch_all(branches: Vec<ParallelArm>) -> Self {
        FlowModuleValue::BranchAll {
            branches,
            parallel: true,
        }
    }

    pub fn ai_agent(tools: Vec<FlowModule>) -> Self {
        FlowModuleValue::AiAgent {
            input_transforms: Map::new(),
            tools,
        }
    }
}

impl BranchArm {
    pub fn new(expr: impl Into<String>, modules: Vec<FlowModule>) -> Self {
        Self {
            summary: None,
            expr: expr.into(),
            modules,
        }
    }
}

impl ParallelArm {
    pub fn new(modules: Vec<FlowModule>) -> Self {
        Self {
            summary: None,
            skip_failure: None,
            modules,
        }
    }
}
