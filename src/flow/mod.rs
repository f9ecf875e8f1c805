//! The flow tree: modules, their typed payloads and the enclosing flow value.

mod display;
mod module;
mod value;

pub use display::DisplayFlow;
pub use module::{BranchArm, ChildSlot, FlowModule, FlowModuleValue, ModuleKind, ParallelArm};
pub use value::FlowValue;
