//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and functions from the flowdiff
//! crate. Import this module to get access to the core functionality without having to
//! import each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use flowdiff::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let before = FlowValue::from_json(&std::fs::read_to_string("path/to/before.json")?)?;
//! let after = FlowValue::from_json(&std::fs::read_to_string("path/to/after.json")?)?;
//!
//! let (before_actions, after_actions) = compute_module_diff(&before, &after, DiffOptions::default());
//! println!("{} removed or modified, {} on the after side", before_actions.len(), after_actions.len());
//! # Ok(())
//! # }
//! ```

// Flow model
pub use crate::flow::{
    BranchArm, DisplayFlow, FlowModule, FlowModuleValue, FlowValue, ModuleKind, ParallelArm,
};

// Diff and merge
pub use crate::diff::{
    DiffOptions, FlowTimeline, ModuleAction, ModuleActionInfo, ModuleActions, build_flow_timeline,
    compute_module_diff, has_input_schema_changed, insert_module_into_flow,
    reconstruct_merged_flow,
};
pub use crate::locate::{ParentLocation, find_module_parent};

// Review session
pub use crate::session::{DiffSession, Outcome, SessionBuilder};

// Error types
pub use crate::error::{FlowParseError, FlowValidationError, SessionError};

// Reserved identifiers
pub use crate::{DUPLICATE_MODULE_PREFIX, INPUT_SCHEMA_ID, NEW_MODULE_PREFIX};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
