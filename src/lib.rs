//! # flowdiff - Structural Diff and Reconciliation for Workflow Trees
//!
//! **flowdiff** compares two versions of a hierarchical workflow ("flow") module by module,
//! reconstructs a single merged tree holding both versions, and lets a reviewer fold
//! individual changes back into the original (accept) or out of the new version (reject)
//! while keeping tree shape and sibling order intact.
//!
//! ## Core Workflow
//!
//! A flow is a tree of typed modules. Loops, branches and agents are containers that own
//! child lists; scripts, subflows and identity steps are leaves. The engine works in three
//! layers:
//!
//! 1.  **Diff**: [`diff::compute_module_diff`] classifies every module id as added, removed
//!     or modified. A module that changes variant or container is reported as a removal
//!     plus an addition.
//! 2.  **Merge**: [`diff::reconstruct_merged_flow`] starts from the new version and puts every
//!     removed module back at its old position, anchored on its nearest surviving neighbour.
//! 3.  **Review**: a [`DiffSession`](session::DiffSession) keeps both versions, recomputes the
//!     diff after every change and exposes `accept_module`, `reject_module`, `accept_all`
//!     and `reject_all`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowdiff::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let before = FlowValue::from_json(&std::fs::read_to_string("before.json")?)?;
//!     let after = FlowValue::from_json(&std::fs::read_to_string("after.json")?)?;
//!
//!     // Stateless: classify and merge in one call.
//!     let timeline = build_flow_timeline(&before, &after, DiffOptions::default());
//!     let display = DisplayFlow::new(&timeline.merged_flow).with_actions(&timeline.after_actions);
//!     println!("{}", display);
//!
//!     // Stateful: review the changes one by one.
//!     let mut session = DiffSession::builder().edit_mode(true).build();
//!     session.set_before_flow(before)?;
//!     session.set_current_flow(after)?;
//!
//!     let ids: Vec<String> = session.module_actions().keys().cloned().collect();
//!     for id in ids {
//!         match session.accept_module(&id)? {
//!             Outcome::Applied => println!("accepted {}", id),
//!             Outcome::NoAction | Outcome::NotFound => println!("skipped {}", id),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod diff;
pub mod error;
pub mod flow;
pub mod locate;
pub mod prelude;
pub mod session;
pub mod walker;

pub use diff::{DUPLICATE_MODULE_PREFIX, NEW_MODULE_PREFIX};
pub use session::INPUT_SCHEMA_ID;
