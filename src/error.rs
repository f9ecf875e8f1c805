use thiserror::Error;

/// Errors raised when a flow does not satisfy the engine's structural assumptions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowValidationError {
    #[error("Module id '{id}' appears more than once in the flow")]
    DuplicateModuleId { id: String },

    #[error("Module id '{id}' starts with the reserved prefix '{prefix}'")]
    ReservedPrefix { id: String, prefix: &'static str },

    #[error("Module id '{id}' is reserved for the flow input schema")]
    ReservedId { id: String },
}

/// Errors that can occur while decoding or encoding a flow.
#[derive(Error, Debug, Clone)]
pub enum FlowParseError {
    #[error("Failed to parse flow JSON: {0}")]
    Json(String),
}

/// Errors returned by a `DiffSession` when a command cannot run at all.
///
/// A command that runs but finds nothing to do is not an error; it reports an
/// [`Outcome`](crate::session::Outcome) instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {operation} without a before-flow snapshot")]
    MissingSnapshot { operation: &'static str },

    #[error("Cannot {operation} without a current flow")]
    MissingCurrentFlow { operation: &'static str },

    #[error("Invalid flow: {0}")]
    InvalidFlow(#[from] FlowValidationError),
}
