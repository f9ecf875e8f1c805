use super::FlowModule;
use crate::error::{FlowParseError, FlowValidationError};
use crate::locate;
use crate::walker;
use crate::{DUPLICATE_MODULE_PREFIX, INPUT_SCHEMA_ID};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete flow: the root module list, the two special slots and the input schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowValue {
    #[serde(default)]
    pub modules: Vec<FlowModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_module: Option<Box<FlowModule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor_module: Option<Box<FlowModule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl FlowValue {
    pub fn new(modules: Vec<FlowModule>) -> Self {
        Self {
            modules,
            ..Default::default()
        }
    }

    pub fn with_failure_module(mut self, module: FlowModule) -> Self {
        self.failure_module = Some(Box::new(module));
        self
    }

    pub fn with_preprocessor_module(mut self, module: FlowModule) -> Self {
        self.preprocessor_module = Some(Box::new(module));
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Parses a flow from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, FlowParseError> {
        serde_json::from_str(json).map_err(|e| FlowParseError::Json(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, FlowParseError> {
        serde_json::to_string(self).map_err(|e| FlowParseError::Json(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, FlowParseError> {
        serde_json::to_string_pretty(self).map_err(|e| FlowParseError::Json(e.to_string()))
    }

    /// Finds a module by id anywhere in the flow, special slots included.
    pub fn module(&self, id: &str) -> Option<&FlowModule> {
        locate::find_module(self, id)
    }

    pub fn module_mut(&mut self, id: &str) -> Option<&mut FlowModule> {
        locate::find_module_mut(self, id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.module(id).is_some()
    }

    /// Ids of every module in the flow.
    pub fn module_ids(&self) -> AHashSet<String> {
        walker::all_module_ids(self)
    }

    /// Checks that module ids are unique and do not use identifiers reserved by the engine.
    pub fn validate(&self) -> Result<(), FlowValidationError> {
        let mut seen = AHashSet::new();
        for module in walker::flow_modules(self) {
            if module.id == INPUT_SCHEMA_ID {
                return Err(FlowValidationError::ReservedId {
                    id: module.id.clone(),
                });
            }
            if module.id.starts_with(DUPLICATE_MODULE_PREFIX) {
                return Err(FlowValidationError::ReservedPrefix {
                    id: module.id.clone(),
                    prefix: DUPLICATE_MODULE_PREFIX,
                });
            }
            if !seen.insert(module.id.as_str()) {
                return Err(FlowValidationError::DuplicateModuleId {
                    id: module.id.clone(),
                });
            }
        }
        Ok(())
    }
}
