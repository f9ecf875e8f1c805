use super::DiffSession;

/// Configures a [`DiffSession`] before any flow is loaded.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    edit_mode: bool,
    mark_removed_as_shadowed: bool,
    auto_clear: bool,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            edit_mode: false,
            mark_removed_as_shadowed: false,
            auto_clear: true,
        }
    }

    /// In edit mode every computed action starts out pending.
    pub fn edit_mode(mut self, enabled: bool) -> Self {
        self.edit_mode = enabled;
        self
    }

    pub fn mark_removed_as_shadowed(mut self, enabled: bool) -> Self {
        self.mark_removed_as_shadowed = enabled;
        self
    }

    /// Whether the snapshot is dropped as soon as no action is left. On by default.
    pub fn auto_clear(mut self, enabled: bool) -> Self {
        self.auto_clear = enabled;
        self
    }

    pub fn build(self) -> DiffSession {
        DiffSession {
            before: None,
            current: None,
            merged: None,
            current_input_schema: None,
            edit_mode: self.edit_mode,
            mark_removed_as_shadowed: self.mark_removed_as_shadowed,
            auto_clear: self.auto_clear,
            module_actions: Default::default(),
            before_actions: Default::default(),
        }
    }
}
