//! Evaluation Context

use gauge_core::{Value, GaugeError};
use crate::{PluginRegistry, StateProvider, StateSnapshot};
use std::collections::HashMap;
use std::sync::Arc;

/// Evaluation context passed to plugins
pub struct EvalContext {
    pub variables: HashMap<String, Value>,
    pub registry: Arc<PluginRegistry>,
    pub states: Arc<dyn StateProvider>,
}

impl EvalContext {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            variables: HashMap::new(),
            registry,
            states: Arc::new(StateSnapshot::default()),
        }
    }

    pub fn with_variables(mut self, vars: HashMap<String, Value>) -> Self {
        self.variables = vars;
        self
    }

    pub fn with_states(mut self, states: Arc<dyn StateProvider>) -> Self {
        self.states = states;
        self
    }

    /// Resolve a variable, following dotted paths into objects.
    pub fn get_var(&self, name: &str) -> Value {
        let parts: Vec<&str> = name.split('.').collect();

        let mut current = match self.variables.get(parts[0]) {
            Some(v) => v.clone(),
            None => return Value::Error(GaugeError::undefined_var(parts[0])),
        };

        for part in &parts[1..] {
            current = current.get(part);
            if current.is_error() {
                return current;
            }
        }
        current
    }

    pub fn set_var(&mut self, name: String, value: Value) {
        self.variables.insert(name, value);
    }
}
