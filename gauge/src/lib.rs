//! Gauge - Unit conversion filters for home automation templates
//!
//! Renders `{{ ... }}` expression blocks in which power, energy, flow and
//! temperature readings can be piped through conversion filters:
//!
//! ```text
//! Grid draw: {{ 'sensor.grid_power' | kilowatts | round(2) }} kW
//! Boiler:    {{ fahrenheit(60, 'C') }} °F
//! ```

mod parser;
mod ast;
mod eval;
mod render;
mod builtins;
pub mod config;

pub use ast::{Template, Segment, Expr, BinOp, UnaryOp};
pub use eval::Evaluator;
pub use render::Renderer;
pub use parser::{parse, parse_expr};
pub use config::IntegrationConfig;

use gauge_core::{GaugeError, Value};
use gauge_plugin::{EvalContext, PluginRegistry, StateProvider, StateSnapshot};
use gauge_units::{Conversions, QuantityKind};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of rendering one template
#[derive(Debug, Clone, Serialize)]
pub struct RenderResult {
    /// Rendered text
    pub output: String,
    /// Value of each `{{ ... }}` block, in order
    pub values: Vec<Value>,
    /// Errors encountered
    pub errors: Vec<GaugeError>,
}

impl RenderResult {
    /// Result for a template that failed to parse
    pub fn parse_error(error: GaugeError) -> Self {
        Self {
            output: String::new(),
            values: Vec::new(),
            errors: vec![error],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Load the builtin filters into registry
pub fn load_builtins(registry: PluginRegistry) -> PluginRegistry {
    registry
        .with_function(builtins::Round)
        .with_function(builtins::Float)
}

/// Main Gauge engine
pub struct Gauge {
    registry: Arc<PluginRegistry>,
    states: Arc<dyn StateProvider>,
    conversions: Arc<Conversions>,
}

impl Gauge {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            states: Arc::new(StateSnapshot::new()),
            conversions: Arc::new(Conversions::build()),
        }
    }

    /// Builtins plus every conversion filter, sharing one set of tables
    pub fn with_unit_conversions() -> Self {
        let conversions = Arc::new(Conversions::build());
        let registry = gauge_units::load_with(load_builtins(PluginRegistry::new()), conversions.clone());
        Self {
            registry: Arc::new(registry),
            states: Arc::new(StateSnapshot::new()),
            conversions,
        }
    }

    /// Builder: where entity references are looked up
    pub fn with_states(mut self, states: Arc<dyn StateProvider>) -> Self {
        self.states = states;
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    fn context(&self, variables: &HashMap<String, Value>) -> EvalContext {
        EvalContext::new(self.registry.clone())
            .with_states(self.states.clone())
            .with_variables(variables.clone())
    }

    pub fn render(&self, template: &str, variables: &HashMap<String, Value>) -> RenderResult {
        let template = match parser::parse(template) {
            Ok(t) => t,
            Err(e) => return RenderResult::parse_error(e),
        };

        let ctx = self.context(variables);
        let values = Evaluator::new().eval(&template, &ctx);
        let output = Renderer::new().render(&template, &values);
        let errors: Vec<GaugeError> = values.iter()
            .filter_map(|v| if let Value::Error(e) = v { Some(e.clone()) } else { None })
            .collect();

        debug!(blocks = values.len(), errors = errors.len(), "rendered template");
        RenderResult { output, values, errors }
    }

    /// Evaluate one expression, without `{{ }}`
    pub fn eval_expr(&self, expr: &str, variables: &HashMap<String, Value>) -> Value {
        match parser::parse_expr(expr) {
            Ok(e) => Evaluator::new().eval_expr(&e, &self.context(variables)),
            Err(e) => Value::Error(e.with_expression(expr)),
        }
    }

    /// Run one conversion filter directly, reporting why it produced nothing
    pub fn convert(&self, filter: &str, input: &Value, unit: Option<&str>) -> Result<f64, GaugeError> {
        let def = self.conversions.filter(filter)
            .ok_or_else(|| GaugeError::undefined_func(filter))?;
        Ok(self.conversions.apply(def.target, input, unit, self.states.as_ref())?)
    }

    /// Accepted units, optionally for one kind
    pub fn list_units(&self, kind: Option<QuantityKind>) -> Value {
        self.conversions.catalog(kind)
    }

    pub fn help(&self, name: Option<&str>) -> Value {
        self.registry.help(name)
    }

    pub fn list_functions(&self, category: Option<&str>) -> Value {
        self.registry.list_functions(category)
    }
}

impl Default for Gauge {
    fn default() -> Self {
        Self::with_unit_conversions()
    }
}

/// Set up the integration from the host's configuration.
///
/// Returns `None` unless the configuration carries `unit_conversions`.
pub fn setup(host_config: &JsonValue, states: Arc<dyn StateProvider>) -> Option<Gauge> {
    if IntegrationConfig::from_host(host_config).is_none() {
        info!(key = config::CONFIG_KEY, "integration not configured, filters not loaded");
        return None;
    }
    let gauge = Gauge::with_unit_conversions().with_states(states);
    info!(filters = gauge.registry.names().len(), "unit conversions set up");
    Some(gauge)
}

#[macro_export]
macro_rules! vars {
    {} => { std::collections::HashMap::new() };
    { $($key:ident : $value:expr),* $(,)? } => {{
        let mut map = std::collections::HashMap::new();
        $(
            map.insert(stringify!($key).to_string(), gauge_core::Value::from($value));
        )*
        map
    }};
}
