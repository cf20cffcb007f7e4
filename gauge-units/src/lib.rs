//! Gauge Units - Unit conversion filters for power, energy, flow and temperature
//!
//! Each filter converts a number or an entity's state to one fixed unit:
//!
//! ```text
//! {{ 5000 | kilowatts('W') }}              → 5.0
//! {{ 'sensor.grid_power' | watts }}        → 2000.0   (state 2, unit kW)
//! {{ celsius(32, '°F') }}                  → 0.0
//! ```
//!
//! Unit spellings are forgiving ("kWh", "kilowatt-hour", "KWH"). Unknown
//! spellings fall back to the kind's default unit. Anything that cannot be
//! converted renders as `None` instead of failing the template.

mod kind;
mod alias;
mod table;
mod normalize;
mod resolve;
mod engine;
mod failure;
mod filters;

pub use kind::{QuantityKind, CanonicalUnit};
pub use alias::{AliasTable, AliasConflict, normalize_token};
pub use table::{ConversionTable, ConversionRule};
pub use resolve::{RawInput, Reading, is_entity_id};
pub use failure::ConversionFailure;
pub use filters::{ConversionFilter, FilterDef, FILTERS};

use gauge_core::Value;
use gauge_plugin::{PluginRegistry, StateProvider};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Amount in a canonical unit, ready for the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedQuantity {
    pub amount: f64,
    pub unit: CanonicalUnit,
}

/// Alias and conversion tables, built once and shared read-only
#[derive(Debug, Clone)]
pub struct Conversions {
    aliases: AliasTable,
    table: ConversionTable,
}

impl Conversions {
    pub fn build() -> Self {
        let aliases = AliasTable::build();
        let table = ConversionTable::build();
        if !aliases.conflicts().is_empty() {
            error!(count = aliases.conflicts().len(), "unit alias table has collisions");
        }
        if !table.is_complete() {
            error!("conversion table is missing units");
        }
        Self { aliases, table }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn table(&self) -> &ConversionTable {
        &self.table
    }

    /// Canonical unit for `raw`, or the kind's default when unrecognized
    pub fn normalize(&self, kind: QuantityKind, raw: &str) -> CanonicalUnit {
        normalize::normalize(&self.aliases, kind, raw)
    }

    /// Canonical unit for `raw` without fallback
    pub fn lookup(&self, kind: QuantityKind, raw: &str) -> Option<CanonicalUnit> {
        normalize::lookup(&self.aliases, kind, raw)
    }

    /// Like `lookup`, reporting the miss as a failure
    pub fn lookup_checked(&self, kind: QuantityKind, raw: &str) -> Result<CanonicalUnit, ConversionFailure> {
        self.lookup(kind, raw).ok_or_else(|| ConversionFailure::UnrecognizedUnit {
            kind,
            unit: raw.to_string(),
        })
    }

    pub fn convert(
        &self,
        kind: QuantityKind,
        value: f64,
        from: CanonicalUnit,
        to: CanonicalUnit,
    ) -> Result<f64, ConversionFailure> {
        engine::convert(&self.table, kind, value, from, to)
    }

    /// Resolve `input`, normalize its unit within `target`'s kind and convert.
    pub fn apply(
        &self,
        target: CanonicalUnit,
        input: &Value,
        explicit_unit: Option<&str>,
        states: &dyn StateProvider,
    ) -> Result<f64, ConversionFailure> {
        let kind = target.kind();
        let raw = RawInput::classify(input)?;
        let reading = resolve::resolve(raw, explicit_unit, states)?;
        let quantity = ResolvedQuantity {
            amount: reading.amount,
            unit: self.normalize(kind, &reading.unit),
        };
        self.convert(kind, quantity.amount, quantity.unit, target)
    }

    /// Filter definition for a name or short alias
    pub fn filter(&self, name: &str) -> Option<&'static FilterDef> {
        filters::find(name)
    }

    /// Every unit with its filter and accepted spellings, optionally for one kind
    pub fn catalog(&self, kind: Option<QuantityKind>) -> Value {
        let units = QuantityKind::ALL.iter()
            .filter(|k| kind.map_or(true, |wanted| wanted == **k))
            .flat_map(|k| k.units().iter())
            .map(|unit| {
                let mut entry = HashMap::new();
                entry.insert("kind".to_string(), Value::from(unit.kind().name()));
                entry.insert("symbol".to_string(), Value::from(unit.symbol()));
                entry.insert("name".to_string(), Value::from(unit.name()));
                entry.insert("default".to_string(), Value::Bool(unit.kind().default_unit() == *unit));
                let filter = FILTERS.iter().find(|def| def.target == *unit).map(|def| def.name);
                entry.insert("filter".to_string(), filter.map_or(Value::Null, Value::from));
                entry.insert("spellings".to_string(), Value::List(
                    self.aliases.spellings(*unit).into_iter().map(Value::from).collect()
                ));
                Value::Object(entry)
            })
            .collect();
        Value::List(units)
    }
}

impl Default for Conversions {
    fn default() -> Self {
        Self::build()
    }
}

/// Load every conversion filter and its short aliases into the registry
pub fn load_conversions_library(registry: PluginRegistry) -> PluginRegistry {
    load_with(registry, Arc::new(Conversions::build()))
}

/// Same as [`load_conversions_library`], sharing existing tables
pub fn load_with(registry: PluginRegistry, conversions: Arc<Conversions>) -> PluginRegistry {
    let registry = FILTERS.iter().fold(registry, |registry, def| {
        let registry = registry.with_function(ConversionFilter::new(def, conversions.clone()));
        def.aliases.iter().fold(registry, |registry, alias| registry.with_alias(alias, def.name))
    });
    info!(filters = FILTERS.len(), "unit conversion filters registered");
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_plugin::{EntityState, EvalContext, StateSnapshot};

    fn setup(states: StateSnapshot) -> (Arc<PluginRegistry>, EvalContext) {
        let registry = Arc::new(load_conversions_library(PluginRegistry::new()));
        let ctx = EvalContext::new(registry.clone()).with_states(Arc::new(states));
        (registry, ctx)
    }

    fn call(name: &str, args: &[Value]) -> Value {
        let (registry, ctx) = setup(StateSnapshot::new());
        registry.call_function(name, args, &ctx)
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_literal_conversions() {
        assert_eq!(call("watts", &[Value::Number(5.0), text("kW")]), Value::Number(5000.0));
        assert_eq!(call("kilowatts", &[Value::Number(5000.0), text("W")]), Value::Number(5.0));
        assert_eq!(call("celsius", &[Value::Number(32.0), text("F")]), Value::Number(0.0));
        assert_eq!(call("fahrenheit", &[Value::Number(0.0), text("C")]), Value::Number(32.0));
        assert_eq!(call("kelvin", &[Value::Number(0.0), text("C")]), Value::Number(273.15));
        assert_eq!(call("kilowatt_hours", &[Value::Number(3.6), text("MJ")]), Value::Number(1.0));

        let lpm = call("l_per_min", &[Value::Number(1.0), text("GPM")]).as_number().unwrap();
        assert!((lpm - 3.78541).abs() < 1e-5);
    }

    #[test]
    fn test_numeric_text_is_a_literal() {
        assert_eq!(call("watts", &[text("2.5"), text("kW")]), Value::Number(2500.0));
    }

    #[test]
    fn test_short_aliases() {
        assert_eq!(call("kw", &[Value::Number(5000.0), text("W")]), Value::Number(5.0));
        assert_eq!(call("KWH", &[Value::Number(1000.0), text("Wh")]), Value::Number(1.0));
        assert_eq!(call("c", &[Value::Number(212.0), text("°F")]), Value::Number(100.0));
        assert_eq!(call("g_per_min", &[Value::Number(0.0), text("L/min")]), Value::Number(0.0));
    }

    #[test]
    fn test_unit_spelling_does_not_matter() {
        for unit in ["kWh", "KWH", "kilowatt-hour", "Kilowatt Hours"] {
            assert_eq!(call("watt_hours", &[Value::Number(2.0), text(unit)]), Value::Number(2000.0), "{}", unit);
        }
    }

    #[test]
    fn test_unknown_unit_uses_default() {
        // Power defaults to W, energy to Wh
        assert_eq!(call("kilowatts", &[Value::Number(5000.0), text("furlongs")]), Value::Number(5.0));
        assert_eq!(call("kilowatt_hours", &[Value::Number(500.0), text("bogus")]), Value::Number(0.5));
        assert_eq!(call("celsius", &[Value::Number(21.0), text("")]), Value::Number(21.0));
    }

    #[test]
    fn test_failures_render_as_null() {
        assert_eq!(call("watts", &[Value::Number(5.0)]), Value::Null);
        assert_eq!(call("watts", &[text("hello"), text("kW")]), Value::Null);
        assert_eq!(call("watts", &[text("sensor.missing"), text("kW")]), Value::Null);
        assert_eq!(call("watts", &[Value::Number(5.0), Value::Number(3.0)]), Value::Null);
        assert_eq!(call("watts", &[]), Value::Null);
    }

    #[test]
    fn test_upstream_errors_pass_through() {
        let err = Value::Error(gauge_core::GaugeError::undefined_var("x"));
        assert!(call("watts", &[err, text("kW")]).is_error());
    }

    #[test]
    fn test_entity_references() {
        let states = StateSnapshot::new()
            .with_state(EntityState::new("sensor.grid_power", "2").with_unit("kW"))
            .with_state(EntityState::new("sensor.outdoor", "unavailable").with_unit("°C"))
            .with_state(EntityState::new("sensor.boiler", "50"));
        let (registry, ctx) = setup(states);
        let call = |name: &str, args: &[Value]| registry.call_function(name, args, &ctx);

        assert_eq!(call("watts", &[text("sensor.grid_power")]), Value::Number(2000.0));
        // Explicit unit overrides the declared one
        assert_eq!(call("watts", &[text("sensor.grid_power"), text("W")]), Value::Number(2.0));
        assert_eq!(call("fahrenheit", &[text("sensor.outdoor")]), Value::Null);
        // No unit anywhere: temperature default is °C
        assert_eq!(call("fahrenheit", &[text("sensor.boiler")]), Value::Number(122.0));
    }

    #[test]
    fn test_apply_reports_reason() {
        let conversions = Conversions::build();
        let states = StateSnapshot::new();
        assert_eq!(
            conversions.apply(CanonicalUnit::Watt, &Value::Number(1.0), None, &states),
            Err(ConversionFailure::MissingUnit { value: 1.0 })
        );
        assert!(matches!(
            conversions.apply(CanonicalUnit::Watt, &text("sensor.nope"), None, &states),
            Err(ConversionFailure::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_lookup_checked() {
        let conversions = Conversions::build();
        assert_eq!(conversions.lookup_checked(QuantityKind::Flow, "gpm"), Ok(CanonicalUnit::GallonPerMinute));
        assert!(matches!(
            conversions.lookup_checked(QuantityKind::Flow, "kW"),
            Err(ConversionFailure::UnrecognizedUnit { .. })
        ));
    }

    #[test]
    fn test_catalog() {
        let conversions = Conversions::build();
        let flow = conversions.catalog(Some(QuantityKind::Flow));
        let entries = flow.as_list().unwrap();
        assert_eq!(entries.len(), 4);
        let gpm = entries.iter().find(|e| e.get("symbol") == Value::from("GPM")).unwrap();
        assert_eq!(gpm.get("filter"), Value::from("gpm"));
        assert_eq!(gpm.get("default"), Value::Bool(false));
        assert_eq!(conversions.catalog(None).as_list().map(|l| l.len()), Some(22));
    }

    #[test]
    fn test_registry_metadata() {
        let registry = load_conversions_library(PluginRegistry::new());
        assert_eq!(registry.list_functions(Some("energy")).as_list().map(|l| l.len()), Some(10));
        assert_eq!(registry.list_functions(Some("temperature")).as_list().map(|l| l.len()), Some(3));
        assert_eq!(registry.aliases_for("gpm"), vec!["g_per_min".to_string()]);
        let help = registry.help(Some("kwh"));
        assert_eq!(help.get("name"), Value::Text("kilowatt_hours".to_string()));
        assert_eq!(help.get("category"), Value::Text("energy".to_string()));
    }
}
