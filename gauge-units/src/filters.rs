//! Conversion filters: one named operation per target unit

use crate::{CanonicalUnit, Conversions, QuantityKind};
use gauge_plugin::prelude::*;
use std::sync::Arc;
use tracing::warn;

/// Static description of one conversion filter
#[derive(Debug)]
pub struct FilterDef {
    pub name: &'static str,
    pub target: CanonicalUnit,
    pub description: &'static str,
    pub usage: &'static str,
    pub examples: &'static [&'static str],
    /// Short names registered alongside `name`
    pub aliases: &'static [&'static str],
}

impl FilterDef {
    pub fn kind(&self) -> QuantityKind {
        self.target.kind()
    }
}

static CONVERSION_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("value", "Number | Text", "Number, numeric text, or entity id like 'sensor.grid_power'"),
    ArgMeta::optional("unit", "Text", "Source unit; required for numbers, overrides an entity's unit_of_measurement", "entity unit"),
];

/// Filter that converts its input to one fixed unit
pub struct ConversionFilter {
    def: &'static FilterDef,
    conversions: Arc<Conversions>,
}

impl ConversionFilter {
    pub fn new(def: &'static FilterDef, conversions: Arc<Conversions>) -> Self {
        Self { def, conversions }
    }
}

impl FunctionPlugin for ConversionFilter {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: self.def.name,
            description: self.def.description,
            usage: self.def.usage,
            args: &CONVERSION_ARGS,
            returns: "Number or None",
            examples: self.def.examples,
            category: self.def.kind().name(),
            related: &[],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let name = self.def.name;
        let input = match args.first() {
            Some(Value::Error(e)) => return Value::Error(e.clone()),
            Some(v) => v,
            None => {
                warn!(filter = name, "called without a value, returning None");
                return Value::Null;
            }
        };

        let unit = match args.get(1) {
            None | Some(Value::Null) => None,
            Some(Value::Text(s)) => Some(s.as_str()),
            Some(Value::Error(e)) => return Value::Error(e.clone()),
            Some(other) => {
                warn!(filter = name, unit = %other, "unit must be text, returning None");
                return Value::Null;
            }
        };

        match self.conversions.apply(self.def.target, input, unit, ctx.states.as_ref()) {
            Ok(n) => Value::Number(n),
            Err(failure) => {
                warn!(filter = name, input = %input, code = failure.code(), "{}, returning None", failure);
                Value::Null
            }
        }
    }
}

macro_rules! filter {
    ($name:literal, $target:ident, $desc:literal, [$($alias:literal),*], [$($ex:literal),*]) => {
        FilterDef {
            name: $name,
            target: CanonicalUnit::$target,
            description: $desc,
            usage: concat!("value | ", $name, "(unit)  or  ", $name, "(value, unit)"),
            examples: &[$($ex),*],
            aliases: &[$($alias),*],
        }
    };
}

/// Every conversion filter, grouped by kind
pub static FILTERS: [FilterDef; 22] = [
    // Power
    filter!("watts", Watt, "Convert power to watts", ["w"],
        ["2 | watts('kW') → 2000.0", "'sensor.grid_power' | watts"]),
    filter!("kilowatts", Kilowatt, "Convert power to kilowatts", ["kw"],
        ["5000 | kilowatts('W') → 5.0"]),
    filter!("megawatts", Megawatt, "Convert power to megawatts", [],
        ["1500 | megawatts('kW') → 1.5"]),
    filter!("horsepower", Horsepower, "Convert power to mechanical horsepower", ["hp"],
        ["745.699872 | horsepower('W') → 1.0"]),
    filter!("btu_per_hour", BtuPerHour, "Convert power to BTU per hour", [],
        ["1 | btu_per_hour('kW') → 3412.14"]),
    // Energy
    filter!("joules", Joule, "Convert energy to joules", ["j"],
        ["1 | joules('Wh') → 3600.0"]),
    filter!("kilojoules", Kilojoule, "Convert energy to kilojoules", ["kj"],
        ["1 | kilojoules('kcal') → 4.184"]),
    filter!("megajoules", Megajoule, "Convert energy to megajoules", ["mj"],
        ["1 | megajoules('kWh') → 3.6"]),
    filter!("gigajoules", Gigajoule, "Convert energy to gigajoules", [],
        ["1 | gigajoules('MWh') → 3.6"]),
    filter!("watt_hours", WattHour, "Convert energy to watt-hours", ["wh"],
        ["1.5 | watt_hours('kWh') → 1500.0"]),
    filter!("kilowatt_hours", KilowattHour, "Convert energy to kilowatt-hours", ["kwh"],
        ["3.6 | kilowatt_hours('MJ') → 1.0", "'sensor.house_energy' | kilowatt_hours"]),
    filter!("megawatt_hours", MegawattHour, "Convert energy to megawatt-hours", [],
        ["2500 | megawatt_hours('kWh') → 2.5"]),
    filter!("btu_energy", Btu, "Convert energy to British thermal units", ["btu"],
        ["1 | btu_energy('kWh') → 3412.14"]),
    filter!("calories", Calorie, "Convert energy to calories", [],
        ["4.184 | calories('J') → 1.0"]),
    filter!("kilocalories", Kilocalorie, "Convert energy to kilocalories", [],
        ["1 | kilocalories('kWh') → 860.42"]),
    // Flow
    filter!("l_per_min", LitrePerMinute, "Convert flow to litres per minute", ["lpm"],
        ["1 | l_per_min('GPM') → 3.78541"]),
    filter!("gpm", GallonPerMinute, "Convert flow to US gallons per minute", ["g_per_min"],
        ["10 | gpm('L/min') → 2.64172"]),
    filter!("l_per_sec", LitrePerSecond, "Convert flow to litres per second", [],
        ["120 | l_per_sec('L/min') → 2.0"]),
    filter!("m3_per_hour", CubicMetrePerHour, "Convert flow to cubic metres per hour", [],
        ["1 | m3_per_hour('L/s') → 3.6"]),
    // Temperature
    filter!("celsius", Celsius, "Convert temperature to degrees Celsius", ["c"],
        ["32 | celsius('F') → 0.0", "'sensor.outdoor_temp' | celsius"]),
    filter!("fahrenheit", Fahrenheit, "Convert temperature to degrees Fahrenheit", ["f"],
        ["100 | fahrenheit('C') → 212.0"]),
    filter!("kelvin", Kelvin, "Convert temperature to kelvin", ["k"],
        ["0 | kelvin('C') → 273.15"]),
];

/// Definition for a filter name or alias, case-insensitive
pub fn find(name: &str) -> Option<&'static FilterDef> {
    FILTERS.iter().find(|def| {
        def.name.eq_ignore_ascii_case(name)
            || def.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    })
}
