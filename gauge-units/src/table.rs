//! Conversion table: how each canonical unit relates to its kind's base unit

use crate::{CanonicalUnit, QuantityKind};
use std::collections::HashMap;

/// Watts in one mechanical horsepower
pub const WATTS_PER_HORSEPOWER: f64 = 745.699872;
/// Joules in one International Table BTU
pub const JOULES_PER_BTU: f64 = 1055.06;
/// Joules in one thermochemical calorie
pub const JOULES_PER_CALORIE: f64 = 4.184;
/// Litres in one US liquid gallon
pub const LITRES_PER_GALLON: f64 = 3.785411784;
pub const ABSOLUTE_ZERO_CELSIUS: f64 = -273.15;

/// Relation between a unit and the base unit of its kind
#[derive(Debug, Clone, Copy)]
pub enum ConversionRule {
    /// `value_in_base = value * factor`
    Scale(f64),
    /// Non-proportional scale, pivoting through the base (°C)
    Affine {
        to_base: fn(f64) -> f64,
        from_base: fn(f64) -> f64,
    },
}

impl ConversionRule {
    pub fn is_affine(&self) -> bool {
        matches!(self, ConversionRule::Affine { .. })
    }
}

#[derive(Debug, Clone)]
struct KindTable {
    base: CanonicalUnit,
    rules: HashMap<CanonicalUnit, ConversionRule>,
}

/// Per-kind conversion rules, keyed by canonical unit
#[derive(Debug, Clone)]
pub struct ConversionTable {
    kinds: HashMap<QuantityKind, KindTable>,
}

impl ConversionTable {
    /// Build the table for power, energy, flow and temperature
    pub fn build() -> Self {
        use CanonicalUnit::*;
        use ConversionRule::*;

        let mut table = ConversionTable { kinds: HashMap::new() };

        table.define(Watt, &[
            (Watt, Scale(1.0)),
            (Kilowatt, Scale(1e3)),
            (Megawatt, Scale(1e6)),
            (Horsepower, Scale(WATTS_PER_HORSEPOWER)),
            (BtuPerHour, Scale(JOULES_PER_BTU / 3600.0)),
        ]);

        table.define(Joule, &[
            (Joule, Scale(1.0)),
            (Kilojoule, Scale(1e3)),
            (Megajoule, Scale(1e6)),
            (Gigajoule, Scale(1e9)),
            (WattHour, Scale(3600.0)),
            (KilowattHour, Scale(3.6e6)),
            (MegawattHour, Scale(3.6e9)),
            (Btu, Scale(JOULES_PER_BTU)),
            (Calorie, Scale(JOULES_PER_CALORIE)),
            (Kilocalorie, Scale(JOULES_PER_CALORIE * 1e3)),
        ]);

        table.define(LitrePerMinute, &[
            (LitrePerMinute, Scale(1.0)),
            (GallonPerMinute, Scale(LITRES_PER_GALLON)),
            (LitrePerSecond, Scale(60.0)),
            (CubicMetrePerHour, Scale(1000.0 / 60.0)),
        ]);

        table.define(Celsius, &[
            (Celsius, Affine { to_base: identity, from_base: identity }),
            (Fahrenheit, Affine { to_base: fahrenheit_to_celsius, from_base: celsius_to_fahrenheit }),
            (Kelvin, Affine { to_base: kelvin_to_celsius, from_base: celsius_to_kelvin }),
        ]);

        table
    }

    fn define(&mut self, base: CanonicalUnit, rules: &[(CanonicalUnit, ConversionRule)]) {
        self.kinds.insert(base.kind(), KindTable {
            base,
            rules: rules.iter().copied().collect(),
        });
    }

    /// Rule for `unit` within `kind`; `None` when the unit is not of that kind
    pub fn rule(&self, kind: QuantityKind, unit: CanonicalUnit) -> Option<ConversionRule> {
        self.kinds.get(&kind)?.rules.get(&unit).copied()
    }

    pub fn base_unit(&self, kind: QuantityKind) -> Option<CanonicalUnit> {
        self.kinds.get(&kind).map(|k| k.base)
    }

    /// Whether every unit of every kind has a rule
    pub fn is_complete(&self) -> bool {
        QuantityKind::ALL.iter().all(|kind| {
            kind.units().iter().all(|unit| self.rule(*kind, *unit).is_some())
        })
    }
}

fn identity(v: f64) -> f64 {
    v
}

fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

fn kelvin_to_celsius(k: f64) -> f64 {
    k + ABSOLUTE_ZERO_CELSIUS
}

fn celsius_to_kelvin(c: f64) -> f64 {
    c - ABSOLUTE_ZERO_CELSIUS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_unit() {
        assert!(ConversionTable::build().is_complete());
    }

    #[test]
    fn test_base_units() {
        let table = ConversionTable::build();
        assert_eq!(table.base_unit(QuantityKind::Power), Some(CanonicalUnit::Watt));
        assert_eq!(table.base_unit(QuantityKind::Energy), Some(CanonicalUnit::Joule));
        assert_eq!(table.base_unit(QuantityKind::Flow), Some(CanonicalUnit::LitrePerMinute));
        assert_eq!(table.base_unit(QuantityKind::Temperature), Some(CanonicalUnit::Celsius));
    }

    #[test]
    fn test_rules_are_scoped_by_kind() {
        let table = ConversionTable::build();
        assert!(table.rule(QuantityKind::Power, CanonicalUnit::Joule).is_none());
        assert!(table.rule(QuantityKind::Temperature, CanonicalUnit::Kelvin).unwrap().is_affine());
        assert!(!table.rule(QuantityKind::Flow, CanonicalUnit::GallonPerMinute).unwrap().is_affine());
    }

    #[test]
    fn test_temperature_formulas() {
        assert_eq!(fahrenheit_to_celsius(212.0), 100.0);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(celsius_to_kelvin(0.0), 273.15);
        assert_eq!(kelvin_to_celsius(273.15), 0.0);
    }
}
