//! Alias table: every accepted spelling of a unit, per quantity kind
//!
//! Spellings are stored in normalized form, so "kilowatt-hour",
//! "Kilowatt Hour" and "KILOWATT_HOUR" all land on the same entry.

use crate::{CanonicalUnit, QuantityKind};
use std::collections::HashMap;
use tracing::error;

/// Characters dropped before lookup, besides whitespace
const STRIPPED: [char; 4] = ['°', '/', '-', '_'];

/// Reduce a raw unit token to its lookup form: no whitespace, no
/// `° / - _`, upper case.
pub fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !STRIPPED.contains(c))
        .flat_map(char::to_uppercase)
        .collect()
}

/// Two canonical units claiming the same normalized token within one kind
#[derive(Debug, Clone, PartialEq)]
pub struct AliasConflict {
    pub kind: QuantityKind,
    pub token: String,
    pub kept: CanonicalUnit,
    pub rejected: CanonicalUnit,
}

/// Per-kind mapping from normalized token to canonical unit
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: HashMap<QuantityKind, HashMap<String, CanonicalUnit>>,
    conflicts: Vec<AliasConflict>,
}

impl AliasTable {
    /// Build the table from the built-in spellings
    pub fn build() -> Self {
        let mut table = AliasTable {
            entries: HashMap::new(),
            conflicts: Vec::new(),
        };
        for (unit, spellings) in SPELLINGS {
            table.define(*unit, spellings);
        }
        table
    }

    fn define(&mut self, unit: CanonicalUnit, spellings: &[&str]) {
        let kind = unit.kind();
        let entries = self.entries.entry(kind).or_default();

        let symbol = std::iter::once(unit.symbol());
        for spelling in symbol.chain(spellings.iter().copied()) {
            let token = normalize_token(spelling);
            match entries.get(&token) {
                Some(existing) if *existing != unit => {
                    error!(%kind, token, kept = %existing, rejected = %unit, "alias collision");
                    self.conflicts.push(AliasConflict {
                        kind,
                        token,
                        kept: *existing,
                        rejected: unit,
                    });
                }
                Some(_) => {}
                None => {
                    entries.insert(token, unit);
                }
            }
        }
    }

    /// Look up an already normalized token
    pub fn get(&self, kind: QuantityKind, token: &str) -> Option<CanonicalUnit> {
        self.entries.get(&kind)?.get(token).copied()
    }

    /// Normalized spellings accepted for `unit`, sorted
    pub fn spellings(&self, unit: CanonicalUnit) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.entries.get(&unit.kind())
            .into_iter()
            .flat_map(|entries| entries.iter())
            .filter(|(_, u)| **u == unit)
            .map(|(token, _)| token.as_str())
            .collect();
        tokens.sort_unstable();
        tokens
    }

    /// Collisions found while building; empty for a healthy table
    pub fn conflicts(&self) -> &[AliasConflict] {
        &self.conflicts
    }
}

/// Spellings in natural form; each is normalized on insert.
/// The canonical symbol is always accepted and need not be repeated.
static SPELLINGS: &[(CanonicalUnit, &[&str])] = &[
    // Power
    (CanonicalUnit::Watt, &["W", "watt", "watts"]),
    (CanonicalUnit::Kilowatt, &["kW", "kilowatt", "kilowatts"]),
    (CanonicalUnit::Megawatt, &["megawatt", "megawatts"]),
    (CanonicalUnit::Horsepower, &["hp", "bhp", "horsepower", "horse power"]),
    (CanonicalUnit::BtuPerHour, &[
        "BTU/h", "btuh", "BTU per hour", "BTU per hr", "BTUs per hour", "BTU/hour",
    ]),
    // Energy
    (CanonicalUnit::Joule, &["joule", "joules"]),
    (CanonicalUnit::Kilojoule, &["kilojoule", "kilojoules"]),
    (CanonicalUnit::Megajoule, &["megajoule", "megajoules"]),
    (CanonicalUnit::Gigajoule, &["gigajoule", "gigajoules"]),
    (CanonicalUnit::WattHour, &["watt-hour", "watt-hours", "watt hour", "watt hours"]),
    (CanonicalUnit::KilowattHour, &["kilowatt-hour", "kilowatt-hours", "kilowatt hour", "kilowatt hours"]),
    (CanonicalUnit::MegawattHour, &["megawatt-hour", "megawatt-hours"]),
    (CanonicalUnit::Btu, &["BTUs", "British thermal unit", "British thermal units"]),
    (CanonicalUnit::Calorie, &["calorie", "calories"]),
    (CanonicalUnit::Kilocalorie, &["kilocalorie", "kilocalories"]),
    // Flow
    (CanonicalUnit::LitrePerMinute, &[
        "lpm", "l per min", "liter per minute", "liters per minute",
        "litre per minute", "litres per minute",
    ]),
    (CanonicalUnit::GallonPerMinute, &[
        "gal/min", "gal per min", "gallon per minute", "gallons per minute",
    ]),
    (CanonicalUnit::LitrePerSecond, &[
        "lps", "l per sec", "liter per second", "liters per second",
        "litre per second", "litres per second",
    ]),
    (CanonicalUnit::CubicMetrePerHour, &[
        "m3/h", "cmh", "cubic meter per hour", "cubic meters per hour",
        "cubic metre per hour", "cubic metres per hour",
    ]),
    // Temperature
    (CanonicalUnit::Celsius, &["C", "celsius", "centigrade", "degC", "degrees celsius"]),
    (CanonicalUnit::Fahrenheit, &["F", "fahrenheit", "degF", "degrees fahrenheit"]),
    (CanonicalUnit::Kelvin, &["°K", "kelvin", "kelvins"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("kilowatt-hour"), "KILOWATTHOUR");
        assert_eq!(normalize_token(" L / min "), "LMIN");
        assert_eq!(normalize_token("°C"), "C");
        assert_eq!(normalize_token("BTU_per_hr"), "BTUPERHR");
        assert_eq!(normalize_token("m³/h"), "M³H");
        assert_eq!(normalize_token(""), "");
    }

    #[test]
    fn test_table_has_no_conflicts() {
        let table = AliasTable::build();
        assert!(table.conflicts().is_empty(), "conflicts: {:?}", table.conflicts());
    }

    #[test]
    fn test_every_unit_has_its_symbol() {
        let table = AliasTable::build();
        for kind in QuantityKind::ALL {
            for unit in kind.units() {
                let token = normalize_token(unit.symbol());
                assert_eq!(table.get(kind, &token), Some(*unit), "symbol {}", unit);
            }
        }
    }

    #[test]
    fn test_tokens_are_scoped_by_kind() {
        let table = AliasTable::build();
        assert_eq!(table.get(QuantityKind::Temperature, "C"), Some(CanonicalUnit::Celsius));
        assert_eq!(table.get(QuantityKind::Power, "C"), None);
        assert_eq!(table.get(QuantityKind::Energy, "KW"), None);
    }

    #[test]
    fn test_spellings_for_unit() {
        let table = AliasTable::build();
        let spellings = table.spellings(CanonicalUnit::Kilowatt);
        assert_eq!(spellings, vec!["KILOWATT", "KILOWATTS", "KW"]);
    }

    #[test]
    fn test_collision_is_recorded() {
        let mut table = AliasTable::build();
        table.define(CanonicalUnit::Megawatt, &["kW"]);
        assert_eq!(table.conflicts().len(), 1);
        assert_eq!(table.conflicts()[0].kept, CanonicalUnit::Kilowatt);
        assert_eq!(table.get(QuantityKind::Power, "KW"), Some(CanonicalUnit::Kilowatt));
    }
}
