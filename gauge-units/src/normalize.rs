//! Unit normalizer: raw unit text to a canonical unit of a known kind

use crate::alias::{normalize_token, AliasTable};
use crate::{CanonicalUnit, QuantityKind};
use tracing::warn;

/// Table lookup without fallback
pub fn lookup(aliases: &AliasTable, kind: QuantityKind, raw: &str) -> Option<CanonicalUnit> {
    aliases.get(kind, &normalize_token(raw))
}

/// Resolve `raw` within `kind`, falling back to the kind's default unit.
///
/// The fallback is logged; an empty token takes the same path.
pub fn normalize(aliases: &AliasTable, kind: QuantityKind, raw: &str) -> CanonicalUnit {
    lookup(aliases, kind, raw).unwrap_or_else(|| {
        let fallback = kind.default_unit();
        warn!(%kind, unit = raw, %fallback, "unrecognized unit, assuming default");
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use CanonicalUnit::*;

    fn aliases() -> AliasTable {
        AliasTable::build()
    }

    #[test]
    fn test_spelling_variants_agree() {
        let a = aliases();
        let cases: &[(QuantityKind, &[&str], CanonicalUnit)] = &[
            (QuantityKind::Power, &["kW", "KW", "kw", " k W ", "kilowatt", "Kilowatts"], Kilowatt),
            (QuantityKind::Power, &["BTU/hr", "btu/h", "BTU per hour", "btu_per_hour"], BtuPerHour),
            (QuantityKind::Energy, &["kWh", "KWH", "kilowatt-hour", "Kilowatt Hours", "kilowatt_hour"], KilowattHour),
            (QuantityKind::Energy, &["BTU", "btu", "BTUs"], Btu),
            (QuantityKind::Flow, &["L/min", "l/min", "LPM", "litres per minute"], LitrePerMinute),
            (QuantityKind::Flow, &["GPM", "gal/min", "gallons per minute"], GallonPerMinute),
            (QuantityKind::Flow, &["m³/h", "m3/h", "M3H"], CubicMetrePerHour),
            (QuantityKind::Temperature, &["°C", "C", "c", "celsius", "degC"], Celsius),
            (QuantityKind::Temperature, &["°F", "F", "Fahrenheit"], Fahrenheit),
            (QuantityKind::Temperature, &["K", "°K", "kelvin"], Kelvin),
        ];
        for (kind, spellings, expected) in cases {
            for s in spellings.iter() {
                assert_eq!(normalize(&a, *kind, s), *expected, "spelling {:?}", s);
            }
        }
    }

    #[test]
    fn test_unknown_unit_falls_back_to_default() {
        let a = aliases();
        assert_eq!(normalize(&a, QuantityKind::Power, "furlongs"), Watt);
        assert_eq!(normalize(&a, QuantityKind::Energy, "furlongs"), WattHour);
        assert_eq!(normalize(&a, QuantityKind::Flow, ""), LitrePerMinute);
        assert_eq!(normalize(&a, QuantityKind::Temperature, "   "), Celsius);
    }

    #[test]
    fn test_kind_comes_from_caller() {
        let a = aliases();
        // "C" is Celsius for temperature but unknown as power
        assert_eq!(normalize(&a, QuantityKind::Power, "C"), Watt);
        assert_eq!(lookup(&a, QuantityKind::Power, "C"), None);
        assert_eq!(lookup(&a, QuantityKind::Temperature, "C"), Some(Celsius));
    }
}
