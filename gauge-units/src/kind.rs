//! Quantity kinds and their canonical units

use serde::{Deserialize, Serialize};
use std::fmt;

/// Family of units measuring the same physical dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityKind {
    Power,
    Energy,
    Flow,
    Temperature,
}

impl QuantityKind {
    pub const ALL: [QuantityKind; 4] = [
        QuantityKind::Power,
        QuantityKind::Energy,
        QuantityKind::Flow,
        QuantityKind::Temperature,
    ];

    /// Lowercase name, also used as the filter category
    pub fn name(&self) -> &'static str {
        match self {
            QuantityKind::Power => "power",
            QuantityKind::Energy => "energy",
            QuantityKind::Flow => "flow",
            QuantityKind::Temperature => "temperature",
        }
    }

    pub fn from_name(name: &str) -> Option<QuantityKind> {
        Self::ALL.into_iter().find(|k| k.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Every canonical unit of this kind
    pub fn units(&self) -> &'static [CanonicalUnit] {
        use CanonicalUnit::*;
        match self {
            QuantityKind::Power => &[Watt, Kilowatt, Megawatt, Horsepower, BtuPerHour],
            QuantityKind::Energy => &[
                Joule, Kilojoule, Megajoule, Gigajoule,
                WattHour, KilowattHour, MegawattHour,
                Btu, Calorie, Kilocalorie,
            ],
            QuantityKind::Flow => &[LitrePerMinute, GallonPerMinute, LitrePerSecond, CubicMetrePerHour],
            QuantityKind::Temperature => &[Celsius, Fahrenheit, Kelvin],
        }
    }

    /// Unit assumed when a source unit cannot be recognized.
    ///
    /// Power: W. Energy: Wh. Flow: L/min. Temperature: °C.
    pub fn default_unit(&self) -> CanonicalUnit {
        match self {
            QuantityKind::Power => CanonicalUnit::Watt,
            QuantityKind::Energy => CanonicalUnit::WattHour,
            QuantityKind::Flow => CanonicalUnit::LitrePerMinute,
            QuantityKind::Temperature => CanonicalUnit::Celsius,
        }
    }
}

impl fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Internal identifier of one unit after alias resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalUnit {
    // Power
    Watt,
    Kilowatt,
    Megawatt,
    Horsepower,
    BtuPerHour,
    // Energy
    Joule,
    Kilojoule,
    Megajoule,
    Gigajoule,
    WattHour,
    KilowattHour,
    MegawattHour,
    Btu,
    Calorie,
    Kilocalorie,
    // Flow
    LitrePerMinute,
    GallonPerMinute,
    LitrePerSecond,
    CubicMetrePerHour,
    // Temperature
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl CanonicalUnit {
    pub fn kind(&self) -> QuantityKind {
        use CanonicalUnit::*;
        match self {
            Watt | Kilowatt | Megawatt | Horsepower | BtuPerHour => QuantityKind::Power,
            Joule | Kilojoule | Megajoule | Gigajoule
            | WattHour | KilowattHour | MegawattHour
            | Btu | Calorie | Kilocalorie => QuantityKind::Energy,
            LitrePerMinute | GallonPerMinute | LitrePerSecond | CubicMetrePerHour => QuantityKind::Flow,
            Celsius | Fahrenheit | Kelvin => QuantityKind::Temperature,
        }
    }

    /// Display symbol
    pub fn symbol(&self) -> &'static str {
        use CanonicalUnit::*;
        match self {
            Watt => "W",
            Kilowatt => "kW",
            Megawatt => "MW",
            Horsepower => "HP",
            BtuPerHour => "BTU/hr",
            Joule => "J",
            Kilojoule => "kJ",
            Megajoule => "MJ",
            Gigajoule => "GJ",
            WattHour => "Wh",
            KilowattHour => "kWh",
            MegawattHour => "MWh",
            Btu => "BTU",
            Calorie => "cal",
            Kilocalorie => "kcal",
            LitrePerMinute => "L/min",
            GallonPerMinute => "GPM",
            LitrePerSecond => "L/s",
            CubicMetrePerHour => "m³/h",
            Celsius => "°C",
            Fahrenheit => "°F",
            Kelvin => "K",
        }
    }

    pub fn name(&self) -> &'static str {
        use CanonicalUnit::*;
        match self {
            Watt => "watt",
            Kilowatt => "kilowatt",
            Megawatt => "megawatt",
            Horsepower => "mechanical horsepower",
            BtuPerHour => "BTU per hour",
            Joule => "joule",
            Kilojoule => "kilojoule",
            Megajoule => "megajoule",
            Gigajoule => "gigajoule",
            WattHour => "watt-hour",
            KilowattHour => "kilowatt-hour",
            MegawattHour => "megawatt-hour",
            Btu => "British thermal unit",
            Calorie => "calorie",
            Kilocalorie => "kilocalorie",
            LitrePerMinute => "litre per minute",
            GallonPerMinute => "US gallon per minute",
            LitrePerSecond => "litre per second",
            CubicMetrePerHour => "cubic metre per hour",
            Celsius => "degree Celsius",
            Fahrenheit => "degree Fahrenheit",
            Kelvin => "kelvin",
        }
    }
}

impl fmt::Display for CanonicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
