//! Conversion failures

use crate::{CanonicalUnit, QuantityKind};
use gauge_core::{codes, GaugeError, Severity};
use thiserror::Error;

/// Why a conversion produced no value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionFailure {
    #[error("no source unit given for literal value {value}")]
    MissingUnit { value: f64 },

    #[error("unrecognized {kind} unit '{unit}'")]
    UnrecognizedUnit { kind: QuantityKind, unit: String },

    #[error("entity '{entity_id}' {reason}")]
    UnresolvedReference { entity_id: String, reason: String },

    #[error("'{0}' is neither a number nor an entity id")]
    NotNumeric(String),

    #[error("cannot convert {from} to {to} as {kind}")]
    IncompatibleUnits {
        kind: QuantityKind,
        from: CanonicalUnit,
        to: CanonicalUnit,
    },
}

impl ConversionFailure {
    pub fn code(&self) -> &'static str {
        match self {
            ConversionFailure::MissingUnit { .. } => codes::MISSING_UNIT,
            ConversionFailure::UnrecognizedUnit { .. } => codes::UNRECOGNIZED_UNIT,
            ConversionFailure::UnresolvedReference { .. } => codes::UNRESOLVED_REFERENCE,
            ConversionFailure::NotNumeric(_) => codes::NOT_NUMERIC,
            ConversionFailure::IncompatibleUnits { .. } => codes::INCOMPATIBLE_UNITS,
        }
    }

    pub(crate) fn entity_missing(entity_id: &str) -> Self {
        ConversionFailure::UnresolvedReference {
            entity_id: entity_id.to_string(),
            reason: "does not exist".to_string(),
        }
    }

    pub(crate) fn entity_not_numeric(entity_id: &str, state: &serde_json::Value) -> Self {
        let shown = match state {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        ConversionFailure::UnresolvedReference {
            entity_id: entity_id.to_string(),
            reason: format!("has non-numeric state '{}'", shown),
        }
    }
}

impl From<ConversionFailure> for GaugeError {
    fn from(failure: ConversionFailure) -> Self {
        let suggestion = match &failure {
            ConversionFailure::MissingUnit { .. } => {
                Some("Pass the source unit, e.g. 5000 | kilowatts('W')".to_string())
            }
            ConversionFailure::UnrecognizedUnit { kind, .. } => {
                Some(format!("Use list_units('{}') for accepted spellings", kind))
            }
            ConversionFailure::NotNumeric(_) => {
                Some("Pass a number or an entity id like 'sensor.grid_power'".to_string())
            }
            _ => None,
        };
        let severity = match &failure {
            ConversionFailure::UnrecognizedUnit { .. } => Severity::Warning,
            _ => Severity::Error,
        };

        let mut err = GaugeError::new(failure.code(), failure.to_string()).with_severity(severity);
        if let Some(s) = suggestion {
            err = err.with_suggestion(s);
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages() {
        let f = ConversionFailure::IncompatibleUnits {
            kind: QuantityKind::Power,
            from: CanonicalUnit::Joule,
            to: CanonicalUnit::Watt,
        };
        assert_eq!(f.to_string(), "cannot convert J to W as power");

        let f = ConversionFailure::entity_not_numeric("sensor.p", &serde_json::json!("unavailable"));
        assert_eq!(f.to_string(), "entity 'sensor.p' has non-numeric state 'unavailable'");
    }

    #[test]
    fn test_into_gauge_error() {
        let err: GaugeError = ConversionFailure::MissingUnit { value: 5000.0 }.into();
        assert_eq!(err.code, codes::MISSING_UNIT);
        assert!(err.suggestion.is_some());

        let err: GaugeError = ConversionFailure::UnrecognizedUnit {
            kind: QuantityKind::Flow,
            unit: "furlongs".to_string(),
        }.into();
        assert_eq!(err.severity, Severity::Warning);
    }
}
