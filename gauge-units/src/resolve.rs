//! Value resolver: literal numbers or entity references to an amount and unit token

use crate::failure::ConversionFailure;
use gauge_core::Value;
use gauge_plugin::StateProvider;

/// What a filter was handed, before any state lookup
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    Literal(f64),
    /// Entity id such as `sensor.grid_power`
    Reference(String),
}

impl RawInput {
    /// Classify a template value.
    ///
    /// Numbers and numeric text are literals, text shaped like an entity id is a
    /// reference, anything else fails with `NotNumeric`.
    pub fn classify(value: &Value) -> Result<RawInput, ConversionFailure> {
        match value {
            Value::Number(n) if n.is_finite() => Ok(RawInput::Literal(*n)),
            Value::Text(s) => Self::classify_text(s),
            other => Err(ConversionFailure::NotNumeric(other.to_string())),
        }
    }

    fn classify_text(text: &str) -> Result<RawInput, ConversionFailure> {
        let trimmed = text.trim();
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Ok(RawInput::Literal(n));
            }
        }
        if is_entity_id(trimmed) {
            return Ok(RawInput::Reference(trimmed.to_string()));
        }
        Err(ConversionFailure::NotNumeric(text.to_string()))
    }
}

/// Amount plus the unit text it was expressed in, not yet normalized
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub amount: f64,
    /// Empty when a reference declares no unit and none was given
    pub unit: String,
}

/// Turn `input` into a reading.
///
/// `explicit_unit` always wins over a reference's declared unit. Literals
/// without one fail with `MissingUnit`. The provider is read once per call.
pub fn resolve(
    input: RawInput,
    explicit_unit: Option<&str>,
    states: &dyn StateProvider,
) -> Result<Reading, ConversionFailure> {
    match input {
        RawInput::Literal(amount) => match explicit_unit {
            Some(unit) => Ok(Reading { amount, unit: unit.to_string() }),
            None => Err(ConversionFailure::MissingUnit { value: amount }),
        },
        RawInput::Reference(entity_id) => {
            let entity = states.state(&entity_id)
                .ok_or_else(|| ConversionFailure::entity_missing(&entity_id))?;
            let amount = entity.numeric_state()
                .ok_or_else(|| ConversionFailure::entity_not_numeric(&entity_id, &entity.state))?;
            let unit = explicit_unit
                .or_else(|| entity.unit_of_measurement())
                .unwrap_or_default()
                .to_string();
            Ok(Reading { amount, unit })
        }
    }
}

/// `domain.object_id`, lowercase ASCII letters, digits and underscores.
///
/// Neither part may start or end with `_`, and the domain may not contain `__`.
pub fn is_entity_id(text: &str) -> bool {
    let Some((domain, object_id)) = text.split_once('.') else {
        return false;
    };
    is_slug(domain) && !domain.contains("__") && is_slug(object_id)
}

fn is_slug(part: &str) -> bool {
    !part.is_empty()
        && !part.starts_with('_')
        && !part.ends_with('_')
        && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}
