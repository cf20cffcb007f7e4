//! Conversion engine

use crate::failure::ConversionFailure;
use crate::table::{ConversionRule, ConversionTable};
use crate::{CanonicalUnit, QuantityKind};
use tracing::debug;

/// Convert `value` from `from` to `to`, both of `kind`.
///
/// Scale rules go through the kind's base unit as `value * from / to`.
/// Temperatures go through Celsius.
pub fn convert(
    table: &ConversionTable,
    kind: QuantityKind,
    value: f64,
    from: CanonicalUnit,
    to: CanonicalUnit,
) -> Result<f64, ConversionFailure> {
    let incompatible = || ConversionFailure::IncompatibleUnits { kind, from, to };

    let from_rule = table.rule(kind, from).ok_or_else(incompatible)?;
    let to_rule = table.rule(kind, to).ok_or_else(incompatible)?;

    if from == to {
        return Ok(value);
    }

    let result = match (from_rule, to_rule) {
        (ConversionRule::Scale(a), ConversionRule::Scale(b)) => value * a / b,
        (ConversionRule::Affine { to_base, .. }, ConversionRule::Affine { from_base, .. }) => {
            from_base(to_base(value))
        }
        _ => return Err(incompatible()),
    };

    debug!(%kind, value, %from, %to, result, "converted");
    Ok(result)
}
