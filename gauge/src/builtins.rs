//! Builtin filters templates lean on alongside the conversions

use gauge_plugin::prelude::*;

pub struct Round;
pub struct Float;

static ROUND_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("value", "Number", "Value to round"),
    ArgMeta::optional("precision", "Number", "Decimal places", "0"),
];
static ROUND_EXAMPLES: [&str; 2] = [
    "3.14159 | round(2) → 3.14",
    "'sensor.grid_power' | kilowatts | round(1)",
];

static FLOAT_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("value", "Any", "Value to read as a number"),
    ArgMeta::optional("default", "Number", "Result when value is not numeric", "0.0"),
];
static FLOAT_EXAMPLES: [&str; 2] = ["'21.5' | float → 21.5", "'unknown' | float(-1) → -1.0"];

/// Largest precision `round` honours; f64 has no more to give
const MAX_PRECISION: f64 = 15.0;

impl FunctionPlugin for Round {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "round",
            description: "Round to a number of decimal places; None stays None",
            usage: "value | round(precision)",
            args: &ROUND_ARGS,
            returns: "Number or None",
            examples: &ROUND_EXAMPLES,
            category: "builtin",
            related: &["float"],
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        if args.is_empty() || args.len() > 2 {
            return Value::Error(GaugeError::arg_count("round", 2, args.len()));
        }
        let n = match &args[0] {
            Value::Number(n) => *n,
            Value::Null => return Value::Null,
            Value::Error(e) => return Value::Error(e.clone()),
            other => return Value::Error(GaugeError::arg_type("round", "value", "Number", other.type_name())),
        };
        let places = match args.get(1) {
            None => 0.0,
            Some(Value::Number(p)) => p.trunc().clamp(0.0, MAX_PRECISION),
            Some(other) => {
                return Value::Error(GaugeError::arg_type("round", "precision", "Number", other.type_name()))
            }
        };

        let factor = 10f64.powi(places as i32);
        Value::Number((n * factor).round() / factor)
    }
}

impl FunctionPlugin for Float {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "float",
            description: "Read a value as a number, or return the default",
            usage: "value | float(default)",
            args: &FLOAT_ARGS,
            returns: "Number",
            examples: &FLOAT_EXAMPLES,
            category: "builtin",
            related: &["round"],
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let default = match args.get(1) {
            None => Value::Number(0.0),
            Some(v) => v.clone(),
        };
        match args.first().map(Value::to_number) {
            Some(Value::Number(n)) => Value::Number(n),
            _ => default,
        }
    }
}
