//! Argument access and result helpers shared by the built-ins

use serde_json::Value;
use xflow_engine::{Args, EngineError, Flow, Outputs, Param, Result, XType};

pub(crate) fn value<'a>(args: &'a Args, key: &str) -> Result<&'a Value> {
    args.get(key).ok_or_else(|| EngineError::argument(key))
}

pub(crate) fn number(args: &Args, key: &str) -> Result<f64> {
    value(args, key)?
        .as_f64()
        .ok_or_else(|| EngineError::invalid(key, "num"))
}

pub(crate) fn string<'a>(args: &'a Args, key: &str) -> Result<&'a str> {
    value(args, key)?
        .as_str()
        .ok_or_else(|| EngineError::invalid(key, "string"))
}

pub(crate) fn array<'a>(args: &'a Args, key: &str) -> Result<&'a Vec<Value>> {
    value(args, key)?
        .as_array()
        .ok_or_else(|| EngineError::invalid(key, "array"))
}

/// JSON number for `x`, integral values as integers
///
/// Non-finite results have no JSON form and become nil.
pub(crate) fn num(x: f64) -> Value {
    const SAFE: f64 = 9_007_199_254_740_992.0;
    if x.fract() == 0.0 && x.abs() < SAFE {
        Value::from(x as i64)
    } else {
        serde_json::Number::from_f64(x).map_or(Value::Null, Value::Number)
    }
}

/// Truthiness of a value: false, nil, 0, NaN and "" are false
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0 && !x.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Result record with a single value
pub(crate) fn single(key: &str, value: Value) -> Outputs {
    let mut outputs = Outputs::new();
    outputs.insert(key.to_string(), Flow::Value(value));
    outputs
}

/// Argument record for a callback invocation
pub(crate) fn record<const N: usize>(pairs: [(&str, Value); N]) -> Args {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

pub(crate) fn param(name: &str, ty: XType) -> Param {
    Param::new(name, ty)
}

/// `array<auto I>`, the element-generic array type
pub(crate) fn items() -> XType {
    XType::array(XType::auto("I"))
}
