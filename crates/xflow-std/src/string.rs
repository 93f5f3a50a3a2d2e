//! String functions

use serde_json::Value;
use xflow_engine::{
    Args, Callbacks, EngineError, NativeFn, NativeFunction, Outputs, Result, Signature, XType,
};

use crate::args::{array, number, param, single, string};

/// `str.split`: splits `str` on single spaces
pub fn split() -> NativeFunction {
    NativeFunction::new(
        "str.split",
        Signature::new(
            vec![param("str", XType::string())],
            vec![param("arr", XType::array(XType::string()))],
        ),
        run_split,
    )
}

fn run_split(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let parts = string(args, "str")?
        .split(' ')
        .map(|part| Value::String(part.to_string()))
        .collect();
    Ok(single("arr", Value::Array(parts)))
}

/// `str.join`: joins the items of `arr` with `sep`
pub fn join() -> NativeFunction {
    NativeFunction::new(
        "str.join",
        Signature::new(
            vec![
                param("arr", XType::array(XType::string())),
                param("sep", XType::string()),
            ],
            vec![param("str", XType::string())],
        ),
        run_join,
    )
}

fn run_join(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let sep = string(args, "sep")?;
    let joined = array(args, "arr")?
        .iter()
        .map(display)
        .collect::<Vec<_>>()
        .join(sep);
    Ok(single("str", Value::String(joined)))
}

/// Text form of an item being joined; nil joins as the empty string
fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// `str.repeat`: `str` concatenated `repeatNum` times
pub fn repeat() -> NativeFunction {
    NativeFunction::new(
        "str.repeat",
        Signature::new(
            vec![
                param("str", XType::string()),
                param("repeatNum", XType::num()),
            ],
            vec![param("str", XType::string())],
        ),
        run_repeat,
    )
}

fn run_repeat(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let text = string(args, "str")?;
    let count = number(args, "repeatNum")?.trunc();
    if !count.is_finite() || count < 0.0 {
        return Err(EngineError::invalid("repeatNum", "a non-negative count"));
    }
    Ok(single("str", Value::String(text.repeat(count as usize))))
}

inventory::submit!(NativeFn(split));
inventory::submit!(NativeFn(join));
inventory::submit!(NativeFn(repeat));

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        assert_eq!(display(&json!("a")), "a");
        assert_eq!(display(&json!(null)), "");
        assert_eq!(display(&json!(3)), "3");
        assert_eq!(display(&json!(true)), "true");
        assert_eq!(display(&json!([1, "b", [2]])), "1,b,2");
    }

    #[test]
    fn test_descriptors() {
        // the input and output namespaces are separate, so "str" may be both
        let repeat = repeat();
        assert!(repeat.signature.check_consistency().is_empty());
        assert!(repeat.signature.has_input("str"));
        assert!(repeat.signature.has_output("str"));
        assert_eq!(split().signature.output_names(), vec!["arr"]);
    }
}
