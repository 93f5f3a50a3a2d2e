//! Indexing, slicing and reversal

use serde_json::Value;
use xflow_engine::{
    Args, Callbacks, NativeFn, NativeFunction, Outputs, Param, Result, Signature, XType,
};

use crate::args::{array, items, number, param, single};

fn item_or_nil() -> XType {
    XType::or(XType::auto("I"), XType::nil())
}

/// Clamp a position to `0..=len`, truncating fractions; NaN counts as 0
fn clamp(position: f64, len: usize) -> usize {
    if position.is_nan() || position <= 0.0 {
        0
    } else {
        (position.trunc() as usize).min(len)
    }
}

/// `array.at`: item at a non-negative integer `index`, else nil
pub fn at() -> NativeFunction {
    NativeFunction::new(
        "array.at",
        Signature::new(
            vec![param("arr", items()), param("index", XType::num())],
            vec![param("item", item_or_nil())],
        ),
        run_at,
    )
}

fn run_at(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let arr = array(args, "arr")?;
    let index = number(args, "index")?;
    let item = if index >= 0.0 && index.fract() == 0.0 {
        arr.get(index as usize).cloned()
    } else {
        None
    };
    Ok(single("item", item.unwrap_or(Value::Null)))
}

/// `array.at2`: like `array.at`, but negative indexes count from the end
pub fn at2() -> NativeFunction {
    NativeFunction::new(
        "array.at2",
        Signature::new(
            vec![param("arr", items()), param("index", XType::num())],
            vec![param("item", item_or_nil())],
        ),
        run_at2,
    )
}

fn run_at2(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let arr = array(args, "arr")?;
    let index = number(args, "index")?;
    let index = if index.is_nan() { 0.0 } else { index.trunc() };
    let resolved = if index < 0.0 {
        arr.len() as f64 + index
    } else {
        index
    };
    let item = if resolved >= 0.0 {
        arr.get(resolved as usize).cloned()
    } else {
        None
    };
    Ok(single("item", item.unwrap_or(Value::Null)))
}

fn sub_array() -> Vec<Param> {
    vec![param("subArray", items())]
}

/// `array.slice`: items from `from` up to (not including) `to`, clamped
pub fn slice() -> NativeFunction {
    NativeFunction::new(
        "array.slice",
        Signature::new(
            vec![
                param("arr", items()),
                param("from", XType::num()),
                param("to", XType::num()),
            ],
            sub_array(),
        ),
        run_slice,
    )
}

fn run_slice(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let arr = array(args, "arr")?;
    let from = clamp(number(args, "from")?, arr.len());
    let to = clamp(number(args, "to")?, arr.len());
    let sub = if from < to { arr[from..to].to_vec() } else { Vec::new() };
    Ok(single("subArray", Value::Array(sub)))
}

/// `array.sliceStart`: the first `len` items
pub fn slice_start() -> NativeFunction {
    NativeFunction::new(
        "array.sliceStart",
        Signature::new(
            vec![param("arr", items()), param("len", XType::num())],
            sub_array(),
        ),
        run_slice_start,
    )
}

fn run_slice_start(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let arr = array(args, "arr")?;
    let len = clamp(number(args, "len")?, arr.len());
    Ok(single("subArray", Value::Array(arr[..len].to_vec())))
}

/// `array.sliceEnd`: the last `len` items
pub fn slice_end() -> NativeFunction {
    NativeFunction::new(
        "array.sliceEnd",
        Signature::new(
            vec![param("arr", items()), param("len", XType::num())],
            sub_array(),
        ),
        run_slice_end,
    )
}

fn run_slice_end(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let arr = array(args, "arr")?;
    let len = clamp(number(args, "len")?, arr.len());
    Ok(single("subArray", Value::Array(arr[arr.len() - len..].to_vec())))
}

/// `array.reverse`: a reversed copy of `arr`
pub fn reverse() -> NativeFunction {
    NativeFunction::new(
        "array.reverse",
        Signature::new(vec![param("arr", items())], vec![param("arr", items())]),
        run_reverse,
    )
}

fn run_reverse(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let reversed = array(args, "arr")?.iter().rev().cloned().collect();
    Ok(single("arr", Value::Array(reversed)))
}

inventory::submit!(NativeFn(at));
inventory::submit!(NativeFn(at2));
inventory::submit!(NativeFn(slice));
inventory::submit!(NativeFn(slice_start));
inventory::submit!(NativeFn(slice_end));
inventory::submit!(NativeFn(reverse));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(-3.0, 5), 0);
        assert_eq!(clamp(2.7, 5), 2);
        assert_eq!(clamp(9.0, 5), 5);
        assert_eq!(clamp(f64::NAN, 5), 0);
        assert_eq!(clamp(f64::INFINITY, 5), 5);
    }

    #[test]
    fn test_descriptors() {
        assert_eq!(at2().signature.output_names(), vec!["item"]);
        assert_eq!(slice().signature.input_names(), vec!["arr", "from", "to"]);
        assert_eq!(slice_end().signature.output_names(), vec!["subArray"]);
    }
}
