//! Higher-order array functions
//!
//! Each declares a single callback `cb`. The callback body receives the
//! current item as `item` (sort: `itemA`/`itemB`, reduce: `prev`/`item`)
//! and must produce `callback`.

use serde_json::Value;
use xflow_engine::{
    Args, CallbackSignature, Callbacks, EngineError, NativeFn, NativeFunction, Outputs, Param,
    Result, Signature, XType,
};

use crate::args::{array, items, param, record, single, truthy};

const CALLBACK: &str = "cb";
const RESULT: &str = "callback";

fn with_callback(output: Param, input: Vec<Param>, result: XType) -> Signature {
    Signature::new(vec![param("arr", items())], vec![output]).with_callback(
        CALLBACK,
        CallbackSignature::new(input, vec![param(RESULT, result)]),
    )
}

fn per_item(output: Param, result: XType) -> Signature {
    with_callback(output, vec![param("item", XType::auto("I"))], result)
}

/// Invoke the callback on one item
fn apply(callbacks: &mut Callbacks<'_, '_>, item: &Value) -> Result<Value> {
    callbacks.call_for(CALLBACK, record([("item", item.clone())]), RESULT)
}

/// `array.map`: the callback result for every item
pub fn map() -> NativeFunction {
    NativeFunction::new(
        "array.map",
        per_item(
            param("arr", XType::array(XType::auto("O"))),
            XType::auto("O"),
        ),
        run_map,
    )
}

fn run_map(args: &Args, callbacks: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let mapped = array(args, "arr")?
        .iter()
        .map(|item| apply(callbacks, item))
        .collect::<Result<Vec<_>>>()?;
    Ok(single("arr", Value::Array(mapped)))
}

/// `array.filter`: items whose callback result is truthy
pub fn filter() -> NativeFunction {
    NativeFunction::new(
        "array.filter",
        per_item(param("arr", items()), XType::bool()),
        run_filter,
    )
}

fn run_filter(args: &Args, callbacks: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let mut kept = Vec::new();
    for item in array(args, "arr")? {
        if truthy(&apply(callbacks, item)?) {
            kept.push(item.clone());
        }
    }
    Ok(single("arr", Value::Array(kept)))
}

/// `array.find`: the first item whose callback result is truthy, else nil
pub fn find() -> NativeFunction {
    NativeFunction::new(
        "array.find",
        per_item(
            param("result", XType::or(XType::auto("I"), XType::nil())),
            XType::bool(),
        ),
        run_find,
    )
}

fn run_find(args: &Args, callbacks: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    for item in array(args, "arr")? {
        if truthy(&apply(callbacks, item)?) {
            return Ok(single("result", item.clone()));
        }
    }
    Ok(single("result", Value::Null))
}

/// `array.findIndex`: position of the first match, else nil
pub fn find_index() -> NativeFunction {
    NativeFunction::new(
        "array.findIndex",
        per_item(
            param("index", XType::or(XType::num(), XType::nil())),
            XType::bool(),
        ),
        run_find_index,
    )
}

fn run_find_index(args: &Args, callbacks: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    for (index, item) in array(args, "arr")?.iter().enumerate() {
        if truthy(&apply(callbacks, item)?) {
            return Ok(single("index", Value::from(index)));
        }
    }
    Ok(single("index", Value::Null))
}

/// `array.reduce`: folds from the first item as the initial accumulator
pub fn reduce() -> NativeFunction {
    NativeFunction::new(
        "array.reduce",
        with_callback(
            param("out", XType::auto("I")),
            vec![
                param("prev", XType::auto("I")),
                param("item", XType::auto("I")),
            ],
            XType::auto("O"),
        ),
        run_reduce,
    )
}

fn run_reduce(args: &Args, callbacks: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let arr = array(args, "arr")?;
    let Some((first, rest)) = arr.split_first() else {
        return Err(EngineError::failed("reduce of an empty array"));
    };
    let mut acc = first.clone();
    for item in rest {
        acc = callbacks.call_for(
            CALLBACK,
            record([("prev", acc), ("item", item.clone())]),
            RESULT,
        )?;
    }
    Ok(single("out", acc))
}

/// `array.sort`: stable sort; a positive callback result puts `itemB` first
pub fn sort() -> NativeFunction {
    NativeFunction::new(
        "array.sort",
        with_callback(
            param("arr", items()),
            vec![
                param("itemA", XType::auto("I")),
                param("itemB", XType::auto("I")),
            ],
            XType::num(),
        ),
        run_sort,
    )
}

fn run_sort(args: &Args, callbacks: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let mut compare = |a: &Value, b: &Value| -> Result<f64> {
        callbacks
            .call_for(
                CALLBACK,
                record([("itemA", a.clone()), ("itemB", b.clone())]),
                RESULT,
            )?
            .as_f64()
            .ok_or_else(|| EngineError::invalid(RESULT, "num"))
    };
    let sorted = merge_sort(array(args, "arr")?.clone(), &mut compare)?;
    Ok(single("arr", Value::Array(sorted)))
}

/// Stable merge sort with a fallible comparator
fn merge_sort<F>(mut items: Vec<Value>, compare: &mut F) -> Result<Vec<Value>>
where
    F: FnMut(&Value, &Value) -> Result<f64>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, compare)?;
    let right = merge_sort(right, compare)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => compare(a, b)? > 0.0,
            _ => break,
        };
        merged.extend(if take_right { right.next() } else { left.next() });
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

inventory::submit!(NativeFn(sort));
inventory::submit!(NativeFn(map));
inventory::submit!(NativeFn(reduce));
inventory::submit!(NativeFn(filter));
inventory::submit!(NativeFn(find));
inventory::submit!(NativeFn(find_index));
