//! Numeric comparisons

use xflow_engine::{Args, Callbacks, NativeFn, NativeFunction, Outputs, Result, Signature, XType};

use crate::args::{number, param, single};

fn comparison(name: &'static str, op: fn(f64, f64) -> bool) -> NativeFunction {
    NativeFunction::new(
        name,
        Signature::new(
            vec![param("a", XType::num()), param("b", XType::num())],
            vec![param("out", XType::bool())],
        ),
        move |args: &Args, _cb: &mut Callbacks<'_, '_>| -> Result<Outputs> {
            let out = op(number(args, "a")?, number(args, "b")?);
            Ok(single("out", out.into()))
        },
    )
}

pub fn eq() -> NativeFunction {
    comparison("math.eq", |a, b| a == b)
}

pub fn neq() -> NativeFunction {
    comparison("math.neq", |a, b| a != b)
}

pub fn less() -> NativeFunction {
    comparison("math.less", |a, b| a < b)
}

pub fn greater() -> NativeFunction {
    comparison("math.greater", |a, b| a > b)
}

pub fn less_eq() -> NativeFunction {
    comparison("math.lessEq", |a, b| a <= b)
}

pub fn greater_eq() -> NativeFunction {
    comparison("math.greaterEq", |a, b| a >= b)
}

inventory::submit!(NativeFn(eq));
inventory::submit!(NativeFn(neq));
inventory::submit!(NativeFn(less));
inventory::submit!(NativeFn(greater));
inventory::submit!(NativeFn(less_eq));
inventory::submit!(NativeFn(greater_eq));
