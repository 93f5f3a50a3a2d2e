//! Literal values

use xflow_engine::{Args, Callbacks, NativeFn, NativeFunction, Result, Signature, XType, Outputs};

use crate::args::{number, num, param, single};

/// `value.num`: passes its `value` through as `out`
///
/// Usually fed by a default value, making it a numeric literal node.
pub fn value_num() -> NativeFunction {
    NativeFunction::new(
        "value.num",
        Signature::new(
            vec![param("value", XType::num())],
            vec![param("out", XType::num())],
        ),
        run_value_num,
    )
}

fn run_value_num(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    Ok(single("out", num(number(args, "value")?)))
}

inventory::submit!(NativeFn(value_num));
