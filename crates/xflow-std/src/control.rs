//! Control functions
//!
//! `ctrl.if` selects between two values. `ctrl.split` routes one value to
//! one of two outputs and emits a stop marker on the other, which prunes
//! every edge hanging off that output.

use xflow_engine::{Args, Callbacks, Flow, NativeFn, NativeFunction, Outputs, Result, Signature, XType};

use crate::args::{param, single, truthy, value};

/// `ctrl.if`: `data` is `true` when `condition` holds, else `false`
pub fn ctrl_if() -> NativeFunction {
    NativeFunction::new(
        "ctrl.if",
        Signature::new(
            vec![
                param("condition", XType::bool()),
                param("true", XType::auto("T")),
                param("false", XType::auto("F")),
            ],
            vec![param("data", XType::or(XType::auto("T"), XType::auto("F")))],
        ),
        run_if,
    )
}

fn run_if(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let key = if truthy(value(args, "condition")?) {
        "true"
    } else {
        "false"
    };
    Ok(single("data", value(args, key)?.clone()))
}

/// `ctrl.split`: forwards `data` on the output named by `condition`
pub fn ctrl_split() -> NativeFunction {
    NativeFunction::new(
        "ctrl.split",
        Signature::new(
            vec![
                param("condition", XType::bool().named("C")),
                param("data", XType::auto("D")),
            ],
            vec![
                param(
                    "true",
                    XType::or(XType::auto("D"), XType::stop()).named("C"),
                ),
                param(
                    "false",
                    XType::or(XType::stop(), XType::auto("D")).named("C"),
                ),
            ],
        ),
        run_split,
    )
}

fn run_split(args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    let data = Flow::Value(value(args, "data")?.clone());
    let (taken, pruned) = if truthy(value(args, "condition")?) {
        ("true", "false")
    } else {
        ("false", "true")
    };
    log::trace!("ctrl.split taking '{}'", taken);

    let mut outputs = Outputs::new();
    outputs.insert(taken.to_string(), data);
    outputs.insert(pruned.to_string(), Flow::Stop);
    Ok(outputs)
}

inventory::submit!(NativeFn(ctrl_if));
inventory::submit!(NativeFn(ctrl_split));
