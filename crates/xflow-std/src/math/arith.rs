//! Arithmetic, logarithms and rounding

use xflow_engine::{Args, Callbacks, NativeFn, NativeFunction, Outputs, Result, Signature, XType};

use crate::args::{num, number, param, single};

fn binary(name: &'static str, op: fn(f64, f64) -> f64) -> NativeFunction {
    NativeFunction::new(
        name,
        Signature::new(
            vec![param("a", XType::num()), param("b", XType::num())],
            vec![param("result", XType::num())],
        ),
        move |args: &Args, _cb: &mut Callbacks<'_, '_>| -> Result<Outputs> {
            let result = op(number(args, "a")?, number(args, "b")?);
            Ok(single("result", num(result)))
        },
    )
}

fn unary(name: &'static str, output: &'static str, op: fn(f64) -> f64) -> NativeFunction {
    NativeFunction::new(
        name,
        Signature::new(
            vec![param("a", XType::num())],
            vec![param(output, XType::num())],
        ),
        move |args: &Args, _cb: &mut Callbacks<'_, '_>| -> Result<Outputs> {
            Ok(single(output, num(op(number(args, "a")?))))
        },
    )
}

pub fn add() -> NativeFunction {
    binary("math.add", |a, b| a + b)
}

pub fn multiply() -> NativeFunction {
    binary("math.multiply", |a, b| a * b)
}

pub fn subtract() -> NativeFunction {
    binary("math.subtract", |a, b| a - b)
}

/// Division by zero yields a non-finite number, emitted as nil
pub fn divide() -> NativeFunction {
    binary("math.divide", |a, b| a / b)
}

pub fn power() -> NativeFunction {
    binary("math.power", f64::powf)
}

/// Logarithm of `b` in base `a`
pub fn log() -> NativeFunction {
    binary("math.log", |a, b| b.ln() / a.ln())
}

pub fn max() -> NativeFunction {
    binary("math.max", f64::max)
}

pub fn min() -> NativeFunction {
    binary("math.min", f64::min)
}

pub fn lg() -> NativeFunction {
    unary("math.lg", "result", f64::log10)
}

pub fn log2() -> NativeFunction {
    unary("math.log2", "result", f64::log2)
}

pub fn ln() -> NativeFunction {
    unary("math.ln", "result", f64::ln)
}

pub fn exp() -> NativeFunction {
    unary("math.exp", "result", f64::exp)
}

pub fn floor() -> NativeFunction {
    unary("math.floor", "out", f64::floor)
}

pub fn ceil() -> NativeFunction {
    unary("math.ceil", "out", f64::ceil)
}

/// Rounds half-way cases toward positive infinity (-2.5 -> -2)
pub fn round() -> NativeFunction {
    unary("math.round", "out", round_half_up)
}

fn round_half_up(x: f64) -> f64 {
    if (x - x.trunc()).abs() == 0.5 {
        x.ceil()
    } else {
        x.round()
    }
}

/// Uniform number in `[0, 1)`
pub fn random() -> NativeFunction {
    NativeFunction::new(
        "math.random",
        Signature::new(vec![], vec![param("result", XType::num())]),
        run_random,
    )
}

fn run_random(_args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
    Ok(single("result", num(rand::random::<f64>())))
}

inventory::submit!(NativeFn(add));
inventory::submit!(NativeFn(multiply));
inventory::submit!(NativeFn(subtract));
inventory::submit!(NativeFn(divide));
inventory::submit!(NativeFn(power));
inventory::submit!(NativeFn(log));
inventory::submit!(NativeFn(lg));
inventory::submit!(NativeFn(log2));
inventory::submit!(NativeFn(ln));
inventory::submit!(NativeFn(exp));
inventory::submit!(NativeFn(max));
inventory::submit!(NativeFn(min));
inventory::submit!(NativeFn(random));
inventory::submit!(NativeFn(floor));
inventory::submit!(NativeFn(ceil));
inventory::submit!(NativeFn(round));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(round_half_up(1.2), 1.0);
    }

    #[test]
    fn test_descriptors() {
        let add = add();
        assert_eq!(add.name, "math.add");
        assert_eq!(add.signature.input_names(), vec!["a", "b"]);
        assert_eq!(add.signature.output_names(), vec!["result"]);

        assert_eq!(floor().signature.output_names(), vec!["out"]);
        assert_eq!(lg().signature.input_names(), vec!["a"]);
        assert!(random().signature.input.is_empty());
    }
}
