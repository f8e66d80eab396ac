use super::ast::Function;
use super::value::Number;
use super::Value;

pub(crate) fn call(function: Function, args: &[Value]) -> Value {
    match function {
        Function::Min => extremum(args, |a, b| a < b),
        Function::Max => extremum(args, |a, b| a > b),
        Function::Pow => match (number(args, 0), number(args, 1)) {
            (Some(base), Some(exponent)) => finite(base.powf(exponent)),
            _ => Value::Null,
        },
        Function::Abs => match args.first().and_then(Value::to_number) {
            Some(Number::Int(v)) => v
                .checked_abs()
                .map(Value::Int)
                .unwrap_or(Value::Double((v as f64).abs())),
            Some(Number::Double(v)) => Value::Double(v.abs()),
            None => Value::Null,
        },
        Function::Sqrt => unary_float(args, f64::sqrt),
        Function::Sin => unary_float(args, f64::sin),
        Function::Cos => unary_float(args, f64::cos),
        Function::Tan => unary_float(args, f64::tan),
        Function::Atan => unary_float(args, f64::atan),
        Function::Exp => unary_float(args, f64::exp),
        Function::Log => unary_float(args, f64::ln),
        Function::Length => match args.first() {
            None | Some(Value::Null) => Value::Null,
            Some(value) => Value::Int(value.to_text().chars().count() as i64),
        },
        Function::Upper => map_text(args, |s| s.to_uppercase()),
        Function::Lower => map_text(args, |s| s.to_lowercase()),
        Function::Concat => Value::String(args.iter().map(Value::to_text).collect()),
    }
}

fn number(args: &[Value], index: usize) -> Option<f64> {
    args.get(index).and_then(Value::to_f64)
}

fn finite(v: f64) -> Value {
    if v.is_finite() {
        Value::Double(v)
    } else {
        Value::Null
    }
}

fn unary_float(args: &[Value], f: impl Fn(f64) -> f64) -> Value {
    match number(args, 0) {
        Some(v) => finite(f(v)),
        None => Value::Null,
    }
}

fn map_text(args: &[Value], f: impl Fn(&str) -> String) -> Value {
    match args.first() {
        None | Some(Value::Null) => Value::Null,
        Some(value) => Value::String(f(&value.to_text())),
    }
}

/// Returns the argument that wins every comparison, keeping its type. Any non-numeric argument
/// makes the result `null`.
fn extremum(args: &[Value], better: impl Fn(f64, f64) -> bool) -> Value {
    let mut best: Option<Number> = None;
    for arg in args {
        let Some(candidate) = arg.to_number() else {
            return Value::Null;
        };

        best = match best {
            Some(current) if !better(candidate.as_f64(), current.as_f64()) => Some(current),
            _ => Some(candidate),
        };
    }

    best.map(Value::from).unwrap_or_default()
}
