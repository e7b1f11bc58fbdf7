//! Math namespace

use super::{arg, number_arg};
use crate::error::RuntimeFault;
use crate::lang::eval::EvalResult;
use crate::lang::values::Val;

/// Math.Abs(x) - keeps integers integral
pub fn abs(args: &[Val]) -> EvalResult {
    match arg(args, 0, "Math.Abs")? {
        Val::Int(i) => i
            .checked_abs()
            .map(Val::Int)
            .ok_or_else(|| RuntimeFault::evaluation("Math.Abs() overflowed")),
        _ => Ok(Val::Float(number_arg(args, 0, "Math.Abs")?.abs())),
    }
}

pub fn floor(args: &[Val]) -> EvalResult {
    integral(args, "Math.Floor", f64::floor)
}

pub fn ceiling(args: &[Val]) -> EvalResult {
    integral(args, "Math.Ceiling", f64::ceil)
}

/// Math.Round(x) or Math.Round(x, digits)
pub fn round(args: &[Val]) -> EvalResult {
    let x = number_arg(args, 0, "Math.Round")?;
    if args.len() < 2 {
        return integral(args, "Math.Round", f64::round);
    }

    let digits = match arg(args, 1, "Math.Round")? {
        Val::Int(d) if (0..=15).contains(d) => *d as i32,
        _ => {
            return Err(RuntimeFault::evaluation(
                "Math.Round() digits must be an integer between 0 and 15",
            ))
        }
    };
    let scale = 10f64.powi(digits);
    Ok(Val::Float((x * scale).round() / scale))
}

pub fn min(args: &[Val]) -> EvalResult {
    pick(args, "Math.Min", |a, b| a <= b)
}

pub fn max(args: &[Val]) -> EvalResult {
    pick(args, "Math.Max", |a, b| a >= b)
}

pub fn pow(args: &[Val]) -> EvalResult {
    let base = number_arg(args, 0, "Math.Pow")?;
    let exponent = number_arg(args, 1, "Math.Pow")?;
    Ok(Val::Float(base.powf(exponent)))
}

pub fn sqrt(args: &[Val]) -> EvalResult {
    let x = number_arg(args, 0, "Math.Sqrt")?;
    if x < 0.0 {
        return Err(RuntimeFault::evaluation(
            "Math.Sqrt() of a negative number",
        ));
    }
    Ok(Val::Float(x.sqrt()))
}

/// Integers pass through untouched; floats are rounded by `op`
fn integral(args: &[Val], func: &str, op: fn(f64) -> f64) -> EvalResult {
    match arg(args, 0, func)? {
        Val::Int(i) => Ok(Val::Int(*i)),
        _ => Ok(Val::Float(op(number_arg(args, 0, func)?))),
    }
}

/// Return whichever argument wins `keep_first`, preserving its numeric kind
fn pick(args: &[Val], func: &str, keep_first: fn(f64, f64) -> bool) -> EvalResult {
    let a = number_arg(args, 0, func)?;
    let b = number_arg(args, 1, func)?;
    let winner = if keep_first(a, b) { &args[0] } else { &args[1] };
    Ok(winner.clone())
}
