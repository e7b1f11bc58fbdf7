//! List namespace

use super::{arg, list_arg};
use crate::error::RuntimeFault;
use crate::lang::eval::EvalResult;
use crate::lang::values::Val;

pub fn count(args: &[Val]) -> EvalResult {
    let items = list_arg(args, 0, "List.Count")?;
    Ok(Val::Int(items.len() as i64))
}

/// List.Sum(xs) - integer sum unless any element is a float
pub fn sum(args: &[Val]) -> EvalResult {
    let items = list_arg(args, 0, "List.Sum")?;

    let mut total = Val::Int(0);
    for item in items {
        total = match (total, item) {
            (Val::Int(a), Val::Int(b)) => a
                .checked_add(*b)
                .map(Val::Int)
                .ok_or_else(|| RuntimeFault::evaluation("List.Sum() overflowed"))?,
            (acc, item) => match (acc.as_f64(), item.as_f64()) {
                (Some(a), Some(b)) => Val::Float(a + b),
                _ => {
                    return Err(RuntimeFault::evaluation(format!(
                        "List.Sum() expects numbers, got {}",
                        item.type_name()
                    )))
                }
            },
        };
    }

    Ok(total)
}

pub fn contains(args: &[Val]) -> EvalResult {
    let items = list_arg(args, 0, "List.Contains")?;
    let needle = arg(args, 1, "List.Contains")?;
    Ok(Val::Bool(items.iter().any(|item| item.loosely_equals(needle))))
}
