//! String namespace

use super::{arg, list_arg, str_arg};
use crate::lang::eval::EvalResult;
use crate::lang::values::Val;

pub fn to_upper(args: &[Val]) -> EvalResult {
    Ok(Val::Str(str_arg(args, 0, "String.ToUpper")?.to_uppercase()))
}

pub fn to_lower(args: &[Val]) -> EvalResult {
    Ok(Val::Str(str_arg(args, 0, "String.ToLower")?.to_lowercase()))
}

pub fn trim(args: &[Val]) -> EvalResult {
    Ok(Val::Str(str_arg(args, 0, "String.Trim")?.trim().to_string()))
}

pub fn contains(args: &[Val]) -> EvalResult {
    let haystack = str_arg(args, 0, "String.Contains")?;
    let needle = str_arg(args, 1, "String.Contains")?;
    Ok(Val::Bool(haystack.contains(needle)))
}

pub fn starts_with(args: &[Val]) -> EvalResult {
    let s = str_arg(args, 0, "String.StartsWith")?;
    let prefix = str_arg(args, 1, "String.StartsWith")?;
    Ok(Val::Bool(s.starts_with(prefix)))
}

pub fn ends_with(args: &[Val]) -> EvalResult {
    let s = str_arg(args, 0, "String.EndsWith")?;
    let suffix = str_arg(args, 1, "String.EndsWith")?;
    Ok(Val::Bool(s.ends_with(suffix)))
}

/// String.IsNullOrEmpty(x) - accepts null as well as strings
pub fn is_null_or_empty(args: &[Val]) -> EvalResult {
    match arg(args, 0, "String.IsNullOrEmpty")? {
        Val::Null => Ok(Val::Bool(true)),
        _ => Ok(Val::Bool(str_arg(args, 0, "String.IsNullOrEmpty")?.is_empty())),
    }
}

/// String.Join(separator, list)
pub fn join(args: &[Val]) -> EvalResult {
    let separator = str_arg(args, 0, "String.Join")?;
    let items = list_arg(args, 1, "String.Join")?;
    let joined = items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(separator);
    Ok(Val::Str(joined))
}

pub fn concat(args: &[Val]) -> EvalResult {
    Ok(Val::Str(args.iter().map(|a| a.to_string()).collect()))
}
