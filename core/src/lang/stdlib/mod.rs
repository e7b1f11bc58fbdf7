//! Helper namespaces available to snippets
//!
//! Functions are addressed as `Namespace.Function(args)` and resolved at compile time,
//! so an unknown name or a wrong argument count is a compile error rather than a fault.

pub mod list;
pub mod math;
pub mod system;
pub mod text;

use serde::{Deserialize, Serialize};

use super::eval::EvalResult;
use super::values::Val;
use crate::error::RuntimeFault;

/// Namespaces that can only appear as the target of a call
pub const NAMESPACES: &[&str] = &["Math", "String", "List", "Guid", "DateTime"];

/* ===================== Standard Library Function Types ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StdlibFunc {
    MathAbs,
    MathFloor,
    MathCeiling,
    MathRound,
    MathMin,
    MathMax,
    MathPow,
    MathSqrt,
    StringToUpper,
    StringToLower,
    StringTrim,
    StringContains,
    StringStartsWith,
    StringEndsWith,
    StringIsNullOrEmpty,
    StringJoin,
    StringConcat,
    ListCount,
    ListSum,
    ListContains,
    GuidNewGuid,
    DateTimeUtcNow,
    DateTimeUnixMillis,
}

impl StdlibFunc {
    /// Resolve `namespace.name` to a function
    pub fn lookup(namespace: &str, name: &str) -> Option<Self> {
        let func = match (namespace, name) {
            ("Math", "Abs") => StdlibFunc::MathAbs,
            ("Math", "Floor") => StdlibFunc::MathFloor,
            ("Math", "Ceiling") => StdlibFunc::MathCeiling,
            ("Math", "Round") => StdlibFunc::MathRound,
            ("Math", "Min") => StdlibFunc::MathMin,
            ("Math", "Max") => StdlibFunc::MathMax,
            ("Math", "Pow") => StdlibFunc::MathPow,
            ("Math", "Sqrt") => StdlibFunc::MathSqrt,
            ("String", "ToUpper") => StdlibFunc::StringToUpper,
            ("String", "ToLower") => StdlibFunc::StringToLower,
            ("String", "Trim") => StdlibFunc::StringTrim,
            ("String", "Contains") => StdlibFunc::StringContains,
            ("String", "StartsWith") => StdlibFunc::StringStartsWith,
            ("String", "EndsWith") => StdlibFunc::StringEndsWith,
            ("String", "IsNullOrEmpty") => StdlibFunc::StringIsNullOrEmpty,
            ("String", "Join") => StdlibFunc::StringJoin,
            ("String", "Concat") => StdlibFunc::StringConcat,
            ("List", "Count") => StdlibFunc::ListCount,
            ("List", "Sum") => StdlibFunc::ListSum,
            ("List", "Contains") => StdlibFunc::ListContains,
            ("Guid", "NewGuid") => StdlibFunc::GuidNewGuid,
            ("DateTime", "UtcNow") => StdlibFunc::DateTimeUtcNow,
            ("DateTime", "UnixMillis") => StdlibFunc::DateTimeUnixMillis,
            _ => return None,
        };
        Some(func)
    }

    /// Accepted argument count as `(min, max)`; `None` means variadic
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            StdlibFunc::GuidNewGuid | StdlibFunc::DateTimeUtcNow | StdlibFunc::DateTimeUnixMillis => {
                (0, Some(0))
            }
            StdlibFunc::MathAbs
            | StdlibFunc::MathFloor
            | StdlibFunc::MathCeiling
            | StdlibFunc::MathSqrt
            | StdlibFunc::StringToUpper
            | StdlibFunc::StringToLower
            | StdlibFunc::StringTrim
            | StdlibFunc::StringIsNullOrEmpty
            | StdlibFunc::ListCount
            | StdlibFunc::ListSum => (1, Some(1)),
            StdlibFunc::MathRound => (1, Some(2)),
            StdlibFunc::MathMin
            | StdlibFunc::MathMax
            | StdlibFunc::MathPow
            | StdlibFunc::StringContains
            | StdlibFunc::StringStartsWith
            | StdlibFunc::StringEndsWith
            | StdlibFunc::StringJoin
            | StdlibFunc::ListContains => (2, Some(2)),
            StdlibFunc::StringConcat => (0, None),
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        let (min, max) = self.arity();
        count >= min && max.map_or(true, |max| count <= max)
    }
}

pub fn is_namespace(name: &str) -> bool {
    NAMESPACES.contains(&name)
}

/* ===================== Stdlib Dispatcher ===================== */

/// Call a standard library function with evaluated arguments
pub fn call_stdlib_func(func: StdlibFunc, args: &[Val]) -> EvalResult {
    match func {
        StdlibFunc::MathAbs => math::abs(args),
        StdlibFunc::MathFloor => math::floor(args),
        StdlibFunc::MathCeiling => math::ceiling(args),
        StdlibFunc::MathRound => math::round(args),
        StdlibFunc::MathMin => math::min(args),
        StdlibFunc::MathMax => math::max(args),
        StdlibFunc::MathPow => math::pow(args),
        StdlibFunc::MathSqrt => math::sqrt(args),
        StdlibFunc::StringToUpper => text::to_upper(args),
        StdlibFunc::StringToLower => text::to_lower(args),
        StdlibFunc::StringTrim => text::trim(args),
        StdlibFunc::StringContains => text::contains(args),
        StdlibFunc::StringStartsWith => text::starts_with(args),
        StdlibFunc::StringEndsWith => text::ends_with(args),
        StdlibFunc::StringIsNullOrEmpty => text::is_null_or_empty(args),
        StdlibFunc::StringJoin => text::join(args),
        StdlibFunc::StringConcat => text::concat(args),
        StdlibFunc::ListCount => list::count(args),
        StdlibFunc::ListSum => list::sum(args),
        StdlibFunc::ListContains => list::contains(args),
        StdlibFunc::GuidNewGuid => system::new_guid(),
        StdlibFunc::DateTimeUtcNow => system::utc_now(),
        StdlibFunc::DateTimeUnixMillis => system::unix_millis(),
    }
}

/* ===================== Argument Helpers ===================== */

pub(crate) fn arg<'a>(args: &'a [Val], index: usize, func: &str) -> Result<&'a Val, RuntimeFault> {
    args.get(index).ok_or_else(|| {
        RuntimeFault::evaluation(format!("{}() is missing argument {}", func, index + 1))
    })
}

pub(crate) fn number_arg(args: &[Val], index: usize, func: &str) -> Result<f64, RuntimeFault> {
    let value = arg(args, index, func)?;
    value.as_f64().ok_or_else(|| {
        RuntimeFault::evaluation(format!(
            "{}() expects a number for argument {}, got {}",
            func,
            index + 1,
            value.type_name()
        ))
    })
}

pub(crate) fn str_arg<'a>(args: &'a [Val], index: usize, func: &str) -> Result<&'a str, RuntimeFault> {
    match arg(args, index, func)? {
        Val::Str(s) => Ok(s),
        other => Err(RuntimeFault::evaluation(format!(
            "{}() expects a string for argument {}, got {}",
            func,
            index + 1,
            other.type_name()
        ))),
    }
}

pub(crate) fn list_arg<'a>(
    args: &'a [Val],
    index: usize,
    func: &str,
) -> Result<&'a [Val], RuntimeFault> {
    match arg(args, index, func)? {
        Val::List(items) => Ok(items),
        other => Err(RuntimeFault::evaluation(format!(
            "{}() expects a list for argument {}, got {}",
            func,
            index + 1,
            other.type_name()
        ))),
    }
}
