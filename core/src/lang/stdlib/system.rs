//! Guid and DateTime namespaces
//!
//! Handy for mock payloads; these are the only helpers whose output is not a pure
//! function of the arguments.

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use crate::lang::eval::EvalResult;
use crate::lang::values::Val;

/// Guid.NewGuid() - random v4 UUID in hyphenated form
pub fn new_guid() -> EvalResult {
    Ok(Val::Str(Uuid::new_v4().to_string()))
}

/// DateTime.UtcNow() - current time as RFC 3339 with millisecond precision
pub fn utc_now() -> EvalResult {
    Ok(Val::Str(
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    ))
}

pub fn unix_millis() -> EvalResult {
    Ok(Val::Int(Utc::now().timestamp_millis()))
}
