//! Test helpers for the snippet language

use crate::error::RuntimeFault;
use crate::lang::{check, eval_expr, Env, EvalResult, Val};
use serde_json::Value as JsonValue;

/// Parse, validate and evaluate `source` against a JSON context
pub fn eval_with(source: &str, context: JsonValue) -> EvalResult {
    let expr = check(source).expect("Snippet failed to compile");
    let context = Val::from_json(context);
    eval_expr(&expr, &Env::new(&context))
}

/// Evaluate a snippet that does not read its context
pub fn eval(source: &str) -> Val {
    eval_with(source, JsonValue::Null).expect("Evaluation faulted")
}

/// Evaluate a snippet that is expected to fault and return the message
pub fn eval_fault(source: &str) -> String {
    match eval_with(source, JsonValue::Null) {
        Err(RuntimeFault::Evaluation(message)) => message,
        other => panic!("Expected evaluation fault, got {:?}", other),
    }
}
