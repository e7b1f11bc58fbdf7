//! Built-in snippet language
//!
//! A small, side-effect-free expression language in the C# style:
//!
//! ```text
//! Context.Value * 2
//! String.IsNullOrEmpty(Name) ? "anonymous" : String.ToUpper(Name)
//! Items.Count > 0 && Items[0].Price >= 10.5
//! ```
//!
//! `ExpressionCompiler` is the default `Compiler` used by `ScriptExecutionService`.

pub mod ast;
pub mod eval;
pub mod parser;
pub mod stdlib;
pub mod validator;
pub mod values;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::trace;

pub use ast::Expr;
pub use eval::{eval_expr, Env, EvalResult};
pub use parser::{parse, ParseError};
pub use validator::{validate_expr, ValidationError};
pub use values::Val;

use crate::compiler::{Compiler, Script};
use crate::error::{CompileError, RuntimeFault};
use crate::types::Signature;

/// Parse and validate a snippet without binding it to any types
pub fn check(source: &str) -> Result<Expr, CompileError> {
    let expr = parse(source).map_err(|e| CompileError::new(source, e.to_string()))?;
    validate_expr(&expr).map_err(|e| CompileError::new(source, e.to_string()))?;
    Ok(expr)
}

/// Compiler for the built-in expression language
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionCompiler;

impl ExpressionCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl Compiler for ExpressionCompiler {
    fn compile(&self, source: &str, signature: &Signature) -> Result<Arc<dyn Script>, CompileError> {
        trace!(
            context = %signature.context,
            result = %signature.result,
            "compiling expression"
        );
        let expr = check(source)?;
        Ok(Arc::new(CompiledExpression { expr }))
    }
}

/// A parsed and validated expression, ready to run
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    expr: Expr,
}

impl CompiledExpression {
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

#[async_trait]
impl Script for CompiledExpression {
    async fn run(&self, context: JsonValue) -> Result<JsonValue, RuntimeFault> {
        let context = Val::from_json(context);
        let value = eval_expr(&self.expr, &Env::new(&context))?;
        value.into_json()
    }
}
