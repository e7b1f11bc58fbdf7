//! Compiler seam
//!
//! A `Compiler` turns source text into a `Script`, the type-erased executable unit.
//! Scripts speak JSON at their boundary; `Runner` layers the caller's Rust types on
//! top of that.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::error::{CompileError, RuntimeFault};
use crate::types::Signature;

/// Compiles snippets into scripts
///
/// Implementations must be free of observable side effects: the cache may call
/// `compile` again for the same source after a failure, and never calls it twice
/// concurrently for one key.
pub trait Compiler: Send + Sync + 'static {
    fn compile(&self, source: &str, signature: &Signature) -> Result<Arc<dyn Script>, CompileError>;
}

/// A compiled snippet
///
/// Holds no mutable state between runs and may be run from many tasks at once.
#[async_trait]
pub trait Script: Send + Sync {
    async fn run(&self, context: JsonValue) -> Result<JsonValue, RuntimeFault>;
}
