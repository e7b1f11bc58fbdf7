//! Error taxonomy for compiling and running snippets

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::types::Signature;

/// A snippet could not be turned into a runner
///
/// Never cached: the next request for the same snippet compiles again.
#[derive(Debug, Clone, Error)]
#[error("compile error: {diagnostic}")]
pub struct CompileError {
    source_text: Arc<str>,
    diagnostic: String,
}

impl CompileError {
    pub fn new(source_text: impl Into<Arc<str>>, diagnostic: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            diagnostic: diagnostic.into(),
        }
    }

    /// The snippet that failed to compile
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }
}

/// A compiled snippet failed while being invoked
///
/// Faults are per call; the cached runner stays valid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeFault {
    #[error("{0}")]
    Evaluation(String),

    #[error("failed to bind context: {0}")]
    ContextBinding(String),

    #[error("result cannot be converted to `{expected}`: {message}")]
    ResultConversion {
        expected: &'static str,
        message: String,
    },

    #[error("invocation timed out after {0:?}")]
    Timeout(Duration),
}

impl RuntimeFault {
    pub fn evaluation(message: impl Into<String>) -> Self {
        RuntimeFault::Evaluation(message.into())
    }
}

/// Everything `ScriptExecutionService::invoke` can fail with
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeFault),

    /// A cache hit held a runner bound to other types than the ones requested
    ///
    /// Keys carry the full signature, so this only happens when the cache was
    /// populated behind the service's back. It is fatal: the entry stays wrong
    /// until it is removed, so retrying the same call fails the same way.
    /// Callers should treat it like a bug report, see [`ScriptError::is_fatal`].
    #[error("cached runner {fingerprint} is not bound to {expected}")]
    CacheCorruption {
        fingerprint: String,
        expected: Signature,
    },
}

impl ScriptError {
    pub fn is_compile_error(&self) -> bool {
        matches!(self, ScriptError::Compile(_))
    }

    pub fn is_runtime_fault(&self) -> bool {
        matches!(self, ScriptError::Runtime(_))
    }

    /// Internal invariant violations; never worth retrying
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScriptError::CacheCorruption { .. })
    }
}
