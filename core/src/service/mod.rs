//! Script execution service
//!
//! The public entry point: looks up or compiles the runner for a snippet and
//! invokes it against the caller's context.
//!
//! ```no_run
//! use serde::Serialize;
//! use snippet_core::{Config, ScriptExecutionService};
//!
//! #[derive(Serialize)]
//! struct Request {
//!     #[serde(rename = "Value")]
//!     value: i64,
//! }
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ScriptExecutionService::new(&Config::default());
//! let doubled: i64 = service.invoke(&Request { value: 5 }, "Context.Value * 2").await?;
//! assert_eq!(doubled, 10);
//! # Ok(())
//! # }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, trace};

use crate::cache::{CacheKey, CacheStats, ErasedRunner, RunnerCache};
use crate::compiler::Compiler;
use crate::config::Config;
use crate::error::{RuntimeFault, ScriptError};
use crate::lang::ExpressionCompiler;
use crate::runner::Runner;

#[cfg(test)]
mod tests;

/// Compiles snippets on demand, caches the runners, and invokes them
pub struct ScriptExecutionService {
    compiler: Arc<dyn Compiler>,
    cache: RunnerCache,
    timeout: Option<Duration>,
}

impl ScriptExecutionService {
    /// Service backed by the built-in expression language
    pub fn new(config: &Config) -> Self {
        Self::with_compiler(Arc::new(ExpressionCompiler::new()), config)
    }

    /// Service backed by a custom compiler
    pub fn with_compiler(compiler: Arc<dyn Compiler>, config: &Config) -> Self {
        Self {
            compiler,
            cache: RunnerCache::new(config.cache.clone()),
            timeout: config.runner.timeout(),
        }
    }

    /// Compile (or fetch) `source` for context `C` and result `R`, then invoke it
    ///
    /// Compile errors are never cached; runtime faults leave the cached runner in place.
    pub async fn invoke<C, R>(&self, context: &C, source: &str) -> Result<R, ScriptError>
    where
        C: Serialize + Sync + 'static,
        R: DeserializeOwned + 'static,
    {
        let runner = self.runner::<C, R>(source).await?;

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, runner.invoke(context))
                .await
                .map_err(|_| RuntimeFault::Timeout(limit))?,
            None => runner.invoke(context).await,
        };

        result.map_err(|fault| {
            trace!(error = %fault, "invocation faulted");
            ScriptError::Runtime(fault)
        })
    }

    /// The shared runner for `source` bound to `C` and `R`, compiling on first use
    pub async fn runner<C, R>(&self, source: &str) -> Result<Arc<Runner<C, R>>, ScriptError>
    where
        C: Serialize + 'static,
        R: DeserializeOwned + 'static,
    {
        let key = CacheKey::for_types::<C, R>(source);

        let compiler = Arc::clone(&self.compiler);
        let signature = key.signature();
        let owned_source = source.to_string();
        let entry = self
            .cache
            .get_or_create(key.clone(), move || {
                let script = compiler.compile(&owned_source, &signature)?;
                Ok(Arc::new(Runner::<C, R>::new(script)) as ErasedRunner)
            })
            .await?;

        entry.downcast::<Runner<C, R>>().ok_or_else(|| {
            error!(
                key = %key,
                expected = %signature,
                "cached runner does not match the requested signature, invariant violated"
            );
            ScriptError::CacheCorruption {
                fingerprint: key.fingerprint(),
                expected: signature,
            }
        })
    }

    /// Compile `source` for `C` and `R` ahead of the first invocation
    pub async fn precompile<C, R>(&self, source: &str) -> Result<(), ScriptError>
    where
        C: Serialize + 'static,
        R: DeserializeOwned + 'static,
    {
        self.runner::<C, R>(source).await.map(|_| ())
    }

    pub fn cache(&self) -> &RunnerCache {
        &self.cache
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for ScriptExecutionService {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl std::fmt::Debug for ScriptExecutionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptExecutionService")
            .field("cache", &self.cache)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
