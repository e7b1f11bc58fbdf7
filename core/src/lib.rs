pub mod cache;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod lang;
pub mod runner;
pub mod service;
pub mod types;

#[cfg(test)]
pub mod test_helpers;

// Re-export main types
pub use cache::{CacheKey, CacheStats, RunnerCache};
pub use compiler::{Compiler, Script};
pub use config::{CacheConfig, Config, ConfigError, EvictionKind, RunnerConfig};
pub use error::{CompileError, RuntimeFault, ScriptError};
pub use lang::ExpressionCompiler;
pub use runner::Runner;
pub use service::ScriptExecutionService;
pub use types::{Signature, TypeDescriptor};
