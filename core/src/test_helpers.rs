//! Test helpers shared across modules
//!
//! `CountingCompiler` wraps the expression compiler so tests can observe how many
//! compiles actually happened, slow them down, or make the first few fail.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::compiler::{Compiler, Script};
use crate::error::{CompileError, RuntimeFault};
use crate::lang::ExpressionCompiler;
use crate::types::Signature;

#[derive(Debug, Default)]
pub struct CountingCompiler {
    compiles: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Duration,
}

impl CountingCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every compile sleeps for `delay` on the blocking pool first
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    /// The first `failures` compiles fail regardless of the source
    pub fn failing_first(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicUsize::new(failures),
            ..Self::default()
        })
    }

    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }
}

impl Compiler for CountingCompiler {
    fn compile(&self, source: &str, signature: &Signature) -> Result<Arc<dyn Script>, CompileError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(CompileError::new(source, "transient compiler failure"));
        }

        ExpressionCompiler::new().compile(source, signature)
    }
}

/// Compiler whose scripts sleep before echoing their context back
#[derive(Debug, Clone, Copy)]
pub struct SleepyCompiler {
    pub run_for: Duration,
}

struct SleepyScript {
    run_for: Duration,
}

#[async_trait]
impl Script for SleepyScript {
    async fn run(&self, context: JsonValue) -> Result<JsonValue, RuntimeFault> {
        tokio::time::sleep(self.run_for).await;
        Ok(context)
    }
}

impl Compiler for SleepyCompiler {
    fn compile(&self, _source: &str, _signature: &Signature) -> Result<Arc<dyn Script>, CompileError> {
        Ok(Arc::new(SleepyScript {
            run_for: self.run_for,
        }))
    }
}
