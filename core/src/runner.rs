//! Typed runners over compiled scripts

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::compiler::Script;
use crate::error::RuntimeFault;
use crate::types::Signature;

/// A compiled snippet bound to a context type `C` and a result type `R`
///
/// Runners are immutable and shared through the cache; `invoke` can be called
/// concurrently from any number of tasks.
pub struct Runner<C, R> {
    script: Arc<dyn Script>,
    signature: Signature,
    _types: PhantomData<fn(&C) -> R>,
}

impl<C, R> Runner<C, R>
where
    C: Serialize + 'static,
    R: DeserializeOwned + 'static,
{
    pub fn new(script: Arc<dyn Script>) -> Self {
        Self {
            script,
            signature: Signature::of::<C, R>(),
            _types: PhantomData,
        }
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Run the snippet against `context`
    ///
    /// The context is bound through serde, and the script's output must
    /// deserialize into `R`.
    pub async fn invoke(&self, context: &C) -> Result<R, RuntimeFault> {
        let bound = serde_json::to_value(context)
            .map_err(|e| RuntimeFault::ContextBinding(e.to_string()))?;

        let output = self.script.run(bound).await?;

        serde_json::from_value(output).map_err(|e| RuntimeFault::ResultConversion {
            expected: self.signature.result.name(),
            message: e.to_string(),
        })
    }
}

impl<C, R> fmt::Debug for Runner<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::lang::ExpressionCompiler;
    use serde::Deserialize;

    #[derive(Serialize)]
    struct Order {
        quantity: i64,
        price: f64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Summary {
        total: f64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Line {
        quantity: i64,
        price: f64,
    }

    fn runner<C: Serialize + 'static, R: DeserializeOwned + 'static>(source: &str) -> Runner<C, R> {
        let script = ExpressionCompiler::new()
            .compile(source, &Signature::of::<C, R>())
            .expect("compile failed");
        Runner::new(script)
    }

    #[tokio::test]
    async fn test_invoke_binds_context_fields() {
        let runner = runner::<Order, f64>("quantity * price");
        let total = runner
            .invoke(&Order {
                quantity: 3,
                price: 2.5,
            })
            .await
            .unwrap();
        assert_eq!(total, 7.5);
    }

    #[tokio::test]
    async fn test_invoke_converts_structured_result() {
        let runner = runner::<Order, Line>("Context");
        let line = runner
            .invoke(&Order {
                quantity: 4,
                price: 1.25,
            })
            .await
            .unwrap();
        assert_eq!(
            line,
            Line {
                quantity: 4,
                price: 1.25,
            }
        );
    }

    #[tokio::test]
    async fn test_invoke_rejects_result_missing_fields() {
        let runner = runner::<Order, Summary>("Context");
        let err = runner
            .invoke(&Order {
                quantity: 1,
                price: 1.0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeFault::ResultConversion { .. }));
    }

    #[tokio::test]
    async fn test_result_conversion_failure_names_type() {
        let runner = runner::<Order, bool>("quantity");
        let err = runner
            .invoke(&Order {
                quantity: 1,
                price: 1.0,
            })
            .await
            .unwrap_err();
        match err {
            RuntimeFault::ResultConversion { expected, .. } => assert_eq!(expected, "bool"),
            other => panic!("Expected ResultConversion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_runner_is_reusable_across_contexts() {
        let runner = runner::<Order, i64>("quantity + 1");
        for quantity in 0..5 {
            let out = runner.invoke(&Order { quantity, price: 0.0 }).await.unwrap();
            assert_eq!(out, quantity + 1);
        }
    }
}
