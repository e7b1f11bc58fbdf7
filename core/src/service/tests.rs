use super::*;
use crate::test_helpers::{CountingCompiler, SleepyCompiler};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

#[derive(Debug, Clone, Serialize)]
struct ValueContext {
    #[serde(rename = "Value")]
    value: i64,
}

#[derive(Debug, Clone, Serialize)]
struct NameContext {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Echo {
    #[serde(rename = "Value")]
    value: i64,
}

fn counting_service(compiler: &Arc<CountingCompiler>) -> ScriptExecutionService {
    ScriptExecutionService::with_compiler(compiler.clone(), &Config::default())
}

#[tokio::test]
async fn test_constant_expression_compiles_once() {
    let compiler = CountingCompiler::new();
    let service = counting_service(&compiler);
    assert_eq!(compiler.compiles(), 0);

    let first: i64 = service.invoke(&(), "1 + 1").await.unwrap();
    assert_eq!(first, 2);
    assert_eq!(compiler.compiles(), 1);

    let second: i64 = service.invoke(&(), "1 + 1").await.unwrap();
    assert_eq!(second, 2);
    assert_eq!(compiler.compiles(), 1);
}

#[tokio::test]
async fn test_context_is_rebound_per_call() {
    let compiler = CountingCompiler::new();
    let service = counting_service(&compiler);

    let ten: i64 = service
        .invoke(&ValueContext { value: 5 }, "Context.Value * 2")
        .await
        .unwrap();
    let fourteen: i64 = service
        .invoke(&ValueContext { value: 7 }, "Context.Value * 2")
        .await
        .unwrap();

    assert_eq!(ten, 10);
    assert_eq!(fourteen, 14);
    assert_eq!(compiler.compiles(), 1);
}

#[tokio::test]
async fn test_same_source_different_types_compile_separately() {
    let compiler = CountingCompiler::new();
    let service = counting_service(&compiler);

    let as_int: i64 = service
        .invoke(&ValueContext { value: 3 }, "Context.Value")
        .await
        .unwrap();
    let as_float: f64 = service
        .invoke(&ValueContext { value: 3 }, "Context.Value")
        .await
        .unwrap();
    let as_struct: Echo = service
        .invoke(&ValueContext { value: 3 }, "Context")
        .await
        .unwrap();

    assert_eq!(as_int, 3);
    assert_eq!(as_float, 3.0);
    assert_eq!(as_struct, Echo { value: 3 });
    assert_eq!(compiler.compiles(), 3);
    assert_eq!(service.cache().len(), 3);
}

#[tokio::test]
async fn test_context_type_is_part_of_the_key() {
    let compiler = CountingCompiler::new();
    let service = counting_service(&compiler);

    let from_value: String = service
        .invoke(&ValueContext { value: 1 }, "\"fixed\"")
        .await
        .unwrap();
    let from_name: String = service
        .invoke(
            &NameContext {
                name: "x".to_string(),
            },
            "\"fixed\"",
        )
        .await
        .unwrap();

    assert_eq!(from_value, "fixed");
    assert_eq!(from_name, "fixed");
    assert_eq!(compiler.compiles(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_calls_share_one_compile() {
    let compiler = CountingCompiler::slow(Duration::from_millis(50));
    let service = Arc::new(counting_service(&compiler));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .invoke::<ValueContext, i64>(&ValueContext { value: i }, "Context.Value + 100")
                    .await
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let out = handle.await.unwrap().unwrap();
        assert_eq!(out, i as i64 + 100);
    }

    assert_eq!(compiler.compiles(), 1);
    let stats = service.stats();
    assert_eq!(stats.compiles, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn test_failed_compile_is_retried() {
    let compiler = CountingCompiler::failing_first(1);
    let service = counting_service(&compiler);

    let err = service.invoke::<(), i64>(&(), "40 + 2").await.unwrap_err();
    assert!(err.is_compile_error());
    assert!(service.cache().is_empty());

    let ok: i64 = service.invoke(&(), "40 + 2").await.unwrap();
    assert_eq!(ok, 42);
    assert_eq!(compiler.compiles(), 2);
}

#[tokio::test]
async fn test_invalid_source_reports_compile_error() {
    let service = ScriptExecutionService::default();

    let err = service.invoke::<(), i64>(&(), "1 +").await.unwrap_err();
    match err {
        ScriptError::Compile(_) => {}
        other => panic!("Expected compile error, got {:?}", other),
    }

    let err = service
        .invoke::<(), i64>(&(), "Math.Nope(1)")
        .await
        .unwrap_err();
    assert!(err.is_compile_error());
    assert!(err.to_string().contains("Nope"));
}

#[tokio::test]
async fn test_runtime_fault_keeps_runner_cached() {
    let compiler = CountingCompiler::new();
    let service = counting_service(&compiler);

    let err = service
        .invoke::<ValueContext, i64>(&ValueContext { value: 0 }, "10 / Context.Value")
        .await
        .unwrap_err();
    assert!(err.is_runtime_fault());

    let ok: i64 = service
        .invoke(&ValueContext { value: 5 }, "10 / Context.Value")
        .await
        .unwrap();
    assert_eq!(ok, 2);
    assert_eq!(compiler.compiles(), 1);
}

#[tokio::test]
async fn test_result_conversion_fault() {
    let service = ScriptExecutionService::default();

    let err = service
        .invoke::<(), bool>(&(), "\"not a bool\"")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScriptError::Runtime(RuntimeFault::ResultConversion { expected: "bool", .. })
    ));
}

#[tokio::test]
async fn test_invocation_timeout() {
    let config = Config::from_toml_str("[runner]\ntimeout_ms = 20\n").unwrap();
    let service = ScriptExecutionService::with_compiler(
        Arc::new(SleepyCompiler {
            run_for: Duration::from_millis(500),
        }),
        &config,
    );

    let err = service
        .invoke::<ValueContext, Echo>(&ValueContext { value: 1 }, "ignored")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScriptError::Runtime(RuntimeFault::Timeout(limit)) if limit == Duration::from_millis(20)
    ));

    // The runner itself is still cached
    assert_eq!(service.cache().len(), 1);
}

#[tokio::test]
async fn test_fast_invocation_within_timeout() {
    let config = Config::from_toml_str("[runner]\ntimeout_ms = 1000\n").unwrap();
    let service = ScriptExecutionService::with_compiler(
        Arc::new(SleepyCompiler {
            run_for: Duration::from_millis(1),
        }),
        &config,
    );

    let echoed: Echo = service
        .invoke(&ValueContext { value: 9 }, "ignored")
        .await
        .unwrap();
    assert_eq!(echoed, Echo { value: 9 });
}

#[tokio::test]
async fn test_precompile_warms_the_cache() {
    let compiler = CountingCompiler::new();
    let service = counting_service(&compiler);

    assert_ok!(
        service
            .precompile::<ValueContext, i64>("Context.Value - 1")
            .await
    );
    assert_err!(service.precompile::<ValueContext, i64>("Context.").await);
    assert_eq!(compiler.compiles(), 2);

    let out: i64 = service
        .invoke(&ValueContext { value: 1 }, "Context.Value - 1")
        .await
        .unwrap();
    assert_eq!(out, 0);
    assert_eq!(compiler.compiles(), 2);
    assert_eq!(service.stats().hits, 1);
}

#[tokio::test]
async fn test_runner_is_shared() {
    let service = ScriptExecutionService::default();

    let first = service.runner::<ValueContext, i64>("Context.Value").await.unwrap();
    let second = service.runner::<ValueContext, i64>("Context.Value").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.signature(), crate::types::Signature::of::<ValueContext, i64>());
}

#[tokio::test]
async fn test_bounded_cache_recompiles_evicted_source() {
    let compiler = CountingCompiler::new();
    let config = Config::from_toml_str("[cache]\nmax_entries = 1\n").unwrap();
    let service = ScriptExecutionService::with_compiler(compiler.clone(), &config);

    let _: i64 = service.invoke(&(), "1").await.unwrap();
    let _: i64 = service.invoke(&(), "2").await.unwrap();
    let _: i64 = service.invoke(&(), "1").await.unwrap();

    assert_eq!(compiler.compiles(), 3);
    assert_eq!(service.cache().len(), 1);
    assert_eq!(service.stats().evictions, 2);
}

#[tokio::test]
async fn test_deeply_nested_source_is_a_compile_error() {
    let service = ScriptExecutionService::default();

    let long_sum = vec!["1"; 1000].join(" + ");
    let negations = format!("{}true", "!".repeat(500));
    let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));

    for source in [long_sum, negations, parens] {
        let err = service.invoke::<(), JsonValue>(&(), &source).await.unwrap_err();
        match err {
            ScriptError::Compile(compile) => {
                assert!(compile.diagnostic().contains("nested too deeply"), "{}", compile)
            }
            other => panic!("Expected compile error, got {:?}", other),
        }
    }

    assert!(service.cache().is_empty());
    let sum: i64 = service.invoke(&(), &vec!["1"; 100].join(" + ")).await.unwrap();
    assert_eq!(sum, 100);
}

#[tokio::test]
async fn test_mistyped_cache_entry_is_fatal() {
    let service = ScriptExecutionService::default();
    let source = "Context.Value";

    // Populate the slot with something that is not a Runner<ValueContext, i64>
    let key = CacheKey::for_types::<ValueContext, i64>(source);
    assert_ok!(
        service
            .cache()
            .get_or_create(key, || Ok(Arc::new(7u32) as ErasedRunner))
            .await
    );

    let err = service
        .invoke::<ValueContext, i64>(&ValueContext { value: 1 }, source)
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(!err.is_compile_error());
    assert!(!err.is_runtime_fault());
    match &err {
        ScriptError::CacheCorruption { expected, .. } => {
            assert_eq!(*expected, crate::types::Signature::of::<ValueContext, i64>())
        }
        other => panic!("Expected cache corruption, got {:?}", other),
    }

    // Retrying hits the same entry and fails the same way
    assert!(service
        .runner::<ValueContext, i64>(source)
        .await
        .unwrap_err()
        .is_fatal());
}
