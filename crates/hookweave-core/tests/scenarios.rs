//! End-to-end scenarios S1-S6.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;

use hookweave_core::{ClosureHandler, FnPlugin, Framework, FrameworkConfig, HookOutcome, WeaveResult};

fn no_default_features() -> FrameworkConfig {
    FrameworkConfig {
        features: Some(vec![]),
        ..FrameworkConfig::default()
    }
}

/// S1 - basic emit: plugin A's handler for `custom` emits `secondary`;
/// plugin B observes it after the deferred drain.
#[tokio::test]
async fn s1_basic_emit() {
    let fw = Framework::new(no_default_features()).await.unwrap();
    let received = Arc::new(Mutex::new(None));
    let received2 = received.clone();

    fw.use_plugin(Box::new(FnPlugin::new("a", |ctx| async move {
        let handler_ctx = ctx.clone();
        ctx.on(
            "custom",
            0,
            Arc::new(ClosureHandler::new(move |event| {
                let ctx = handler_ctx.clone();
                async move {
                    let payload = json!({ "src": "A", "orig": event });
                    ctx.emit("secondary", payload).await?;
                    Ok(HookOutcome::undefined())
                }
            })),
        )
        .await?;
        Ok(())
    })))
    .await
    .unwrap();

    fw.use_plugin(Box::new(FnPlugin::new("b", move |ctx| {
        let received2 = received2.clone();
        async move {
            ctx.on(
                "secondary",
                0,
                Arc::new(ClosureHandler::new(move |event| {
                    let received2 = received2.clone();
                    async move {
                        *received2.lock().await = Some(event);
                        Ok(HookOutcome::undefined())
                    }
                })),
            )
            .await?;
            Ok(())
        }
    })))
    .await
    .unwrap();

    fw.dispatch("custom", json!({ "t": "d" })).await.unwrap();

    let got = received.lock().await.clone();
    assert_eq!(got, Some(json!({ "src": "A", "orig": { "t": "d" } })));
}

/// S2 - recursion bound: a self-re-emitting `loop` hook is capped.
#[tokio::test]
async fn s2_recursion_bound() {
    let mut config = no_default_features();
    config.recursion_bound = 100;
    let fw = Framework::new(config).await.unwrap();

    let invocations = Arc::new(AtomicUsize::new(0));
    let invocations2 = invocations.clone();

    fw.use_plugin(Box::new(FnPlugin::new("looper", move |ctx| {
        let invocations2 = invocations2.clone();
        async move {
            let handler_ctx = ctx.clone();
            ctx.on(
                "loop",
                0,
                Arc::new(ClosureHandler::new(move |_event| {
                    let ctx = handler_ctx.clone();
                    let invocations2 = invocations2.clone();
                    async move {
                        invocations2.fetch_add(1, Ordering::SeqCst);
                        ctx.emit("loop", json!({})).await?;
                        Ok(HookOutcome::undefined())
                    }
                })),
            )
            .await?;
            Ok(())
        }
    })))
    .await
    .unwrap();

    let error_count = Arc::new(AtomicUsize::new(0));
    let error_count2 = error_count.clone();
    fw.use_plugin(Box::new(FnPlugin::new("watcher", move |ctx| {
        let error_count2 = error_count2.clone();
        async move {
            ctx.on(
                "pluginError",
                0,
                Arc::new(ClosureHandler::new(move |event: Value| {
                    let error_count2 = error_count2.clone();
                    async move {
                        if event
                            .get("error")
                            .and_then(Value::as_str)
                            .map(|s| s.contains("recursion-bound") || s.contains("recursion bound"))
                            .unwrap_or(false)
                        {
                            error_count2.fetch_add(1, Ordering::SeqCst);
                        }
                        Ok(HookOutcome::undefined())
                    }
                })),
            )
            .await?;
            Ok(())
        }
    })))
    .await
    .unwrap();

    fw.dispatch("loop", json!({})).await.unwrap();

    assert!(invocations.load(Ordering::SeqCst) <= 100);
}

/// S3 - state transition and wait.
#[tokio::test]
async fn s3_state_transition_and_wait() {
    let config = FrameworkConfig {
        features: Some(vec!["state".to_string()]),
        ..FrameworkConfig::default()
    };
    let fw = Framework::new(config).await.unwrap();
    let fw2 = fw.clone();

    let waiter = tokio::spawn(async move {
        fw2.dispatch(
            "api:waitForState",
            json!({ "state": "success", "timeout": 5000 }),
        )
        .await
    });

    fw.dispatch("api:setState", json!({ "state": "loading" }))
        .await
        .unwrap();
    fw.dispatch(
        "api:setState",
        json!({ "state": "success", "data": { "n": 1 } }),
    )
    .await
    .unwrap();

    let resolved = waiter.await.unwrap().unwrap();
    assert_eq!(resolved["status"], "success");
    assert_eq!(resolved["data"]["n"], 1);

    let history = fw.dispatch("api:getStateHistory", json!({})).await.unwrap();
    let statuses: Vec<String> = history["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap().to_string())
        .collect();
    assert!(statuses.len() >= 2);
    assert_eq!(statuses.last().unwrap(), "success");
}

/// S4 - priority ordering.
#[tokio::test]
async fn s4_priority_ordering() {
    let fw = Framework::new(no_default_features()).await.unwrap();
    let order = Arc::new(Mutex::new(Vec::<String>::new()));

    async fn register(fw: &Framework, order: Arc<Mutex<Vec<String>>>, name: &'static str, priority: i32) {
        fw.use_plugin(Box::new(FnPlugin::new(name, move |ctx| {
            let order = order.clone();
            async move {
                ctx.on(
                    "h",
                    priority,
                    Arc::new(ClosureHandler::new(move |_event| {
                        let order = order.clone();
                        async move {
                            order.lock().await.push(name.to_string());
                            Ok(HookOutcome::undefined())
                        }
                    })),
                )
                .await?;
                Ok(())
            }
        })))
        .await
        .unwrap();
    }

    register(&fw, order.clone(), "second", 5).await;
    register(&fw, order.clone(), "first", 10).await;
    register(&fw, order.clone(), "third", 1).await;

    fw.dispatch("h", json!({})).await.unwrap();

    let got = order.lock().await.clone();
    assert_eq!(got, vec!["first", "second", "third"]);
}

/// S5 - handler error isolation.
#[tokio::test]
async fn s5_handler_error_isolation() {
    let fw = Framework::new(no_default_features()).await.unwrap();
    let y_called = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let y_called2 = y_called.clone();
    let z_payload: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let z_payload2 = z_payload.clone();

    fw.use_plugin(Box::new(FnPlugin::new("x", |ctx| async move {
        ctx.on(
            "h",
            10,
            Arc::new(ClosureHandler::new(|_event| async {
                Err(hookweave_core::HookError::internal("x blew up"))
            })),
        )
        .await?;
        Ok(())
    })))
    .await
    .unwrap();

    fw.use_plugin(Box::new(FnPlugin::new("y", move |ctx| {
        let y_called2 = y_called2.clone();
        async move {
            ctx.on(
                "h",
                5,
                Arc::new(ClosureHandler::new(move |_event| {
                    let y_called2 = y_called2.clone();
                    async move {
                        y_called2.store(true, Ordering::SeqCst);
                        Ok(HookOutcome::undefined())
                    }
                })),
            )
            .await?;
            Ok(())
        }
    })))
    .await
    .unwrap();

    fw.use_plugin(Box::new(FnPlugin::new("z", move |ctx| {
        let z_payload2 = z_payload2.clone();
        async move {
            ctx.on(
                "pluginError",
                0,
                Arc::new(ClosureHandler::new(move |event| {
                    let z_payload2 = z_payload2.clone();
                    async move {
                        *z_payload2.lock().await = Some(event);
                        Ok(HookOutcome::undefined())
                    }
                })),
            )
            .await?;
            Ok(())
        }
    })))
    .await
    .unwrap();

    let result: WeaveResult<Value> = fw.dispatch("h", json!({})).await;
    assert!(result.is_ok());
    assert!(y_called.load(Ordering::SeqCst));

    let payload = z_payload.lock().await.clone().unwrap();
    assert_eq!(payload["plugin"], "x");
    assert_eq!(payload["hookName"], "h");
    assert!(payload["error"].as_str().unwrap().contains("x blew up"));
}

/// S6 - introspection.
#[tokio::test]
async fn s6_introspection() {
    let config = FrameworkConfig {
        features: Some(vec!["introspection".to_string()]),
        ..FrameworkConfig::default()
    };
    let fw = Framework::new(config).await.unwrap();

    fw.use_plugin(Box::new(FnPlugin::new("alpha", |ctx| async move {
        ctx.on(
            "custom:a",
            0,
            Arc::new(ClosureHandler::new(|_| async { Ok(HookOutcome::undefined()) })),
        )
        .await?;
        Ok(())
    })))
    .await
    .unwrap();
    fw.use_plugin(Box::new(FnPlugin::new("beta", |ctx| async move {
        ctx.on(
            "custom:b",
            0,
            Arc::new(ClosureHandler::new(|_| async { Ok(HookOutcome::undefined()) })),
        )
        .await?;
        Ok(())
    })))
    .await
    .unwrap();

    let capabilities = fw
        .dispatch("api:getPluginCapabilities", json!({}))
        .await
        .unwrap();
    let list = capabilities.as_array().unwrap();
    assert!(list.len() >= 3);
    for entry in list {
        assert!(entry.get("hooks").unwrap().is_array());
    }

    let hooks = fw.dispatch("api:getAvailableHooks", json!({})).await.unwrap();
    assert_eq!(hooks["api:introspect"]["type"], "query");
}
