//! The dispatch engine proper: walks the ordered handler list for a hook,
//! respects enable state, isolates failures, and routes them to the
//! `pluginError` hook via the deferred queue rather than inline — the
//! same panic-isolation shape as
//! `examples/zeroclaw-labs-zeroclaw/src/hooks/runner.rs`'s
//! `AssertUnwindSafe(...).catch_unwind().await` sequential loop.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use hookweave_types::HookError;
use serde_json::{json, Value};
use tracing::{error, warn};

use super::definitions::{HandlerToken, HookOutcome, PLUGIN_ERROR_HOOK};
use crate::deferred::DeferredQueue;
use crate::hooks::registry::HookRegistry;
use crate::plugin::registry::PluginRegistry;

/// Runs one top-level-or-nested dispatch of `hook_name` with `event`
/// against `hooks`, skipping handlers owned by disabled plugins, and
/// returns the last non-undefined result a handler produced (or the
/// stop sentinel, or null if no handler ran). `deferred` receives any
/// handler-induced error as a queued `pluginError` dispatch; it is never
/// awaited inline, which bounds recursion if error handlers themselves
/// fail.
///
/// A handler that reports [`HookOutcome::CallerError`] short-circuits the
/// loop and is propagated to the caller directly, distinguishing
/// caller-induced errors (invalid state transition, wait timeout), which
/// must reject `dispatch`, from handler bugs, which are always absorbed.
pub async fn run_dispatch(
    hooks: &HookRegistry,
    plugins: &PluginRegistry,
    deferred: &DeferredQueue,
    hook_name: &str,
    event: Value,
) -> Result<Value, HookError> {
    let snapshot_len = hooks.handler_count(hook_name).await;
    if snapshot_len == 0 {
        return Ok(Value::Null);
    }

    let mut last_result = Value::Null;
    let mut stopped = false;

    // Handlers are collected up front so the loop does not hold the
    // registry's read lock across handler `.await` points (a handler
    // may itself call back into the registry, e.g. via `on`/`off`). The
    // token is carried alongside the plugin name so a plugin with more
    // than one handler on the same hook still gets each entry invoked
    // exactly once — `plugin_name` alone cannot disambiguate between them.
    let entries = hooks
        .with_handlers(hook_name, |list| {
            list.iter()
                .map(|e| (e.token, e.plugin_name.clone()))
                .collect::<Vec<_>>()
        })
        .await
        .unwrap_or_default();

    for (token, plugin_name) in entries {
        if stopped {
            break;
        }
        if !plugins.is_enabled(&plugin_name).await {
            continue;
        }

        match invoke_named(hooks, hook_name, token, event.clone()).await {
            Invocation::NotFound => {
                // Handler was removed concurrently between the snapshot
                // and this iteration; removal takes effect immediately,
                // so simply skip it.
            }
            Invocation::Panicked => {
                error!(plugin = plugin_name.as_str(), hook = hook_name, "handler panicked");
                let err = HookError::internal("handler panicked");
                route_plugin_error(deferred, &plugin_name, hook_name, json!(err.to_string())).await;
            }
            Invocation::Ran(Ok(HookOutcome::Value(Value::Bool(false)))) => {
                if last_result.is_null() {
                    last_result = Value::Bool(false);
                }
                stopped = true;
            }
            Invocation::Ran(Ok(HookOutcome::Value(Value::Null))) => {}
            Invocation::Ran(Ok(HookOutcome::Value(v))) => {
                last_result = v;
            }
            Invocation::Ran(Ok(HookOutcome::CallerError(err))) => {
                return Err(err);
            }
            Invocation::Ran(Err(err)) => {
                route_plugin_error(deferred, &plugin_name, hook_name, json!(err.to_string())).await;
            }
        }
    }

    Ok(last_result)
}

enum Invocation {
    NotFound,
    Panicked,
    Ran(Result<HookOutcome, HookError>),
}

/// Invokes the single handler entry identified by `token` under
/// `hook_name`, isolating panics with `catch_unwind`. Distinguishes
/// "handler was concurrently removed" from "handler panicked" so the
/// former is a silent skip rather than a spurious `pluginError`.
///
/// Looked up by `token`, not `plugin_name` — a plugin may own more than
/// one handler on the same hook, and only the token identifies a single
/// registration.
async fn invoke_named(
    hooks: &HookRegistry,
    hook_name: &str,
    token: HandlerToken,
    event: Value,
) -> Invocation {
    // Clone the handler's `Arc` out while holding the registry's read
    // lock, then drop the lock before invoking it — the invocation future
    // borrows from the handler, and that borrow must not outlive a lock
    // guard that is dropped the moment `with_handlers` returns.
    let handler = hooks
        .with_handlers(hook_name, |list| {
            list.iter()
                .find(|e| e.token == token)
                .map(|e| e.handler.clone())
        })
        .await
        .flatten();
    let Some(handler) = handler else {
        return Invocation::NotFound;
    };
    let fut = handler.invoke(event);
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => Invocation::Ran(result),
        Err(_) => Invocation::Panicked,
    }
}

async fn route_plugin_error(deferred: &DeferredQueue, plugin: &str, hook_name: &str, error: Value) {
    let payload = json!({
        "plugin": plugin,
        "hookName": hook_name,
        "error": error,
    });
    if hook_name == PLUGIN_ERROR_HOOK {
        // Avoid an error-handler-for-errors infinite loop; log instead.
        warn!(plugin, hook_name, "pluginError handler itself failed; not re-routing");
        return;
    }
    if !deferred.enqueue(PLUGIN_ERROR_HOOK, payload, plugin).await {
        warn!(plugin, hook_name, "pluginError dispatch dropped: recursion bound reached");
    }
}

/// Builds the `pluginError` payload used when a deferred emission itself
/// hits its recursion bound.
pub fn recursion_bound_payload(hook_name: &str, emitter: &str) -> Value {
    json!({
        "plugin": emitter,
        "hookName": hook_name,
        "error": { "kind": "recursion-bound", "message": format!("recursion bound reached for hook '{hook_name}'") },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::definitions::ClosureHandler;
    use std::sync::Arc;

    #[tokio::test]
    async fn dispatch_with_no_handlers_returns_null() {
        let hooks = HookRegistry::new();
        let plugins = PluginRegistry::new();
        let deferred = DeferredQueue::new(500);
        let result = run_dispatch(&hooks, &plugins, &deferred, "ghost", Value::Null)
            .await
            .unwrap();
        assert!(result.is_null());
    }

    #[tokio::test]
    async fn false_return_stops_propagation() {
        let hooks = HookRegistry::new();
        let plugins = PluginRegistry::new();
        plugins.try_register("a").await;
        plugins.try_register("b").await;
        hooks
            .add_handler(
                "h",
                Arc::new(ClosureHandler::new(|_| async { Ok(HookOutcome::stop()) })),
                10,
                "a",
            )
            .await;
        hooks
            .add_handler(
                "h",
                Arc::new(ClosureHandler::new(|_| async { Ok(HookOutcome::ok(json!(1))) })),
                5,
                "b",
            )
            .await;
        let deferred = DeferredQueue::new(500);
        let result = run_dispatch(&hooks, &plugins, &deferred, "h", Value::Null)
            .await
            .unwrap();
        assert_eq!(result, Value::Bool(false));
    }

    #[tokio::test]
    async fn handler_error_is_isolated_and_routed() {
        let hooks = HookRegistry::new();
        let plugins = PluginRegistry::new();
        plugins.try_register("x").await;
        plugins.try_register("y").await;
        hooks
            .add_handler(
                "h",
                Arc::new(ClosureHandler::new(|_| async {
                    Err(HookError::internal("boom"))
                })),
                10,
                "x",
            )
            .await;
        let called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let called2 = called.clone();
        hooks
            .add_handler(
                "h",
                Arc::new(ClosureHandler::new(move |_| {
                    let called2 = called2.clone();
                    async move {
                        called2.store(true, std::sync::atomic::Ordering::SeqCst);
                        Ok(HookOutcome::undefined())
                    }
                })),
                5,
                "y",
            )
            .await;
        let deferred = DeferredQueue::new(500);
        let result = run_dispatch(&hooks, &plugins, &deferred, "h", Value::Null).await;
        assert!(result.is_ok());
        assert!(called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn one_plugin_with_two_handlers_runs_both() {
        let hooks = HookRegistry::new();
        let plugins = PluginRegistry::new();
        plugins.try_register("multi").await;
        let first_ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let second_ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let first_flag = first_ran.clone();
        let second_flag = second_ran.clone();
        hooks
            .add_handler(
                "h",
                Arc::new(ClosureHandler::new(move |_| {
                    let flag = first_flag.clone();
                    async move {
                        flag.store(true, std::sync::atomic::Ordering::SeqCst);
                        Ok(HookOutcome::ok(json!(1)))
                    }
                })),
                10,
                "multi",
            )
            .await;
        hooks
            .add_handler(
                "h",
                Arc::new(ClosureHandler::new(move |_| {
                    let flag = second_flag.clone();
                    async move {
                        flag.store(true, std::sync::atomic::Ordering::SeqCst);
                        Ok(HookOutcome::ok(json!(2)))
                    }
                })),
                5,
                "multi",
            )
            .await;
        let deferred = DeferredQueue::new(500);
        let result = run_dispatch(&hooks, &plugins, &deferred, "h", Value::Null)
            .await
            .unwrap();
        assert!(first_ran.load(std::sync::atomic::Ordering::SeqCst));
        assert!(second_ran.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(result, json!(2));
    }
}
