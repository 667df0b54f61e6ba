//! Handler entries, tokens, and the boxed-future handler type.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hookweave_types::HookError;
use serde_json::Value;
use uuid::Uuid;

/// Future returned by a boxed handler.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque handle returned by `on`/`PluginContext::on`, consumed by `off`.
///
/// The JS original removes handlers by function-reference equality; Rust
/// has no equivalent for boxed closures, so registration hands back this
/// token instead. It is the sole supported way to remove a single handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct HandlerToken(Uuid);

impl HandlerToken {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for HandlerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a handler invocation produced, from the dispatch engine's point of
/// view.
///
/// `Value` carries the "return value, possibly undefined/false/data"
/// continuum (see [`crate::hooks::dispatcher`]). `CallerError` distinguishes
/// handler-induced errors (always absorbed into `pluginError`) from
/// caller-induced errors (invalid state transition, wait timeout), which
/// must reject the `dispatch` future itself rather than being swallowed.
#[derive(Debug, Clone)]
pub enum HookOutcome {
    Value(Value),
    CallerError(HookError),
}

impl HookOutcome {
    pub fn ok(value: Value) -> Self {
        Self::Value(value)
    }

    pub fn undefined() -> Self {
        Self::Value(Value::Null)
    }

    pub fn stop() -> Self {
        Self::Value(Value::Bool(false))
    }

    pub fn caller_error(err: HookError) -> Self {
        Self::CallerError(err)
    }
}

/// A registered hook handler. Handler bugs (panics or `Err` returns) are
/// caught by the dispatcher and routed to `pluginError`; they never
/// propagate out of `invoke`.
pub trait Handler: Send + Sync {
    fn invoke<'a>(&'a self, event: Value) -> BoxFuture<'a, Result<HookOutcome, HookError>>;
}

/// Adapts a plain async closure `Fn(Value) -> Future<Output = Result<HookOutcome, HookError>>`
/// into a [`Handler`], the same closure-adapter idiom the grounding crate
/// uses for `ClosureHandler`.
pub struct ClosureHandler<F> {
    func: F,
}

impl<F> ClosureHandler<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut> Handler for ClosureHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HookOutcome, HookError>> + Send + 'static,
{
    fn invoke<'a>(&'a self, event: Value) -> BoxFuture<'a, Result<HookOutcome, HookError>> {
        Box::pin((self.func)(event))
    }
}

/// One entry in a hook's ordered handler list.
///
/// The handler is held as `Arc<dyn Handler>` rather than `Box<dyn Handler>`
/// so the dispatcher can clone a handle out while holding the registry's
/// read lock, then drop the lock before `.await`ing the invocation — a
/// `Box` would tie the invocation future's lifetime to the lock guard.
pub struct HandlerEntry {
    pub handler: Arc<dyn Handler>,
    pub priority: i32,
    pub plugin_name: String,
    pub token: HandlerToken,
}

impl HandlerEntry {
    pub fn new(handler: Arc<dyn Handler>, priority: i32, plugin_name: impl Into<String>) -> Self {
        Self {
            handler,
            priority,
            plugin_name: plugin_name.into(),
            token: HandlerToken::new(),
        }
    }
}

/// Reserved hook name used for all error routing.
pub const PLUGIN_ERROR_HOOK: &str = "pluginError";

/// Sentinel plugin name for handlers not owned by a user plugin record.
pub const CORE_PLUGIN: &str = "core";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique() {
        assert_ne!(HandlerToken::new(), HandlerToken::new());
    }

    #[test]
    fn outcome_constructors() {
        assert!(matches!(HookOutcome::undefined(), HookOutcome::Value(Value::Null)));
        assert!(matches!(HookOutcome::stop(), HookOutcome::Value(Value::Bool(false))));
    }
}
