//! The factory and the public instance surface: `Framework::new`
//! resolves a feature set into installed plugins and exposes
//! `use_plugin`/`unuse`/`enable`/`disable`/`dispatch`/`off`/
//! `has_feature`.
//!
//! `FrameworkInner` is the owned aggregate backing each instance, in
//! place of a process-wide global registry. It is wrapped in `Arc`
//! and keeps a `Weak` reference to itself (set once, right after
//! construction) so that privileged built-in plugins (introspection,
//! the state tracker) and every `PluginContext` can reach back into the
//! instance without creating a reference cycle through the hook
//! registry. `Arc::new_cyclic` was rejected here because installing the
//! built-in feature plugins is async and `new_cyclic`'s constructor
//! closure must be synchronous.

use std::sync::{Arc, OnceLock, Weak};

use serde_json::{json, Value};
use tracing::warn;

use hookweave_types::{FrameworkConfig, HookError};

use crate::deferred::DeferredQueue;
use crate::hooks::{HandlerToken, HookRegistry, PLUGIN_ERROR_HOOK};
use crate::introspection::IntrospectionPlugin;
use crate::plugin::{Plugin, PluginContext, PluginRegistry};
use crate::state::StateTrackerPlugin;

/// The owned aggregate backing a [`Framework`] handle.
pub struct FrameworkInner {
    pub(crate) hooks: HookRegistry,
    pub(crate) plugins: PluginRegistry,
    pub(crate) deferred: DeferredQueue,
    pub(crate) config: FrameworkConfig,
    self_ref: OnceLock<Weak<FrameworkInner>>,
}

impl FrameworkInner {
    fn weak_self(&self) -> Weak<FrameworkInner> {
        self.self_ref.get().cloned().unwrap_or_default()
    }

    /// Top-level or nested dispatch entry point. Tracks dispatch depth
    /// so the deferred queue drains only once control returns to depth
    /// zero, never re-entrantly within a handler.
    pub fn dispatch<'a>(
        &'a self,
        hook_name: &'a str,
        event: Value,
    ) -> crate::hooks::BoxFuture<'a, Result<Value, HookError>> {
        Box::pin(async move {
            self.deferred.enter();
            let result = crate::hooks::dispatcher::run_dispatch(
                &self.hooks,
                &self.plugins,
                &self.deferred,
                hook_name,
                event,
            )
            .await;
            let depth = self.deferred.exit();
            if depth == 0 {
                self.drain_deferred().await;
            }
            result
        })
    }

    async fn drain_deferred(&self) {
        self.deferred
            .drain_with(|hook_name, event| async move { self.dispatch(&hook_name, event).await })
            .await;
    }
}

/// A configured instance of the plugin framework. Cheap to clone: an
/// `Arc` handle over the shared [`FrameworkInner`].
#[derive(Clone)]
pub struct Framework {
    inner: Arc<FrameworkInner>,
}

impl Framework {
    /// Builds a fresh instance and installs the requested feature
    /// bundle. `config.features == None` installs the small default
    /// bundle (`introspection`); `Some(vec![])` installs nothing.
    pub async fn new(config: FrameworkConfig) -> Result<Self, HookError> {
        let inner = Arc::new(FrameworkInner {
            hooks: HookRegistry::new(),
            plugins: PluginRegistry::new(),
            deferred: DeferredQueue::new(config.recursion_bound),
            config: config.clone(),
            self_ref: OnceLock::new(),
        });
        let _ = inner.self_ref.set(Arc::downgrade(&inner));

        let framework = Self { inner };
        framework.install_features(&config).await?;
        Ok(framework)
    }

    async fn install_features(&self, config: &FrameworkConfig) -> Result<(), HookError> {
        let requested = config
            .features
            .clone()
            .unwrap_or_else(|| vec!["introspection".to_string()]);

        for name in requested {
            match name.as_str() {
                "introspection" => {
                    let plugin = IntrospectionPlugin::new(self.inner.weak_self());
                    self.use_plugin(Box::new(plugin)).await?;
                }
                "state" => {
                    let plugin = StateTrackerPlugin::new(
                        self.inner.weak_self(),
                        config.history_capacity,
                        config.default_wait_timeout_ms,
                    );
                    self.use_plugin(Box::new(plugin)).await?;
                }
                other => {
                    warn!(feature = other, "unknown feature requested; ignoring");
                }
            }
        }
        Ok(())
    }

    /// Registers a plugin. Accepts any `Plugin` implementation; named
    /// `use_plugin` rather than `use` because `use` is a Rust keyword.
    /// Re-registration under an existing name is rejected; a `setup`
    /// failure is routed to `pluginError` and, under
    /// `strict_registration`, rolls the partial registration back.
    pub async fn use_plugin(&self, plugin: Box<dyn Plugin>) -> Result<(), HookError> {
        let name = match plugin.name() {
            Some(n) => n.to_string(),
            None => self.inner.plugins.derive_anonymous_name().await,
        };

        if !self.inner.plugins.try_register(&name).await {
            return Err(HookError::conflict(format!(
                "plugin '{name}' is already registered"
            )));
        }

        let ctx = PluginContext::new(name.clone(), self.inner.weak_self());
        if let Err(err) = plugin.setup(ctx).await {
            if self.inner.config.strict_registration {
                self.unuse(&name).await;
            }
            let payload = json!({
                "plugin": name,
                "hookName": "init",
                "error": err.to_string(),
            });
            let _ = self
                .inner
                .deferred
                .enqueue(PLUGIN_ERROR_HOOK, payload, "core")
                .await;
        }
        Ok(())
    }

    /// Removes a plugin and every handler it owns. No-op if unknown.
    pub async fn unuse(&self, name: &str) {
        let handlers = self.inner.plugins.remove(name).await;
        for (hook_name, token) in handlers {
            self.inner.hooks.remove_handler(&hook_name, token).await;
        }
    }

    pub async fn enable(&self, name: &str) {
        self.inner.plugins.set_enabled(name, true).await;
    }

    pub async fn disable(&self, name: &str) {
        self.inner.plugins.set_enabled(name, false).await;
    }

    /// Top-level dispatch.
    pub async fn dispatch(&self, hook_name: &str, event: Value) -> Result<Value, HookError> {
        self.inner.dispatch(hook_name, event).await
    }

    /// Removes a single handler by its token.
    pub async fn off(&self, hook_name: &str, token: HandlerToken) {
        self.inner.hooks.remove_handler(hook_name, token).await;
    }

    /// Narrow `hasFeature` reading: true iff `name` was present in the
    /// `features` list at construction.
    pub fn has_feature(&self, name: &str) -> bool {
        self.inner.config.requested_feature(name)
    }

    pub async fn hook_names(&self) -> Vec<String> {
        self.inner.hooks.hook_names().await
    }

    pub async fn plugin_names(&self) -> Vec<String> {
        self.inner.plugins.names().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{ClosureHandler, HookOutcome};
    use crate::plugin::FnPlugin;

    fn no_features() -> FrameworkConfig {
        FrameworkConfig {
            features: Some(vec![]),
            ..FrameworkConfig::default()
        }
    }

    #[tokio::test]
    async fn use_then_unuse_restores_empty_registries() {
        let fw = Framework::new(no_features()).await.unwrap();
        fw.use_plugin(Box::new(FnPlugin::new("p", |ctx| async move {
            ctx.on(
                "h",
                0,
                Arc::new(ClosureHandler::new(|_| async { Ok(HookOutcome::undefined()) })),
            )
            .await?;
            Ok(())
        })))
        .await
        .unwrap();
        assert_eq!(fw.hook_names().await, vec!["h".to_string()]);
        fw.unuse("p").await;
        assert!(fw.hook_names().await.is_empty());
        assert!(fw.plugin_names().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_plugin_name_is_rejected_first_intact() {
        let fw = Framework::new(no_features()).await.unwrap();
        fw.use_plugin(Box::new(FnPlugin::new("p", |_ctx| async { Ok(()) })))
            .await
            .unwrap();
        let result = fw
            .use_plugin(Box::new(FnPlugin::new("p", |_ctx| async { Ok(()) })))
            .await;
        assert!(result.is_err());
        assert_eq!(fw.plugin_names().await, vec!["p".to_string()]);
    }

    #[tokio::test]
    async fn has_feature_is_narrow() {
        let fw = Framework::new(FrameworkConfig {
            features: Some(vec!["introspection".to_string()]),
            ..FrameworkConfig::default()
        })
        .await
        .unwrap();
        assert!(fw.has_feature("introspection"));
        assert!(!fw.has_feature("state"));
    }

    #[tokio::test]
    async fn dispatch_with_zero_handlers_resolves_undefined() {
        let fw = Framework::new(no_features()).await.unwrap();
        let result = fw.dispatch("nothing", Value::Null).await.unwrap();
        assert!(result.is_null());
    }
}
