//! The restricted surface a plugin's `setup` receives. Bound to one
//! plugin's identity; never exposes the raw registries.

use std::sync::{Arc, Weak};

use serde_json::Value;

use hookweave_types::HookError;

use crate::factory::FrameworkInner;
use crate::hooks::dispatcher::recursion_bound_payload;
use crate::hooks::{Handler, HandlerToken, PLUGIN_ERROR_HOOK};

/// Per-plugin interaction surface. Cheap to clone (holds only a name and
/// a `Weak` back-reference), matching the grounding crate's pattern of
/// constructing a fresh, narrow context object per plugin.
#[derive(Clone)]
pub struct PluginContext {
    plugin_name: String,
    framework: Weak<FrameworkInner>,
}

impl PluginContext {
    pub(crate) fn new(plugin_name: impl Into<String>, framework: Weak<FrameworkInner>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            framework,
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    fn upgrade(&self) -> Result<Arc<FrameworkInner>, HookError> {
        self.framework
            .upgrade()
            .ok_or_else(|| HookError::internal("framework instance has been dropped"))
    }

    /// Registers `handler` on `hook_name` under this plugin's identity,
    /// returning the token needed to `off` it later.
    pub async fn on(
        &self,
        hook_name: &str,
        priority: i32,
        handler: Arc<dyn Handler>,
    ) -> Result<HandlerToken, HookError> {
        let fw = self.upgrade()?;
        let token = fw
            .hooks
            .add_handler(hook_name, handler, priority, &self.plugin_name)
            .await;
        fw.plugins
            .record_handler(&self.plugin_name, hook_name, token)
            .await;
        Ok(token)
    }

    /// Removes a single handler previously registered via `on`.
    pub async fn off(&self, hook_name: &str, token: HandlerToken) -> Result<(), HookError> {
        let fw = self.upgrade()?;
        fw.hooks.remove_handler(hook_name, token).await;
        fw.plugins
            .forget_handler(&self.plugin_name, hook_name, token)
            .await;
        Ok(())
    }

    /// Schedules a deferred dispatch of `hook_name` after the current
    /// top-level dispatch chain completes. Always deferred — see
    /// [`Self::dispatch`] for the immediate counterpart.
    pub async fn emit(&self, hook_name: impl Into<String>, event: Value) -> Result<(), HookError> {
        let fw = self.upgrade()?;
        let hook_name = hook_name.into();
        if !fw
            .deferred
            .enqueue(hook_name.clone(), event, self.plugin_name.clone())
            .await
        {
            let payload = recursion_bound_payload(&hook_name, &self.plugin_name);
            let _ = fw
                .deferred
                .enqueue(PLUGIN_ERROR_HOOK, payload, "core")
                .await;
        }
        Ok(())
    }

    /// Immediate request/response dispatch, distinct from [`Self::emit`]:
    /// `emit` is always deferred, while `dispatch` (when a plugin
    /// genuinely needs a synchronous round-trip, e.g. introspection
    /// queries) runs immediately and should be used sparingly to avoid
    /// the reentrancy hazards `emit` protects against.
    pub async fn dispatch(&self, hook_name: &str, event: Value) -> Result<Value, HookError> {
        let fw = self.upgrade()?;
        fw.dispatch(hook_name, event).await
    }

    pub async fn storage_get(&self, key: &str) -> Result<Option<Value>, HookError> {
        let fw = self.upgrade()?;
        Ok(fw.plugins.storage_get(&self.plugin_name, key).await)
    }

    pub async fn storage_set(&self, key: &str, value: Value) -> Result<(), HookError> {
        let fw = self.upgrade()?;
        fw.plugins.storage_set(&self.plugin_name, key, value).await;
        Ok(())
    }

    /// Attaches skill metadata retrievable via introspection
    /// (`api:getSkillsManifest`, `api:getPluginSkills`).
    pub async fn register_skill(&self, skill: Value) -> Result<(), HookError> {
        let fw = self.upgrade()?;
        fw.plugins.set_skill(&self.plugin_name, skill).await;
        Ok(())
    }
}
