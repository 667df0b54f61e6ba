//! Hook registry: per-hook ordered handler storage.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::definitions::{Handler, HandlerEntry, HandlerToken};

/// Stores the ordered handler list for every hook name registered so far.
///
/// Guarded by a `tokio::sync::RwLock` rather than a plain `Mutex` so
/// concurrent readers (introspection, dispatch of independent hooks) do
/// not serialize behind each other — the same choice `filehub-plugin`'s
/// `HookRegistry` makes for its `RwLock<HashMap<..>>`.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Vec<HandlerEntry>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `handler` under `hook_name` in descending-priority order,
    /// stable on ties: before the first entry with strictly lower
    /// priority, else appended.
    pub async fn add_handler(
        &self,
        hook_name: &str,
        handler: Arc<dyn Handler>,
        priority: i32,
        plugin_name: &str,
    ) -> HandlerToken {
        let entry = HandlerEntry::new(handler, priority, plugin_name);
        let token = entry.token;
        let mut hooks = self.hooks.write().await;
        let list = hooks.entry(hook_name.to_string()).or_default();
        let pos = list.iter().position(|e| e.priority < priority);
        match pos {
            Some(idx) => list.insert(idx, entry),
            None => list.push(entry),
        }
        debug!(hook = hook_name, plugin = plugin_name, priority, "handler registered");
        token
    }

    /// Removes the handler identified by `token` from `hook_name`.
    /// No-op if absent.
    pub async fn remove_handler(&self, hook_name: &str, token: HandlerToken) {
        let mut hooks = self.hooks.write().await;
        if let Some(list) = hooks.get_mut(hook_name) {
            list.retain(|e| e.token != token);
        }
    }

    /// Removes every handler entry owned by `plugin_name`, across every
    /// hook. Used both by `PluginRegistry::remove` and by `off`'s
    /// transitive cleanup on plugin removal.
    pub async fn remove_plugin(&self, plugin_name: &str) {
        let mut hooks = self.hooks.write().await;
        for list in hooks.values_mut() {
            list.retain(|e| e.plugin_name != plugin_name);
        }
        hooks.retain(|_, list| !list.is_empty());
    }

    /// Toggling enable/disable lives on the plugin registry; the hook
    /// registry never reorders handlers on enable/disable.
    pub async fn handler_count(&self, hook_name: &str) -> usize {
        self.hooks
            .read()
            .await
            .get(hook_name)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub async fn hook_names(&self) -> Vec<String> {
        self.hooks.read().await.keys().cloned().collect()
    }

    /// Runs `f` with read access to the ordered handler list for
    /// `hook_name`, returning `None` if the hook has no handlers.
    pub async fn with_handlers<R>(
        &self,
        hook_name: &str,
        f: impl FnOnce(&[HandlerEntry]) -> R,
    ) -> Option<R> {
        let hooks = self.hooks.read().await;
        hooks.get(hook_name).map(|list| f(list))
    }

    /// Snapshot of `(hook_name, priority, plugin_name, token)` for every
    /// handler, used by introspection.
    pub async fn snapshot(&self) -> Vec<(String, i32, String, HandlerToken)> {
        let hooks = self.hooks.read().await;
        hooks
            .iter()
            .flat_map(|(name, list)| {
                list.iter()
                    .map(move |e| (name.clone(), e.priority, e.plugin_name.clone(), e.token))
            })
            .collect()
    }
}
