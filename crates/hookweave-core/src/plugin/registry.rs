//! Plugin registry: name -> plugin record.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::hooks::HandlerToken;

/// A registered plugin's bookkeeping record.
pub struct PluginRecord {
    pub name: String,
    pub enabled: bool,
    /// `(hook_name, token)` pairs registered through this plugin's
    /// context, kept for cleanup on removal.
    pub handlers: Vec<(String, HandlerToken)>,
    /// Free-form skill metadata attached via `register_skill`, retained
    /// verbatim.
    pub skill: Option<Value>,
    /// Per-plugin key-value storage exposed via `PluginContext::storage_*`.
    pub storage: HashMap<String, Value>,
}

impl PluginRecord {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            handlers: Vec::new(),
            skill: None,
            storage: HashMap::new(),
        }
    }
}

/// Owns every registered plugin's record. Names are unique; rejects
/// re-registration under an existing name.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, PluginRecord>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `name`, returning `false` if it is already taken.
    pub async fn try_register(&self, name: &str) -> bool {
        let mut plugins = self.plugins.write().await;
        if plugins.contains_key(name) {
            return false;
        }
        plugins.insert(name.to_string(), PluginRecord::new(name));
        true
    }

    /// Rolls back a reservation made by `try_register` (used when a
    /// plugin's `setup` fails under strict registration).
    pub async fn rollback(&self, name: &str) {
        self.plugins.write().await.remove(name);
    }

    pub async fn record_handler(&self, plugin_name: &str, hook_name: &str, token: HandlerToken) {
        if let Some(record) = self.plugins.write().await.get_mut(plugin_name) {
            record.handlers.push((hook_name.to_string(), token));
        }
    }

    pub async fn forget_handler(&self, plugin_name: &str, hook_name: &str, token: HandlerToken) {
        if let Some(record) = self.plugins.write().await.get_mut(plugin_name) {
            record.handlers.retain(|(h, t)| !(h == hook_name && *t == token));
        }
    }

    /// Returns the `(hook_name, token)` pairs owned by `plugin_name`, and
    /// removes the record. No-op (returns an empty list) if unknown.
    pub async fn remove(&self, plugin_name: &str) -> Vec<(String, HandlerToken)> {
        self.plugins
            .write()
            .await
            .remove(plugin_name)
            .map(|r| r.handlers)
            .unwrap_or_default()
    }

    pub async fn set_enabled(&self, plugin_name: &str, enabled: bool) {
        if let Some(record) = self.plugins.write().await.get_mut(plugin_name) {
            record.enabled = enabled;
        }
    }

    pub async fn is_enabled(&self, plugin_name: &str) -> bool {
        self.plugins
            .read()
            .await
            .get(plugin_name)
            .map(|r| r.enabled)
            .unwrap_or(false)
    }

    pub async fn exists(&self, plugin_name: &str) -> bool {
        self.plugins.read().await.contains_key(plugin_name)
    }

    pub async fn set_skill(&self, plugin_name: &str, skill: Value) {
        if let Some(record) = self.plugins.write().await.get_mut(plugin_name) {
            record.skill = Some(skill);
        }
    }

    pub async fn skill(&self, plugin_name: &str) -> Option<Value> {
        self.plugins.read().await.get(plugin_name)?.skill.clone()
    }

    pub async fn storage_get(&self, plugin_name: &str, key: &str) -> Option<Value> {
        self.plugins.read().await.get(plugin_name)?.storage.get(key).cloned()
    }

    pub async fn storage_set(&self, plugin_name: &str, key: &str, value: Value) {
        if let Some(record) = self.plugins.write().await.get_mut(plugin_name) {
            record.storage.insert(key.to_string(), value);
        }
    }

    pub async fn names(&self) -> Vec<String> {
        self.plugins.read().await.keys().cloned().collect()
    }

    pub async fn snapshot_enabled(&self) -> Vec<(String, bool)> {
        self.plugins
            .read()
            .await
            .values()
            .map(|r| (r.name.clone(), r.enabled))
            .collect()
    }

    /// Derives a unique anonymous plugin name (`anonymous`, `anonymous-2`,
    /// ...).
    pub async fn derive_anonymous_name(&self) -> String {
        let plugins = self.plugins.read().await;
        if !plugins.contains_key("anonymous") {
            return "anonymous".to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("anonymous-{n}");
            if !plugins.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}
