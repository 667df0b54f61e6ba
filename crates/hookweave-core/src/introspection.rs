//! Introspection: the machine-readable discovery surface. Installed as
//! a privileged built-in plugin — it holds a `Weak` handle straight to
//! [`FrameworkInner`] because its queries
//! (plugin list with handler counts, hook schema inference) need direct
//! registry access that the restricted `PluginContext` deliberately does
//! not expose to ordinary plugins.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::{json, Value};

use hookweave_types::HookError;

use crate::factory::FrameworkInner;
use crate::hooks::{ClosureHandler, HookOutcome};
use crate::plugin::{Plugin, PluginContext};

pub struct IntrospectionPlugin {
    framework: Weak<FrameworkInner>,
}

impl IntrospectionPlugin {
    pub fn new(framework: Weak<FrameworkInner>) -> Self {
        Self { framework }
    }
}

#[async_trait]
impl Plugin for IntrospectionPlugin {
    fn name(&self) -> Option<&str> {
        Some("introspection")
    }

    async fn setup(&self, ctx: PluginContext) -> Result<(), HookError> {
        register(&ctx, &self.framework, "api:introspect", |fw, _event| async move {
            introspect_snapshot(&fw).await
        })
        .await?;

        register(&ctx, &self.framework, "api:getPluginCapabilities", |fw, _event| async move {
            plugin_capabilities(&fw).await
        })
        .await?;

        register(&ctx, &self.framework, "api:getAvailableHooks", |fw, _event| async move {
            available_hooks(&fw).await
        })
        .await?;

        register(&ctx, &self.framework, "api:getPluginDetails", |fw, event| async move {
            let name = event.get("pluginName").and_then(Value::as_str).unwrap_or_default();
            plugin_details(&fw, name).await
        })
        .await?;

        register(&ctx, &self.framework, "api:getHookSchema", |_fw, event| async move {
            let name = event.get("hookName").and_then(Value::as_str).unwrap_or_default();
            infer_schema(name)
        })
        .await?;

        register(&ctx, &self.framework, "api:getSkillsManifest", |fw, event| async move {
            let include_instructions = event
                .get("includeInstructions")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            skills_manifest(&fw, include_instructions).await
        })
        .await?;

        register(&ctx, &self.framework, "api:getPluginSkills", |fw, event| async move {
            let name = event.get("pluginName").and_then(Value::as_str).unwrap_or_default();
            plugin_skills(&fw, name).await
        })
        .await?;

        Ok(())
    }
}

/// Registers a pure introspection handler: resolves the `Weak` handle,
/// runs `f`, and returns `undefined` if the framework has since been
/// dropped. Every handler installed this way performs no registry
/// mutation — introspection only ever reads.
async fn register<F, Fut>(
    ctx: &PluginContext,
    framework: &Weak<FrameworkInner>,
    hook_name: &str,
    f: F,
) -> Result<(), HookError>
where
    F: Fn(Arc<FrameworkInner>, Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Value> + Send + 'static,
{
    let framework = framework.clone();
    ctx.on(
        hook_name,
        0,
        Arc::new(ClosureHandler::new(move |event| {
            let framework = framework.clone();
            let fut = framework.upgrade().map(|fw| f(fw, event));
            async move {
                match fut {
                    Some(fut) => Ok(HookOutcome::ok(fut.await)),
                    None => Ok(HookOutcome::undefined()),
                }
            }
        })),
    )
    .await
    .map(|_| ())
}

/// Schema inference rules, keyed by reserved hook-name namespace.
fn infer_schema(hook_name: &str) -> Value {
    let (ty, returns) = if hook_name.starts_with("api:") {
        ("query", "data")
    } else if hook_name.starts_with("agent:") {
        ("command", "result")
    } else if hook_name.starts_with("state:") {
        ("event", "state")
    } else if hook_name.starts_with("internal:") {
        ("system", "data")
    } else {
        ("generic", "unknown")
    };
    json!({ "type": ty, "returns": returns })
}

async fn introspect_snapshot(fw: &FrameworkInner) -> Value {
    let plugins = fw.plugins.snapshot_enabled().await;
    let hook_names = fw.hooks.hook_names().await;
    let mut hooks = serde_json::Map::new();
    for name in &hook_names {
        let count = fw.hooks.handler_count(name).await;
        hooks.insert(
            name.clone(),
            json!({ "handlerCount": count, "schema": infer_schema(name) }),
        );
    }
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "plugins": plugins
            .into_iter()
            .map(|(name, enabled)| json!({ "name": name, "enabled": enabled }))
            .collect::<Vec<_>>(),
        "hooks": Value::Object(hooks),
    })
}

async fn plugin_capabilities(fw: &FrameworkInner) -> Value {
    let plugins = fw.plugins.snapshot_enabled().await;
    let snapshot = fw.hooks.snapshot().await;
    let list: Vec<Value> = plugins
        .into_iter()
        .map(|(name, enabled)| {
            let hooks: Vec<Value> = snapshot
                .iter()
                .filter(|(_, _, owner, _)| owner == &name)
                .map(|(hook_name, priority, _, _)| json!({ "hookName": hook_name, "priority": priority }))
                .collect();
            json!({ "name": name, "enabled": enabled, "hooks": hooks })
        })
        .collect();
    Value::Array(list)
}

async fn available_hooks(fw: &FrameworkInner) -> Value {
    let names = fw.hooks.hook_names().await;
    let mut out = serde_json::Map::new();
    for name in names {
        let schema = infer_schema(&name);
        out.insert(
            name.clone(),
            json!({
                "type": schema["type"],
                "returns": schema["returns"],
                "description": format!("hook '{name}'"),
            }),
        );
    }
    Value::Object(out)
}

async fn plugin_details(fw: &FrameworkInner, plugin_name: &str) -> Value {
    if !fw.plugins.exists(plugin_name).await {
        return json!({ "error": format!("unknown plugin '{plugin_name}'") });
    }
    let enabled = fw.plugins.is_enabled(plugin_name).await;
    let snapshot = fw.hooks.snapshot().await;
    let hooks: Vec<Value> = snapshot
        .iter()
        .filter(|(_, _, owner, _)| owner == plugin_name)
        .map(|(hook_name, priority, _, _)| json!({ "hookName": hook_name, "priority": priority }))
        .collect();
    let skill = fw.plugins.skill(plugin_name).await;
    json!({ "name": plugin_name, "enabled": enabled, "hooks": hooks, "skill": skill })
}

async fn skills_manifest(fw: &FrameworkInner, include_instructions: bool) -> Value {
    let names = fw.plugins.names().await;
    let mut out = Vec::new();
    for name in names {
        if let Some(mut skill) = fw.plugins.skill(&name).await {
            if !include_instructions {
                if let Value::Object(ref mut map) = skill {
                    map.remove("instructions");
                }
            }
            out.push(json!({ "pluginName": name, "skill": skill }));
        }
    }
    Value::Array(out)
}

async fn plugin_skills(fw: &FrameworkInner, plugin_name: &str) -> Value {
    fw.plugins.skill(plugin_name).await.unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_inference_matches_reserved_namespaces() {
        assert_eq!(infer_schema("api:introspect")["type"], "query");
        assert_eq!(infer_schema("agent:run")["type"], "command");
        assert_eq!(infer_schema("state:transition")["type"], "event");
        assert_eq!(infer_schema("internal:gc")["type"], "system");
        assert_eq!(infer_schema("custom:thing")["type"], "generic");
    }
}
