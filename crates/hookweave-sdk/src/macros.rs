//! Convenience macros for plugin development.

/// Builds a `serde_json::Value` event payload from key/value pairs,
/// mirroring the ergonomics of `filehub-plugin`'s `hook_payload!` macro.
///
/// # Example
/// ```rust,ignore
/// let event = hookweave_sdk::event!({
///     "state" => json!("loading"),
/// });
/// ```
#[macro_export]
macro_rules! event {
    () => {
        $crate::prelude::json!({})
    };
    ({ $($key:expr => $value:expr),* $(,)? }) => {{
        let mut map = serde_json::Map::new();
        $(
            map.insert($key.to_string(), $value);
        )*
        $crate::prelude::Value::Object(map)
    }};
}

/// Declares a minimal anonymous-name-free plugin struct that forwards
/// `setup` to an async block, for the common case of a plugin with no
/// state of its own.
///
/// # Example
/// ```rust,ignore
/// hookweave_sdk::simple_plugin!(Logger, "logger", |ctx| async move {
///     ctx.on("agent:run", 0, Arc::new(ClosureHandler::new(|_event| async {
///         Ok(HookOutcome::undefined())
///     }))).await?;
///     Ok(())
/// });
/// ```
#[macro_export]
macro_rules! simple_plugin {
    ($ident:ident, $name:expr, $setup:expr) => {
        pub struct $ident;

        #[$crate::prelude::async_trait]
        impl $crate::prelude::Plugin for $ident {
            fn name(&self) -> Option<&str> {
                Some($name)
            }

            async fn setup(
                &self,
                ctx: $crate::prelude::PluginContext,
            ) -> Result<(), $crate::prelude::HookError> {
                ($setup)(ctx).await
            }
        }
    };
}
