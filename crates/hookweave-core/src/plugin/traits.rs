//! Plugin trait and the function-adapter, grounded on `filehub-plugin`'s
//! `SimpleHandlerAdapter`/`ClosureHandler` pattern: a plugin is either a
//! type implementing [`Plugin`] or a plain async closure wrapped by
//! [`FnPlugin`].

use async_trait::async_trait;
use hookweave_types::HookError;

use super::context::PluginContext;

/// A unit of registration. `setup` receives the restricted context bound
/// to this plugin's identity and is the only place handlers are meant to
/// be registered.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Optional explicit name. Returning `None` causes the registry to
    /// derive an anonymous name.
    fn name(&self) -> Option<&str> {
        None
    }

    async fn setup(&self, ctx: PluginContext) -> Result<(), HookError>;
}

/// Adapts a plain async closure `Fn(PluginContext) -> Future<Output =
/// Result<(), HookError>>` into a [`Plugin`], mirroring
/// `SimpleHandlerAdapter`'s role of letting callers register a function
/// directly instead of a struct implementing the trait.
pub struct FnPlugin<F> {
    name: Option<String>,
    setup: F,
}

impl<F, Fut> FnPlugin<F>
where
    F: Fn(PluginContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<(), HookError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, setup: F) -> Self {
        Self {
            name: Some(name.into()),
            setup,
        }
    }

    pub fn anonymous(setup: F) -> Self {
        Self { name: None, setup }
    }
}

#[async_trait]
impl<F, Fut> Plugin for FnPlugin<F>
where
    F: Fn(PluginContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<(), HookError>> + Send + 'static,
{
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn setup(&self, ctx: PluginContext) -> Result<(), HookError> {
        (self.setup)(ctx).await
    }
}
