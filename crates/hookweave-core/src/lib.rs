//! Hook registry, dispatch engine, plugin context, factory, and the
//! introspection / state-tracker built-ins.

pub mod deferred;
pub mod factory;
pub mod hooks;
pub mod introspection;
pub mod plugin;
pub mod state;

pub use factory::Framework;
pub use hooks::{BoxFuture, ClosureHandler, Handler, HandlerToken, HookOutcome};
pub use plugin::{FnPlugin, Plugin, PluginContext};

pub use hookweave_types::{ErrorKind, FrameworkConfig, HookError, WeaveResult};
