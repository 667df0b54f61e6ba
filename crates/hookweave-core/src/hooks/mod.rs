pub mod definitions;
pub mod dispatcher;
pub mod registry;

pub use definitions::{
    BoxFuture, ClosureHandler, Handler, HandlerEntry, HandlerToken, HookOutcome, CORE_PLUGIN,
    PLUGIN_ERROR_HOOK,
};
pub use registry::HookRegistry;
