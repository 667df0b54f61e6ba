pub mod context;
pub mod registry;
pub mod traits;

pub use context::PluginContext;
pub use registry::{PluginRecord, PluginRegistry};
pub use traits::{FnPlugin, Plugin};
