//! # hookweave-sdk
//!
//! Prelude and authoring conveniences for hookweave plugins.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hookweave_sdk::prelude::*;
//!
//! struct Logger;
//!
//! #[async_trait]
//! impl Plugin for Logger {
//!     fn name(&self) -> Option<&str> { Some("logger") }
//!
//!     async fn setup(&self, ctx: PluginContext) -> Result<(), HookError> {
//!         ctx.on("agent:run", 0, Arc::new(ClosureHandler::new(|event| async move {
//!             tracing::info!(?event, "agent:run dispatched");
//!             Ok(HookOutcome::undefined())
//!         }))).await?;
//!         Ok(())
//!     }
//! }
//! ```

pub mod macros;

/// Prelude for convenient imports.
pub mod prelude {
    pub use async_trait::async_trait;
    pub use serde_json::{json, Value};

    pub use hookweave_core::{
        ClosureHandler, FnPlugin, Framework, Handler, HandlerToken, HookOutcome, Plugin,
        PluginContext,
    };
    pub use hookweave_types::{ErrorKind, FrameworkConfig, HookError, WeaveResult};
}
