//! Error, configuration, and result types shared across hookweave crates.

pub mod config;
pub mod error;
pub mod result;

pub use config::{FrameworkConfig, LoggingConfig};
pub use error::{ErrorKind, HookError};
pub use result::WeaveResult;
