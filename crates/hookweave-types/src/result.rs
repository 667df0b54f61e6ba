use crate::error::HookError;

/// Result alias used across hookweave crates.
pub type WeaveResult<T> = Result<T, HookError>;
