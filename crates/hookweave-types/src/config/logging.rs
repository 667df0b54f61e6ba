use serde::{Deserialize, Serialize};

/// Logging configuration, grounded on `filehub-core::config::logging::LoggingConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing-subscriber` `EnvFilter` directive, e.g. `"hookweave=debug,info"`.
    pub filter: String,
    /// When true, emit structured JSON log lines instead of the pretty
    /// human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}
