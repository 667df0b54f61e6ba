use serde::{Deserialize, Serialize};

use super::{DEFAULT_HISTORY_CAPACITY, DEFAULT_RECURSION_BOUND, DEFAULT_WAIT_TIMEOUT_MS};
use super::LoggingConfig;

/// Configuration accepted by the factory when constructing a `Framework`.
///
/// Carries the feature-set selection (`features`/`advanced`) alongside the
/// ambient fields (`strict_registration`, recursion bound, history
/// capacity, default wait timeout, logging) that make this a complete
/// configuration surface in the style of `filehub-core::config::AppConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Feature names to install at construction. `None` selects the
    /// small default bundle; `Some(vec![])` installs nothing.
    pub features: Option<Vec<String>>,

    /// Free-form per-plugin configuration passthrough.
    pub advanced: serde_json::Value,

    /// When true, a plugin whose `setup` fails is rolled back instead of
    /// retained.
    pub strict_registration: bool,

    /// Per-hook-name recursion bound for deferred emission. Enforced
    /// floor of [`super::MIN_RECURSION_BOUND`].
    pub recursion_bound: u32,

    /// Bounded history capacity for the state tracker.
    pub history_capacity: usize,

    /// Default `waitForState` timeout in milliseconds when the caller
    /// does not specify one.
    pub default_wait_timeout_ms: u64,

    /// Structured logging configuration.
    pub logging: LoggingConfig,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            features: None,
            advanced: serde_json::Value::Object(Default::default()),
            strict_registration: false,
            recursion_bound: DEFAULT_RECURSION_BOUND,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            default_wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            logging: LoggingConfig::default(),
        }
    }
}

impl FrameworkConfig {
    /// Whether `name` was present in the `features` list given to
    /// `Framework::new` — it does not reflect whether the feature is
    /// currently installed or enabled.
    pub fn requested_feature(&self, name: &str) -> bool {
        self.features
            .as_ref()
            .is_some_and(|fs| fs.iter().any(|f| f == name))
    }
}
