//! Configuration types, loaded the way `filehub-core::config::AppConfig`
//! layers a TOML file under environment overrides via the `config` crate.

mod framework;
mod logging;

pub use framework::FrameworkConfig;
pub use logging::LoggingConfig;

use crate::error::HookError;

/// Minimum recursion bound enforced regardless of what is configured.
pub const MIN_RECURSION_BOUND: u32 = 100;

/// Default per-hook recursion bound for deferred emission.
pub const DEFAULT_RECURSION_BOUND: u32 = 500;

/// Default bounded history capacity for the state tracker.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Default `waitForState` timeout, in milliseconds.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

impl FrameworkConfig {
    /// Loads configuration from an optional TOML file plus
    /// `HOOKWEAVE__`-prefixed environment variable overrides (e.g.
    /// `HOOKWEAVE__RECURSION_BOUND=1000`), mirroring
    /// `filehub-core::config::AppConfig::load`'s layering.
    pub fn load(path: Option<&str>) -> Result<Self, HookError> {
        let mut builder = config::Config::builder()
            .set_default("strict_registration", false)?
            .set_default("recursion_bound", DEFAULT_RECURSION_BOUND as i64)?
            .set_default("history_capacity", DEFAULT_HISTORY_CAPACITY as i64)?
            .set_default("default_wait_timeout_ms", DEFAULT_WAIT_TIMEOUT_MS as i64)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let builder = builder.add_source(
            config::Environment::with_prefix("HOOKWEAVE")
                .separator("__")
                .try_parsing(true),
        );

        let raw: Self = builder.build()?.try_deserialize()?;
        raw.validated()
    }

    /// Applies the invariants a loaded (or manually constructed)
    /// configuration must satisfy before being used to build a
    /// `Framework`.
    pub fn validated(mut self) -> Result<Self, HookError> {
        if self.recursion_bound < MIN_RECURSION_BOUND {
            self.recursion_bound = MIN_RECURSION_BOUND;
        }
        if self.history_capacity == 0 {
            self.history_capacity = DEFAULT_HISTORY_CAPACITY;
        }
        Ok(self)
    }
}
