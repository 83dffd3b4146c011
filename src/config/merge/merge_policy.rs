//! Merge rules: defaults applied before any file or environment source.

use crate::retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("batch.output_root", "outputs")?
        .set_default("batch.max_concurrency", 4)?
        .set_default("retry.max_attempts", i64::from(DEFAULT_MAX_ATTEMPTS))?
        .set_default(
            "retry.base_delay_ms",
            i64::try_from(DEFAULT_BASE_DELAY_MS).unwrap_or(i64::MAX),
        )
}
