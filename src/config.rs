//! Configuration System
//!
//! Layered configuration for batch runs: merge-policy defaults, the global
//! config file, the workspace config files, then `CANVASS__SECTION__KEY`
//! environment variables. CLI flags are applied on top by the caller.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::provider::ProviderConfig;
use crate::retry::RetryPolicy;
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use sources::global_file::global_config_path;

pub const ENV_PREFIX: &str = "CANVASS";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvassConfig {
    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Batch run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Root directory holding one sub-directory per domain
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Workers per domain
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Subject list; the bundled country list when unset
    #[serde(default)]
    pub subjects_file: Option<PathBuf>,

    /// Domain list used by `--all-domains`; the bundled list when unset
    #[serde(default)]
    pub domains_file: Option<PathBuf>,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            max_concurrency: default_max_concurrency(),
            subjects_file: None,
            domains_file: None,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be at least 1".to_string());
        }
        if self.output_root.as_os_str().is_empty() {
            return Err("output_root cannot be empty".to_string());
        }
        Ok(())
    }
}

impl CanvassConfig {
    /// Validate every section, collecting all problems.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors: Vec<String> = [
            self.batch.validate().map_err(|e| format!("batch: {}", e)),
            self.retry.validate().map_err(|e| format!("retry: {}", e)),
            self.provider.validate().map_err(|e| format!("provider: {}", e)),
            self.logging.validate().map_err(|e| format!("logging: {}", e)),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("Failed to render configuration: {}", e)))
    }
}

/// Loads [`CanvassConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace, including the global config file.
    pub fn load(workspace_root: &Path) -> Result<CanvassConfig, ConfigError> {
        Self::load_layers(workspace_root, global_config_path().as_deref())
    }

    /// Load configuration from an explicit file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<CanvassConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            });
        }
        let builder = merge::merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .add_source(env_source());
        let config: CanvassConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load with an explicit global config file (or none).
    pub fn load_layers(
        workspace_root: &Path,
        global_file: Option<&Path>,
    ) -> Result<CanvassConfig, ConfigError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder, global_file);
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root);
        let config: CanvassConfig = builder.add_source(env_source()).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
