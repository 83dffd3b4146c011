//! Global config file source: $XDG_CONFIG_HOME/canvass/config.toml or ~/.config/canvass/config.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path to global config file.
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join("canvass").join("config.toml"))
}

/// Add the global config file source to builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    global_file: Option<&Path>,
) -> ConfigBuilder<DefaultState> {
    match global_file {
        Some(path) if path.exists() => {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            builder.add_source(File::from(canonical.as_path()).required(false))
        }
        Some(path) => {
            debug!(config_path = %path.display(), "No global configuration file");
            builder
        }
        None => builder,
    }
}
