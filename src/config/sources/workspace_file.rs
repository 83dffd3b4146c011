//! Workspace config file source: canvass.toml and config/{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use std::path::Path;

pub const ENV_NAME_VAR: &str = "CANVASS_ENV";

/// Add workspace config files to builder.
/// Precedence: canvass.toml (base) then config/{CANVASS_ENV}.toml (env-specific).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> ConfigBuilder<DefaultState> {
    let env_name = std::env::var(ENV_NAME_VAR).unwrap_or_else(|_| "development".to_string());
    let mut builder = builder;

    let base_config_path = workspace_root.join("canvass.toml");
    if base_config_path.exists() {
        builder = builder.add_source(File::from(base_config_path.as_path()).required(false));
    }

    let env_config_path = workspace_root
        .join("config")
        .join(format!("{}.toml", env_name));
    if env_config_path.exists() {
        builder = builder.add_source(File::from(env_config_path.as_path()).required(false));
    }

    builder
}
