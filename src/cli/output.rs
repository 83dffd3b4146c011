//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{CliError, ConfigError};

/// Map errors to a string for CLI output, with a hint where one helps.
pub fn map_error(e: &CliError) -> String {
    match e {
        CliError::Provider(_) => format!(
            "{}\nSet the API key variable named by provider.api_key_env (default PERPLEXITY_API_KEY).",
            e
        ),
        CliError::Config(ConfigError::Invalid(_)) => {
            format!("{}\nRun `canvass config` to see the effective configuration.", e)
        }
        _ => e.to_string(),
    }
}
