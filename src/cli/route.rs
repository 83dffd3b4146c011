//! CLI route: single route table and run context. Dispatches to the batch
//! engine and the report formatters.

use crate::batch::{batch_succeeded, BatchCoordinator};
use crate::cli::parse::{Commands, RunOptions};
use crate::config::{CanvassConfig, ConfigLoader};
use crate::data::{load_domains, load_subjects, parse_domain_arg};
use crate::error::CliError;
use crate::export::CsvExporter;
use crate::provider::{AnsweringService, SonarClient};
use crate::report::{
    build_cache_status, format_batch_summary_text, format_cache_status_text,
    format_domain_list_text,
};
use crate::types::{domain_display_name, domain_slug};
use crate::validation::JsonAnswerValidator;
use crate::workflow::WorkflowServices;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Rendered command result.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub text: String,
    /// False when the process should exit non-zero.
    pub success: bool,
}

impl CommandOutput {
    fn ok(text: String) -> Self {
        Self {
            text,
            success: true,
        }
    }
}

/// Runtime context for CLI execution: workspace, loaded config and stop token.
pub struct RunContext {
    workspace_root: PathBuf,
    config: CanvassConfig,
    cancel: CancellationToken,
    service: Option<Arc<dyn AnsweringService>>,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, CliError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self::from_config(workspace_root, config))
    }

    pub fn from_config(workspace_root: PathBuf, config: CanvassConfig) -> Self {
        Self {
            workspace_root,
            config,
            cancel: CancellationToken::new(),
            service: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Use this answering service instead of the configured HTTP client.
    pub fn with_service(mut self, service: Arc<dyn AnsweringService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn config(&self) -> &CanvassConfig {
        &self.config
    }

    pub async fn execute(&self, command: &Commands) -> Result<CommandOutput, CliError> {
        match command {
            Commands::Run {
                domains,
                all_domains,
                options,
            } => {
                let domains = if *all_domains {
                    self.known_domains()?
                } else {
                    let requested = domains.as_deref().map(parse_domain_arg).unwrap_or_default();
                    self.warn_unknown(&requested)?;
                    requested
                };
                if domains.is_empty() {
                    return Err(CliError::Usage("No domains specified".to_string()));
                }
                self.run_domains(&domains, options).await
            }
            Commands::Domain { name, options } => {
                if domain_slug(name).is_empty() {
                    return Err(CliError::Usage("Domain name cannot be empty".to_string()));
                }
                self.warn_unknown(std::slice::from_ref(name))?;
                self.run_domains(std::slice::from_ref(name), options).await
            }
            Commands::Status {
                output_dir,
                domains,
                format,
            } => {
                let output_root = self.output_root(output_dir.as_deref());
                let domains = match domains {
                    Some(arg) => parse_domain_arg(arg),
                    None => self.known_domains()?,
                };
                let entries = build_cache_status(&output_root, &domains)?;
                let text = match format.as_str() {
                    "json" => to_json(&entries)?,
                    _ => format_cache_status_text(&entries, &output_root),
                };
                Ok(CommandOutput::ok(text))
            }
            Commands::Domains => Ok(CommandOutput::ok(format_domain_list_text(
                &self.known_domains()?,
            ))),
            Commands::Config => Ok(CommandOutput::ok(self.config.to_toml()?)),
        }
    }

    async fn run_domains(
        &self,
        domains: &[String],
        options: &RunOptions,
    ) -> Result<CommandOutput, CliError> {
        let output_root = self.output_root(options.output_dir.as_deref());
        let workers = options.workers.unwrap_or(self.config.batch.max_concurrency);
        if workers == 0 {
            return Err(CliError::Usage("--workers must be at least 1".to_string()));
        }

        let subjects_file = options
            .subjects_file
            .clone()
            .or_else(|| self.config.batch.subjects_file.clone())
            .map(|path| self.resolve(&path));
        let subjects = load_subjects(subjects_file.as_deref())?;

        let service = match &self.service {
            Some(service) => Arc::clone(service),
            None => Arc::new(SonarClient::from_env(self.config.provider.clone())?)
                as Arc<dyn AnsweringService>,
        };
        let services = WorkflowServices::new(
            service,
            Arc::new(JsonAnswerValidator),
            Arc::new(CsvExporter),
            self.config.retry,
        )
        .with_force(options.force)
        .with_cancellation(self.cancel.clone());

        info!(
            domains = domains.len(),
            subjects = subjects.len(),
            workers,
            output_root = %output_root.display(),
            "Running domains sequentially"
        );
        let coordinator = BatchCoordinator::new(services, subjects);
        let summaries = coordinator.run_batch(domains, &output_root, workers).await;

        let text = match options.format.as_str() {
            "json" => to_json(&summaries)?,
            _ => format_batch_summary_text(&summaries),
        };
        Ok(CommandOutput {
            text,
            success: batch_succeeded(&summaries),
        })
    }

    fn known_domains(&self) -> Result<Vec<String>, CliError> {
        let path = self
            .config
            .batch
            .domains_file
            .as_ref()
            .map(|path| self.resolve(path));
        Ok(load_domains(path.as_deref())?)
    }

    /// Unknown domains still run; they are only reported.
    fn warn_unknown(&self, requested: &[String]) -> Result<(), CliError> {
        let known: Vec<String> = self
            .known_domains()?
            .iter()
            .map(|d| domain_display_name(d))
            .collect();
        for domain in requested {
            if !known.contains(&domain_display_name(domain)) {
                warn!(domain = %domain, "Domain is not in the domain list");
            }
        }
        Ok(())
    }

    fn output_root(&self, override_dir: Option<&Path>) -> PathBuf {
        let dir = override_dir.unwrap_or(self.config.batch.output_root.as_path());
        self.resolve(dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::Output(e.to_string()))
}
