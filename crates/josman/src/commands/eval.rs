//! `josman eval` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use josman_config::{CliSettings, Config};
use josman_site::{EvalStore, EvaluationContext, FunctionRegistry, eval_docs};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the eval command.
#[derive(Args)]
pub(crate) struct EvalArgs {
    /// Result file to write (default: `site.eval_file`).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Repository root directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Stop at the first expression that fails to evaluate.
    #[arg(long)]
    fail_on_error: bool,

    /// Path to configuration file (default: auto-discover josman.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl EvalArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir.clone(),
            fail_on_error: self.fail_on_error.then_some(true),
            eval_file: self.output.clone(),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let site = &config.site_resolved;

        let evaluation =
            EvaluationContext::new(Arc::new(FunctionRegistry::from_config(&config.evaluator)));
        let docs_dir = site.source_dir.join("docs");
        output.info(&format!("Scanning {}", docs_dir.display()));

        let results = eval_docs(&docs_dir, &evaluation, site.fail_on_error)?;
        EvalStore::save(&results, &site.eval_file)?;

        output.success(&format!(
            "Saved {} expression results to {}",
            results.len(),
            site.eval_file.display()
        ));
        Ok(())
    }
}
