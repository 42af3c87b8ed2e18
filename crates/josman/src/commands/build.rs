//! `josman build` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use josman_config::{CliSettings, Config, Mode};
use josman_site::{
    BuildConfig, CsvResultProvider, EvaluationContext, FsFileEnumerator, FunctionRegistry,
    ProjectInfo, ProjectVersions, SiteBuilder, Version,
};
use josman_vcs::GitRepo;
use tracing::warn;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Repository root directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory; its name must end with "site" (overrides config).
    #[arg(short, long)]
    pages_dir: Option<PathBuf>,

    /// Build mode preset: dev, ci, staging or release.
    #[arg(short, long, env = "JOSMAN_MODE")]
    mode: Option<Mode>,

    /// Generate the snapshot of the working tree.
    #[arg(long, overrides_with = "no_snapshot")]
    snapshot: bool,

    /// Skip the snapshot of the working tree.
    #[arg(long)]
    no_snapshot: bool,

    /// Generate the docs of past release tags.
    #[arg(long)]
    releases: bool,

    /// Copy the local API docs into the snapshot.
    #[arg(long)]
    javadoc: bool,

    /// Stop at the first page error instead of skipping it.
    #[arg(long)]
    fail_on_error: bool,

    /// Release versions never to publish (comma-separated X.Y.Z).
    #[arg(long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Path to configuration file (default: auto-discover josman.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl BuildArgs {
    fn cli_settings(&self) -> CliSettings {
        let snapshot = if self.no_snapshot {
            Some(false)
        } else {
            self.snapshot.then_some(true)
        };
        CliSettings {
            source_dir: self.source_dir.clone(),
            pages_dir: self.pages_dir.clone(),
            mode: self.mode,
            snapshot,
            releases: self.releases.then_some(true),
            javadoc: self.javadoc.then_some(true),
            fail_on_error: self.fail_on_error.then_some(true),
            ignored_versions: (!self.ignore.is_empty()).then(|| self.ignore.clone()),
            eval_file: None,
        }
    }

    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref(), Some(&self.cli_settings()))?;
        let site = &config.site_resolved;
        let project = ProjectInfo::from_config(&config.project)?;

        output.info(&format!(
            "Building {} ({} mode)",
            project.display_name(),
            site.mode
        ));
        output.info(&format!("Source: {}", site.source_dir.display()));
        output.info(&format!("Output: {}", site.pages_dir.display()));

        let ignored = site
            .ignored_versions
            .iter()
            .map(|v| Version::parse(v))
            .collect::<Result<Vec<_>, _>>()?;

        let git = if site.releases {
            Some(Arc::new(GitRepo::open(&site.source_dir)?))
        } else {
            None
        };
        let tags = match &git {
            Some(repo) => repo.tags()?,
            None => Vec::new(),
        };

        let mut versions = ProjectVersions::new(project.repo_name.clone(), tags)
            .with_releases(site.releases)
            .with_ignored(ignored);
        if site.snapshot {
            versions = versions.with_snapshot(Version::snapshot(&config.project.version)?);
            if let Some(repo) = &git {
                check_branch(repo, &config.project.version);
            }
        }

        let build_config = BuildConfig {
            source_dir: site.source_dir.clone(),
            pages_dir: site.pages_dir.clone(),
            ignore_errors: !site.fail_on_error,
            warn_on_todo: site.releases,
            javadoc_dir: site.javadoc.then(|| site.javadoc_dir.clone()),
        };
        let evaluation =
            EvaluationContext::new(Arc::new(FunctionRegistry::from_config(&config.evaluator)));
        let results = CsvResultProvider::new(&site.eval_file, &site.release_evals_dir);

        let mut builder = SiteBuilder::new(
            build_config,
            project,
            Arc::new(versions),
            Arc::new(FsFileEnumerator::new(&site.source_dir)),
        )
        .with_results(Arc::new(results))
        .with_evaluation(evaluation);
        if let Some(repo) = git {
            builder = builder.with_release_files(repo);
        }

        let report = builder.build()?;

        output.warning_list("Degraded pages", &report.warnings);
        output.warning_list("Skipped pages", &report.skipped);
        let published: Vec<String> = report.versions.iter().map(Version::major_minor).collect();
        output.success(&format!(
            "Built {} pages for versions {} into {}",
            report.pages,
            published.join(", "),
            site.pages_dir.display()
        ));
        Ok(())
    }
}

/// Warn when a `branch-X.Y` checkout does not match the project version.
fn check_branch(repo: &GitRepo, project_version: &str) {
    let Ok(Some(branch)) = repo.current_branch() else {
        return;
    };
    let Ok(branch_version) = Version::from_branch_name(&branch) else {
        return;
    };
    let Ok(snapshot) = Version::snapshot(project_version) else {
        return;
    };
    if !branch_version.same_release_line(&snapshot) {
        warn!(
            branch = %branch,
            project_version,
            "Branch release line differs from the project version"
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: BuildArgs,
    }

    #[test]
    fn test_cli_settings_from_flags() {
        let cli = TestCli::parse_from([
            "josman",
            "--mode",
            "staging",
            "--no-snapshot",
            "--fail-on-error",
            "--ignore",
            "0.1.0,0.2.3",
        ]);
        let settings = cli.args.cli_settings();
        assert_eq!(settings.mode, Some(Mode::Staging));
        assert_eq!(settings.snapshot, Some(false));
        assert_eq!(settings.releases, None);
        assert_eq!(settings.fail_on_error, Some(true));
        assert_eq!(
            settings.ignored_versions,
            Some(vec!["0.1.0".to_owned(), "0.2.3".to_owned()])
        );
    }

    #[test]
    fn test_cli_settings_default_to_config() {
        let cli = TestCli::parse_from(["josman"]);
        let settings = cli.args.cli_settings();
        assert_eq!(settings.mode, None);
        assert_eq!(settings.snapshot, None);
        assert!(settings.ignored_versions.is_none());
    }
}
