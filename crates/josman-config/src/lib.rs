//! Configuration management for Josman.
//!
//! Parses `josman.toml` files with serde and provides auto-discovery of the
//! config file in parent directories. CLI settings can be applied during load
//! via [`CliSettings`].
//!
//! Site toggles are resolved in three layers: the [`Mode`] preset first, then
//! values set explicitly in the `[site]` table, then CLI settings.
//!
//! ## Environment Variable Expansion
//!
//! Expanded fields:
//! - `project.url`
//! - `site.source_dir`
//! - `site.pages_dir`

mod expand;
mod mode;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use mode::{Mode, ModePreset};

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "josman.toml";

/// Documented stock configuration, as printed by `josman gen-config`.
pub const CONFIG_TEMPLATE: &str = include_str!("template.toml");

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override repository root directory.
    pub source_dir: Option<PathBuf>,
    /// Override output directory.
    pub pages_dir: Option<PathBuf>,
    /// Override build mode. Resets all toggles to the mode preset.
    pub mode: Option<Mode>,
    pub snapshot: Option<bool>,
    pub releases: Option<bool>,
    pub javadoc: Option<bool>,
    pub fail_on_error: Option<bool>,
    /// Additional versions to skip, on top of the configured ones.
    pub ignored_versions: Option<Vec<String>>,
    /// Override expression result file.
    pub eval_file: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project metadata.
    pub project: ProjectConfig,
    /// Site configuration (paths are relative strings from TOML).
    site: SiteConfigRaw,
    /// Registered callables for expression evaluation.
    pub evaluator: EvaluatorConfig,

    /// Resolved site configuration (set after loading).
    #[serde(skip)]
    pub site_resolved: SiteConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Project metadata used for substitutions and links.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub repo_name: String,
    pub group_id: String,
    pub version: String,
    pub url: String,
    pub description: String,
    /// GitHub organization. Parsed from `url` when absent.
    pub organization: Option<String>,
    pub scm: ScmConfig,
    /// Arbitrary `${key}` substitutions.
    pub properties: BTreeMap<String, String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            repo_name: String::new(),
            group_id: String::new(),
            version: "0.1.0".to_owned(),
            url: String::new(),
            description: String::new(),
            organization: None,
            scm: ScmConfig::default(),
            properties: BTreeMap::new(),
        }
    }
}

/// Source control metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScmConfig {
    pub url: String,
    pub connection: String,
    pub developer_connection: String,
    pub tag: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SiteConfigRaw {
    source_dir: Option<String>,
    pages_dir: Option<String>,
    mode: Option<Mode>,
    snapshot: Option<bool>,
    releases: Option<bool>,
    javadoc: Option<bool>,
    fail_on_error: Option<bool>,
    ignored_versions: Option<Vec<String>>,
    eval_file: Option<String>,
    release_evals_dir: Option<String>,
    javadoc_dir: Option<String>,
}

/// Resolved site configuration with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Repository root holding `docs/` and `README.md`.
    pub source_dir: PathBuf,
    /// Output directory. Wiped before each build.
    pub pages_dir: PathBuf,
    pub mode: Mode,
    /// Generate the development snapshot.
    pub snapshot: bool,
    /// Generate documentation of past release tags.
    pub releases: bool,
    /// Copy the local javadoc directory into the snapshot.
    pub javadoc: bool,
    /// Abort on the first page error instead of degrading.
    pub fail_on_error: bool,
    /// Versions (`X.Y.Z`) that are never published.
    pub ignored_versions: Vec<String>,
    /// Expression results of the current sources.
    pub eval_file: PathBuf,
    /// Per-tag expression results, named `<repo>-X.Y.Z.csv`.
    pub release_evals_dir: PathBuf,
    pub javadoc_dir: PathBuf,
}

impl SiteConfig {
    fn with_base(base: &Path) -> Self {
        let preset = Mode::default().preset();
        Self {
            source_dir: base.to_path_buf(),
            pages_dir: base.join("target/site"),
            mode: Mode::default(),
            snapshot: preset.snapshot,
            releases: preset.releases,
            javadoc: preset.javadoc,
            fail_on_error: preset.fail_on_error,
            ignored_versions: Vec::new(),
            eval_file: base.join("target/josman/eval.csv"),
            release_evals_dir: base.join("target/josman/evals"),
            javadoc_dir: base.join("target/apidocs"),
        }
    }

    fn apply_mode(&mut self, mode: Mode) {
        let preset = mode.preset();
        self.mode = mode;
        self.snapshot = preset.snapshot;
        self.releases = preset.releases;
        self.javadoc = preset.javadoc;
        self.fail_on_error = preset.fail_on_error;
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::with_base(Path::new("."))
    }
}

/// Callables registered for `$evalNow{}` and the eval pass.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Static fields: dotted name to literal value.
    pub fields: BTreeMap<String, String>,
    /// Zero-argument methods: `a.b.method()` to the argv of a command whose
    /// trimmed stdout is the result.
    pub commands: BTreeMap<String, Vec<String>>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`project.url`").
        field: String,
        /// Error message (e.g., "${`ORG`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `josman.toml` in current directory and parents.
    /// The result is validated after CLI settings are applied.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        let site = &mut self.site_resolved;
        if let Some(mode) = settings.mode {
            site.apply_mode(mode);
        }
        if let Some(source_dir) = &settings.source_dir {
            site.source_dir.clone_from(source_dir);
        }
        if let Some(pages_dir) = &settings.pages_dir {
            site.pages_dir.clone_from(pages_dir);
        }
        if let Some(snapshot) = settings.snapshot {
            site.snapshot = snapshot;
        }
        if let Some(releases) = settings.releases {
            site.releases = releases;
        }
        if let Some(javadoc) = settings.javadoc {
            site.javadoc = javadoc;
        }
        if let Some(fail_on_error) = settings.fail_on_error {
            site.fail_on_error = fail_on_error;
        }
        if let Some(ignored) = &settings.ignored_versions {
            for version in ignored {
                if !site.ignored_versions.contains(version) {
                    site.ignored_versions.push(version.clone());
                }
            }
        }
        if let Some(eval_file) = &settings.eval_file {
            site.eval_file.clone_from(eval_file);
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_project()?;
        self.validate_site()?;
        self.validate_evaluator()?;
        Ok(())
    }

    fn validate_project(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.project.repo_name, "project.repo_name")?;
        require_non_empty(&self.project.version, "project.version")?;
        if !self.project.url.is_empty() {
            require_http_url(&self.project.url, "project.url")?;
        }
        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        let site = &self.site_resolved;
        if site.source_dir == site.pages_dir {
            return Err(ConfigError::Validation(format!(
                "site.pages_dir cannot be the same as site.source_dir ({})",
                site.source_dir.display()
            )));
        }
        if !site.snapshot && !site.releases {
            return Err(ConfigError::Validation(
                "at least one of site.snapshot and site.releases must be enabled".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_evaluator(&self) -> Result<(), ConfigError> {
        for (name, argv) in &self.evaluator.commands {
            if argv.first().is_none_or(|program| program.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "evaluator.commands.\"{name}\" must name a program"
                )));
            }
        }
        Ok(())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            project: ProjectConfig::default(),
            site: SiteConfigRaw::default(),
            evaluator: EvaluatorConfig::default(),
            site_resolved: SiteConfig::with_base(base),
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_site(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.project.url = expand::expand_env(&self.project.url, "project.url")?;
        if let Some(ref dir) = self.site.source_dir {
            self.site.source_dir = Some(expand::expand_env(dir, "site.source_dir")?);
        }
        if let Some(ref dir) = self.site.pages_dir {
            self.site.pages_dir = Some(expand::expand_env(dir, "site.pages_dir")?);
        }
        Ok(())
    }

    /// Resolve the raw `[site]` table against the config directory.
    fn resolve_site(&mut self, config_dir: &Path) {
        let raw = &self.site;
        let source_dir = match raw.source_dir.as_deref() {
            Some(dir) => config_dir.join(dir),
            None => config_dir.to_path_buf(),
        };
        let resolve = |path: Option<&str>, default: &str| {
            config_dir.join(path.unwrap_or(default))
        };

        let mut site = SiteConfig::with_base(config_dir);
        site.apply_mode(raw.mode.unwrap_or_default());
        site.source_dir = source_dir;
        site.pages_dir = resolve(raw.pages_dir.as_deref(), "target/site");
        site.eval_file = resolve(raw.eval_file.as_deref(), "target/josman/eval.csv");
        site.release_evals_dir =
            resolve(raw.release_evals_dir.as_deref(), "target/josman/evals");
        site.javadoc_dir = resolve(raw.javadoc_dir.as_deref(), "target/apidocs");
        if let Some(snapshot) = raw.snapshot {
            site.snapshot = snapshot;
        }
        if let Some(releases) = raw.releases {
            site.releases = releases;
        }
        if let Some(javadoc) = raw.javadoc {
            site.javadoc = javadoc;
        }
        if let Some(fail_on_error) = raw.fail_on_error {
            site.fail_on_error = fail_on_error;
        }
        site.ignored_versions = raw.ignored_versions.clone().unwrap_or_default();

        self.site_resolved = site;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const MINIMAL: &str = r#"
[project]
name = "Widget"
repo_name = "widget"
url = "https://github.com/acme/widget"
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        let site = &config.site_resolved;
        assert_eq!(site.source_dir, PathBuf::from("/test"));
        assert_eq!(site.pages_dir, PathBuf::from("/test/target/site"));
        assert_eq!(site.eval_file, PathBuf::from("/test/target/josman/eval.csv"));
        assert_eq!(site.mode, Mode::Dev);
        assert!(site.snapshot);
        assert!(!site.releases);
        assert!(!site.fail_on_error);
    }

    #[test]
    fn test_parse_project_config() {
        let toml = r#"
[project]
name = "Widget"
repo_name = "widget"
group_id = "com.acme"
version = "1.2.0-SNAPSHOT"

[project.scm]
url = "https://github.com/acme/widget"
developer_connection = "scm:git:git@github.com:acme/widget.git"

[project.properties]
"widget.color" = "blue"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.project.name, "Widget");
        assert_eq!(config.project.version, "1.2.0-SNAPSHOT");
        assert_eq!(
            config.project.scm.developer_connection,
            "scm:git:git@github.com:acme/widget.git"
        );
        assert_eq!(config.project.properties["widget.color"], "blue");
        assert!(config.project.organization.is_none());
    }

    #[test]
    fn test_parse_evaluator_config() {
        let toml = r#"
[evaluator.fields]
"acme.Consts.GREETING" = "hello"

[evaluator.commands]
"acme.Build.rustc()" = ["rustc", "--version"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.evaluator.fields["acme.Consts.GREETING"], "hello");
        assert_eq!(
            config.evaluator.commands["acme.Build.rustc()"],
            vec!["rustc".to_owned(), "--version".to_owned()]
        );
    }

    #[test]
    fn test_resolve_site_applies_mode_then_explicit_values() {
        let toml = r#"
[site]
mode = "release"
javadoc = false
pages_dir = "out/site"
ignored_versions = ["0.1.0"]
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_site(Path::new("/project"));

        let site = &config.site_resolved;
        assert_eq!(site.mode, Mode::Release);
        assert!(!site.snapshot);
        assert!(site.releases);
        assert!(site.fail_on_error);
        assert!(!site.javadoc);
        assert_eq!(site.pages_dir, PathBuf::from("/project/out/site"));
        assert_eq!(site.source_dir, PathBuf::from("/project"));
        assert_eq!(site.ignored_versions, vec!["0.1.0".to_owned()]);
    }

    #[test]
    fn test_cli_mode_resets_toggles() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site_resolved.javadoc = true;
        config.apply_cli_settings(&CliSettings {
            mode: Some(Mode::Staging),
            fail_on_error: Some(false),
            ..Default::default()
        });

        let site = &config.site_resolved;
        assert_eq!(site.mode, Mode::Staging);
        assert!(site.snapshot);
        assert!(site.releases);
        assert!(site.javadoc);
        assert!(!site.fail_on_error);
    }

    #[test]
    fn test_cli_ignored_versions_are_merged() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site_resolved.ignored_versions = vec!["0.1.0".to_owned()];
        config.apply_cli_settings(&CliSettings {
            ignored_versions: Some(vec!["0.1.0".to_owned(), "0.2.3".to_owned()]),
            ..Default::default()
        });

        assert_eq!(
            config.site_resolved.ignored_versions,
            vec!["0.1.0".to_owned(), "0.2.3".to_owned()]
        );
    }

    #[test]
    fn test_validate_requires_repo_name() {
        let config = Config::default_with_base(Path::new("/test"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("project.repo_name"));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.resolve_site(Path::new("/project"));
        config.project.url = "github.com/acme/widget".to_owned();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("project.url"));
    }

    #[test]
    fn test_validate_rejects_same_source_and_pages() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.resolve_site(Path::new("/project"));
        config.site_resolved.pages_dir = PathBuf::from("/project");

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("site.pages_dir"));
    }

    #[test]
    fn test_validate_requires_something_to_generate() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.resolve_site(Path::new("/project"));
        config.site_resolved.snapshot = false;
        config.site_resolved.releases = false;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.resolve_site(Path::new("/project"));
        config
            .evaluator
            .commands
            .insert("a.B.c()".to_owned(), Vec::new());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("a.B.c()"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, MINIMAL).unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.project.repo_name, "widget");
        assert_eq!(config.site_resolved.source_dir, dir.path());
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/josman.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_template_is_valid() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.project.repo_name, "my-project");
        assert!(config.evaluator.commands.is_empty());
    }
}
