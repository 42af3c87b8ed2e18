//! Versioned documentation sites for Josman.
//!
//! This crate provides:
//! - [`SiteBuilder`]: whole-site generation across snapshot and releases
//! - [`PageRenderer`]: one Markdown page to a finished HTML page
//! - [`ExpressionEngine`]: `$eval{}` / `$evalNow{}` macro expansion
//! - [`LinkRewriter`] and [`build_sidebar`] for the page furniture
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use josman_config::ProjectConfig;
//! use josman_site::{
//!     BuildConfig, FsFileEnumerator, ProjectInfo, ProjectVersions, SiteBuilder, Version,
//! };
//!
//! let mut project = ProjectConfig::default();
//! project.name = "Wonder".to_owned();
//! project.repo_name = "wonder".to_owned();
//! project.url = "https://github.com/acme/wonder".to_owned();
//! let project = ProjectInfo::from_config(&project)?;
//!
//! let config = BuildConfig {
//!     source_dir: PathBuf::from("."),
//!     pages_dir: PathBuf::from("target/site"),
//!     ignore_errors: false,
//!     warn_on_todo: false,
//!     javadoc_dir: None,
//! };
//! let versions = Arc::new(
//!     ProjectVersions::new("wonder", Vec::new()).with_snapshot(Version::parse("0.1.0")?),
//! );
//! let files = Arc::new(FsFileEnumerator::new("."));
//! let report = SiteBuilder::new(config, project, versions, files).build()?;
//! assert!(report.pages > 0);
//! # Ok(())
//! # }
//! ```

mod builder;
mod context;
mod error;
mod eval_store;
mod evaluator;
mod expr;
pub mod github;
mod links;
mod page;
pub mod path;
mod sidebar;
mod skeleton;
mod source;
pub mod version;

pub use builder::{BuildConfig, BuildReport, SiteBuilder};
pub use context::{ProjectInfo, RenderContext, SiblingSet, VersionTabs};
pub use error::{Error, ErrorKind, Result};
pub use eval_store::{CsvResultProvider, EvalStore, ExpressionResultProvider, eval_docs};
pub use evaluator::{EvaluationContext, EvaluationError, Evaluator, FunctionRegistry};
pub use expr::{
    Expansion, Expr, ExpressionEngine, ExpressionResultMap, MacroKind, find_exprs, substitute_vars,
};
pub use links::LinkRewriter;
pub use page::{BLANK_PAGE_PLACEHOLDER, PageRenderResult, PageRenderer, PageRendererConfig};
pub use sidebar::build_sidebar;
pub use skeleton::{Skeleton, site_assets};
pub use source::{
    AssetLocator, FileEnumerator, FsAssetLocator, FsFileEnumerator, ProjectVersions, SiteVersion,
    VersionKind, VersionSource, logo_file_name,
};
pub use version::{ReleaseTag, Version};
