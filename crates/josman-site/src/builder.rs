//! Whole-site generation.
//!
//! [`SiteBuilder`] drives the page pipeline: it cleans the output, lists the
//! versions, renders the root index, renders every version into its own
//! `<major>.<minor>/` directory and publishes the shared assets.
//!
//! # Thread Safety
//!
//! Versions are rendered in parallel with rayon. Every input of a version
//! (its file list, siblings, expression results and the version tabs) is
//! computed before any of its pages, and each version writes a disjoint
//! directory, so no locking is needed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use josman_renderer::{MarkdownRenderer, PulldownRenderer};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::context::{ProjectInfo, RenderContext, SiblingSet, VersionTabs};
use crate::error::{Error, ErrorKind, Result};
use crate::eval_store::ExpressionResultProvider;
use crate::evaluator::EvaluationContext;
use crate::expr::ExpressionResultMap;
use crate::page::{PageRenderer, PageRendererConfig};
use crate::path::{DOCS_FOLDER, DOCS_README, README_MD, target_file};
use crate::skeleton::{Skeleton, site_assets};
use crate::source::{AssetLocator, FileEnumerator, FsAssetLocator, SiteVersion, VersionSource};
use crate::version::Version;

const LATEST_DIR: &str = "latest";
const JAVADOC_DIR: &str = "javadoc";
const LICENSE_FILE: &str = "LICENSE.txt";

/// Convert Duration to milliseconds as f64.
fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Configuration for [`SiteBuilder`].
#[derive(Clone, Debug)]
pub struct BuildConfig {
    /// Repository root holding `README.md`, `LICENSE.txt` and `docs/`.
    pub source_dir: PathBuf,
    /// Output directory. Its name must end with `site`; it is wiped first.
    pub pages_dir: PathBuf,
    /// Degrade page failures to warnings instead of stopping.
    pub ignore_errors: bool,
    /// Warn about leftover "todo" mentions.
    pub warn_on_todo: bool,
    /// Local API docs copied into the snapshot, if enabled.
    pub javadoc_dir: Option<PathBuf>,
}

/// Outcome of a build.
#[derive(Clone, Debug, Default)]
pub struct BuildReport {
    /// Published versions, in build order.
    pub versions: Vec<Version>,
    /// Rendered Markdown pages, root index included.
    pub pages: usize,
    /// Files copied verbatim.
    pub copied: usize,
    /// Degraded problems of rendered pages.
    pub warnings: Vec<String>,
    /// Pages left out because their render failed in lenient mode.
    pub skipped: Vec<String>,
}

impl BuildReport {
    fn merge(&mut self, other: BuildReport) {
        self.versions.extend(other.versions);
        self.pages += other.pages;
        self.copied += other.copied;
        self.warnings.extend(other.warnings);
        self.skipped.extend(other.skipped);
    }
}

struct NoResults;

impl ExpressionResultProvider for NoResults {
    fn load_results(&self, _version: &SiteVersion) -> Result<ExpressionResultMap> {
        Ok(ExpressionResultMap::new())
    }
}

/// Generates the documentation site of a project.
pub struct SiteBuilder {
    config: BuildConfig,
    project: ProjectInfo,
    versions: Arc<dyn VersionSource>,
    snapshot_files: Arc<dyn FileEnumerator>,
    release_files: Option<Arc<dyn FileEnumerator>>,
    results: Arc<dyn ExpressionResultProvider>,
    assets: Arc<dyn AssetLocator>,
    markdown: Arc<dyn MarkdownRenderer>,
    evaluation: EvaluationContext,
}

impl SiteBuilder {
    /// Builder reading the snapshot through `snapshot_files`.
    ///
    /// Logos default to the ones under `<source>/docs/img/`, Markdown to
    /// pulldown-cmark, and no expression results are preloaded.
    #[must_use]
    pub fn new(
        config: BuildConfig,
        project: ProjectInfo,
        versions: Arc<dyn VersionSource>,
        snapshot_files: Arc<dyn FileEnumerator>,
    ) -> Self {
        let assets = Arc::new(FsAssetLocator::new(
            &config.source_dir,
            &project.repo_name,
            &project.organization,
        ));
        Self {
            config,
            project,
            versions,
            snapshot_files,
            release_files: None,
            results: Arc::new(NoResults),
            assets,
            markdown: Arc::new(PulldownRenderer::new()),
            evaluation: EvaluationContext::default(),
        }
    }

    /// Source of release tag trees.
    #[must_use]
    pub fn with_release_files(mut self, files: Arc<dyn FileEnumerator>) -> Self {
        self.release_files = Some(files);
        self
    }

    #[must_use]
    pub fn with_results(mut self, results: Arc<dyn ExpressionResultProvider>) -> Self {
        self.results = results;
        self
    }

    #[must_use]
    pub fn with_assets(mut self, assets: Arc<dyn AssetLocator>) -> Self {
        self.assets = assets;
        self
    }

    #[must_use]
    pub fn with_markdown(mut self, markdown: Arc<dyn MarkdownRenderer>) -> Self {
        self.markdown = markdown;
        self
    }

    #[must_use]
    pub fn with_evaluation(mut self, evaluation: EvaluationContext) -> Self {
        self.evaluation = evaluation;
        self
    }

    /// Generate the whole site into the pages directory.
    pub fn build(&self) -> Result<BuildReport> {
        let start = Instant::now();
        let pages_dir = &self.config.pages_dir;
        clean_pages_dir(pages_dir)?;

        let versions = self.versions_to_build()?;
        let snapshot = versions.iter().find(|v| v.is_snapshot()).cloned();
        let releases: Vec<Version> = versions
            .iter()
            .filter(|v| !v.is_snapshot())
            .map(|v| v.version.clone())
            .collect();
        let tabs = VersionTabs::for_build(snapshot.as_ref().map(|s| &s.version), &releases);

        let renderer = PageRenderer::new(
            Arc::clone(&self.markdown),
            self.evaluation.clone(),
            Arc::clone(&self.assets),
            Skeleton::embedded()?,
            tabs,
            PageRendererConfig {
                ignore_errors: self.config.ignore_errors,
                warn_on_todo: self.config.warn_on_todo,
            },
        );

        let latest = latest_version(&versions)?;
        let mut report = self.build_index(&renderer, latest)?;

        let version_reports: Vec<BuildReport> = versions
            .par_iter()
            .map(|version| self.build_version(&renderer, version))
            .collect::<Result<_>>()?;
        for version_report in version_reports {
            report.merge(version_report);
        }

        if let Some(snapshot) = &snapshot {
            let version_dir = pages_dir.join(snapshot.version.major_minor());
            if let Some(javadoc_dir) = &self.config.javadoc_dir {
                copy_javadoc(javadoc_dir, &version_dir)?;
            }
            let latest_dir = pages_dir.join(LATEST_DIR);
            info!(dir = %latest_dir.display(), "Creating latest docs directory");
            copy_dir(&version_dir, &latest_dir)?;
        }

        self.publish_assets()?;
        info!(
            pages = report.pages,
            copied = report.copied,
            skipped = report.skipped.len(),
            elapsed_ms = elapsed_ms(start),
            dir = %pages_dir.display(),
            "Site generated"
        );
        Ok(report)
    }

    /// Listed versions, dropping releases that share the snapshot's line.
    fn versions_to_build(&self) -> Result<Vec<SiteVersion>> {
        let listed = self.versions.list_versions()?;
        let snapshot = listed
            .iter()
            .find(|v| v.is_snapshot())
            .map(|v| v.version.clone());

        let versions: Vec<SiteVersion> = listed
            .into_iter()
            .filter(|v| {
                let shadowed = !v.is_snapshot()
                    && snapshot
                        .as_ref()
                        .is_some_and(|s| s.same_release_line(&v.version));
                if shadowed {
                    info!(version = %v.version, "Snapshot replaces release of the same line");
                }
                !shadowed
            })
            .collect();
        if versions.is_empty() {
            return Err(Error::MissingData("no version to publish".to_owned()));
        }
        Ok(versions)
    }

    /// Root `README.md` of the working tree as the site index.
    fn build_index(&self, renderer: &PageRenderer, latest: &SiteVersion) -> Result<BuildReport> {
        info!(version = %latest.version, "Building index");
        let content = self.snapshot_files.read_file(latest, README_MD)?;
        let siblings = SiblingSet::new(vec![README_MD.to_owned()])?;
        let results = self.results.load_results(latest)?;
        let ctx = RenderContext {
            version: &latest.version,
            rel_path: README_MD,
            siblings: &siblings,
            results: &results,
            project: &self.project,
        };
        let (_, page) = renderer.render_to_file(&content, &ctx, &self.config.pages_dir)?;
        Ok(BuildReport {
            pages: 1,
            warnings: page.warnings,
            ..BuildReport::default()
        })
    }

    fn files_for(&self, version: &SiteVersion) -> Result<&dyn FileEnumerator> {
        if version.is_snapshot() {
            return Ok(self.snapshot_files.as_ref());
        }
        self.release_files
            .as_deref()
            .ok_or_else(|| Error::Source(format!("no source for the files of release {}", version.version)))
    }

    /// Render one version into `<pages>/<major>.<minor>/`.
    fn build_version(&self, renderer: &PageRenderer, version: &SiteVersion) -> Result<BuildReport> {
        let start = Instant::now();
        let pages_dir = &self.config.pages_dir;
        let version_dir = pages_dir.join(version.version.major_minor());
        if version_dir.exists() {
            fs::remove_dir_all(&version_dir).map_err(|e| Error::io(&version_dir, e))?;
        }
        info!(version = %version.version, kind = ?version.kind, "Processing version");

        let files = self.files_for(version)?;
        let rel_paths = files.list_doc_pages(version)?;
        let md_pages: Vec<&String> = rel_paths.iter().filter(|p| p.ends_with(".md")).collect();

        let mut report = BuildReport {
            versions: vec![version.version.clone()],
            ..BuildReport::default()
        };
        let results = self.results.load_results(version)?;

        if md_pages.is_empty() {
            if version.is_snapshot() {
                return Err(Error::MissingData(format!(
                    "no Markdown page under {DOCS_FOLDER}/ for version {}",
                    version.version
                )));
            }
            warn!(version = %version.version, "No pages under docs/, publishing README.md instead");
            let content = files.read_file(version, README_MD)?;
            let siblings = SiblingSet::new(vec![DOCS_README.to_owned()])?;
            self.render_page(renderer, version, DOCS_README, &content, &siblings, &results, &mut report)?;
            return Ok(report);
        }

        let mut sibling_paths: Vec<String> = md_pages
            .iter()
            .filter(|p| {
                p.strip_prefix(DOCS_FOLDER)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .is_some_and(|name| !name.contains('/'))
            })
            .map(|p| (*p).clone())
            .collect();
        if sibling_paths.is_empty() {
            sibling_paths = md_pages.iter().map(|p| (*p).clone()).collect();
        }
        let siblings = SiblingSet::new(sibling_paths)?;

        for rel_path in &rel_paths {
            let content = files.read_file(version, rel_path)?;
            if rel_path.ends_with(".md") {
                self.render_page(renderer, version, rel_path, &content, &siblings, &results, &mut report)?;
            } else {
                copy_bytes(&content, &target_file(pages_dir, rel_path, &version.version)?)?;
                report.copied += 1;
            }
        }
        info!(
            version = %version.version,
            pages = report.pages,
            copied = report.copied,
            elapsed_ms = elapsed_ms(start),
            "Version done"
        );
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_page(
        &self,
        renderer: &PageRenderer,
        version: &SiteVersion,
        rel_path: &str,
        content: &[u8],
        siblings: &SiblingSet,
        results: &ExpressionResultMap,
        report: &mut BuildReport,
    ) -> Result<()> {
        let ctx = RenderContext {
            version: &version.version,
            rel_path,
            siblings,
            results,
            project: &self.project,
        };
        match renderer.render_to_file(content, &ctx, &self.config.pages_dir) {
            Ok((_, page)) => {
                report.pages += 1;
                report.warnings.extend(page.warnings);
                Ok(())
            }
            Err(err) if self.config.ignore_errors && err.kind() != ErrorKind::IoFailure => {
                warn!(rel_path, version = %version.version, error = %err, "Skipping page");
                report.skipped.push(format!("{}/{rel_path}", version.version.major_minor()));
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Stylesheets, scripts, logos and the license.
    fn publish_assets(&self) -> Result<()> {
        let pages_dir = &self.config.pages_dir;
        for (rel_path, bytes) in site_assets() {
            copy_bytes(&bytes, &pages_dir.join(&rel_path))?;
        }

        let img_dir = pages_dir.join("img");
        for logo in [self.assets.program_logo_path(), self.assets.org_logo_path()]
            .into_iter()
            .flatten()
        {
            if let Some(name) = logo.file_name() {
                info!(logo = %logo.display(), "Copying logo");
                copy_file(&logo, &img_dir.join(name))?;
            }
        }

        let license = self.config.source_dir.join(LICENSE_FILE);
        if license.is_file() {
            copy_file(&license, &pages_dir.join(LICENSE_FILE))?;
        }
        Ok(())
    }
}

/// Wipe the output directory, refusing paths not named `*site`.

/// Version whose README becomes the site index: the snapshot when there is
/// one, else the highest release.
fn latest_version(versions: &[SiteVersion]) -> Result<&SiteVersion> {
    versions
        .iter()
        .find(|v| v.is_snapshot())
        .or_else(|| versions.iter().max_by(|a, b| a.version.cmp(&b.version)))
        .ok_or_else(|| Error::MissingData("no version to publish".to_owned()))
}

fn clean_pages_dir(pages_dir: &Path) -> Result<()> {
    let named_site = pages_dir
        .file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with("site"));
    if !named_site {
        return Err(Error::InvalidPath {
            path: pages_dir.display().to_string(),
            reason: "refusing to clean an output directory whose name does not end with 'site'"
                .to_owned(),
        });
    }
    info!(dir = %pages_dir.display(), "Cleaning output");
    if pages_dir.exists() {
        fs::remove_dir_all(pages_dir).map_err(|e| Error::io(pages_dir, e))?;
    }
    fs::create_dir_all(pages_dir).map_err(|e| Error::io(pages_dir, e))
}

fn copy_javadoc(javadoc_dir: &Path, version_dir: &Path) -> Result<()> {
    if !javadoc_dir.is_dir() {
        info!(dir = %javadoc_dir.display(), "No API docs to copy");
        return Ok(());
    }
    let target = version_dir.join(JAVADOC_DIR);
    if target.exists() {
        return Err(Error::TargetExists(target));
    }
    copy_dir(javadoc_dir, &target)
}

fn copy_bytes(bytes: &[u8], target: &Path) -> Result<()> {
    if target.exists() {
        return Err(Error::TargetExists(target.to_path_buf()));
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(target, bytes).map_err(|e| Error::io(target, e))
}

fn copy_file(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::copy(source, target).map_err(|e| Error::io(source, e))?;
    Ok(())
}

/// Replace `target` with a recursive copy of `source`.
fn copy_dir(source: &Path, target: &Path) -> Result<()> {
    if target.exists() {
        fs::remove_dir_all(target).map_err(|e| Error::io(target, e))?;
    }
    fs::create_dir_all(target).map_err(|e| Error::io(target, e))?;
    for entry in fs::read_dir(source).map_err(|e| Error::io(source, e))? {
        let entry = entry.map_err(|e| Error::io(source, e))?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            copy_dir(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| Error::io(&from, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(SiteBuilder: Send, Sync);

    #[test]
    fn test_latest_version_prefers_snapshot() {
        let releases = vec![
            SiteVersion::release(Version::new(0, 1, 3), "josman-0.1.3"),
            SiteVersion::release(Version::new(1, 0, 2), "josman-1.0.2"),
            SiteVersion::release(Version::new(0, 3, 0), "josman-0.3.0"),
        ];
        assert_eq!(latest_version(&releases).unwrap().version, Version::new(1, 0, 2));

        let mut with_snapshot = releases.clone();
        with_snapshot.push(SiteVersion::snapshot(Version::new(0, 4, 0)));
        assert!(latest_version(&with_snapshot).unwrap().is_snapshot());

        assert!(latest_version(&[]).is_err());
    }

    #[test]
    fn test_clean_pages_dir_requires_site_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("output");
        assert!(matches!(
            clean_pages_dir(&out),
            Err(Error::InvalidPath { .. })
        ));

        let site = dir.path().join("site");
        fs::create_dir_all(site.join("old")).unwrap();
        clean_pages_dir(&site).unwrap();
        assert!(site.is_dir());
        assert!(!site.join("old").exists());
    }

    #[test]
    fn test_copy_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("nested/f.txt"), "x").unwrap();
        let target = dir.path().join("b");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.txt"), "old").unwrap();

        copy_dir(&source, &target).unwrap();
        assert_eq!(fs::read_to_string(target.join("nested/f.txt")).unwrap(), "x");
        assert!(!target.join("stale.txt").exists());
    }
}
