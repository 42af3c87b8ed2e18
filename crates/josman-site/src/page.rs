//! Markdown page to finished HTML page.
//!
//! Provides [`PageRenderer`], which runs one page through macro expansion,
//! Markdown rendering, link rewriting, skeleton injection and the sidebar.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use josman_renderer::{HtmlDocument, HtmlNode, MarkdownRenderer};
use tracing::{info, warn};

use crate::context::{RenderContext, VersionTabs};
use crate::error::{Error, Result};
use crate::evaluator::EvaluationContext;
use crate::expr::{ExpressionEngine, substitute_vars};
use crate::links::LinkRewriter;
use crate::path::{is_root_path, prepended_path, target_file};
use crate::sidebar::build_sidebar;
use crate::skeleton::{
    CONTENT_ID, SELECTED_CLASS, SIDEBAR_BLOCK_ID, SIDEBAR_ID, STRIP_CLASS, Skeleton, TAB_CLASS,
    TABS_ID,
};
use crate::source::AssetLocator;

/// Markdown used in place of a blank page when errors are ignored.
pub const BLANK_PAGE_PLACEHOLDER: &str = "TODO CREATE FILE";

/// Result of rendering a page.
#[derive(Clone, Debug)]
pub struct PageRenderResult {
    /// Complete HTML page.
    pub html: String,
    /// Problems that were degraded instead of failing the page.
    pub warnings: Vec<String>,
}

/// Configuration for [`PageRenderer`].
#[derive(Clone, Debug, Default)]
pub struct PageRendererConfig {
    /// Degrade missing data and evaluation failures to warnings.
    pub ignore_errors: bool,
    /// Warn when a finished page still mentions "todo" (release builds).
    pub warn_on_todo: bool,
}

/// Renders the pages of a build.
///
/// Holds only immutable state, so one renderer serves every version and
/// thread.
pub struct PageRenderer {
    markdown: Arc<dyn MarkdownRenderer>,
    evaluation: EvaluationContext,
    assets: Arc<dyn AssetLocator>,
    skeleton: Skeleton,
    tabs: VersionTabs,
    config: PageRendererConfig,
}

impl PageRenderer {
    #[must_use]
    pub fn new(
        markdown: Arc<dyn MarkdownRenderer>,
        evaluation: EvaluationContext,
        assets: Arc<dyn AssetLocator>,
        skeleton: Skeleton,
        tabs: VersionTabs,
        config: PageRendererConfig,
    ) -> Self {
        Self {
            markdown,
            evaluation,
            assets,
            skeleton,
            tabs,
            config,
        }
    }

    /// Render Markdown bytes into a complete page.
    pub fn render(&self, content: &[u8], ctx: &RenderContext<'_>) -> Result<PageRenderResult> {
        let rel_path = ctx.rel_path;
        let mut warnings = Vec::new();

        let source = std::str::from_utf8(content).map_err(|_| Error::InvalidEncoding {
            rel_path: rel_path.to_owned(),
        })?;
        let source = if source.trim().is_empty() {
            let err = Error::MeaninglessContent {
                rel_path: rel_path.to_owned(),
            };
            if !self.config.ignore_errors {
                return Err(err);
            }
            warn!(rel_path, "Blank page, using placeholder");
            warnings.push(err.to_string());
            BLANK_PAGE_PLACEHOLDER
        } else {
            source
        };

        let markdown = self.expand_macros(source, ctx, &mut warnings)?;
        let fragment_html = self.markdown.render(&markdown);

        let mut fragment = HtmlDocument::parse(&fragment_html)?;
        let link_warnings = LinkRewriter::new(ctx.version, rel_path, ctx.project, !self.config.ignore_errors)
            .rewrite(fragment.root_mut())?;
        warnings.extend(link_warnings);

        let sidebar = if is_root_path(rel_path) {
            None
        } else {
            Some(build_sidebar(fragment.root(), rel_path, ctx.siblings)?)
        };

        let mut page = HtmlDocument::parse(&self.skeleton.for_page(rel_path))?;
        let content_slot = page
            .find_by_id_mut(CONTENT_ID)
            .ok_or_else(|| Error::MissingData(format!("page skeleton has no #{CONTENT_ID}")))?;
        let fragment = fragment.into_root();
        content_slot.text = fragment.text;
        content_slot.children = fragment.children;

        self.fill_header(&mut page, ctx);
        self.fill_sidebar(&mut page, sidebar);
        page.remove_by_class(STRIP_CLASS);
        self.add_version_tabs(&mut page, ctx);

        let html = page.to_html();
        if self.config.warn_on_todo && html.to_lowercase().contains("todo") {
            warn!(rel_path, "Found 'todo' in rendered page");
        }
        Ok(PageRenderResult { html, warnings })
    }

    /// Render into the page's target file under `pages_root`.
    ///
    /// The target must not exist yet; parent directories are created.
    pub fn render_to_file(
        &self,
        content: &[u8],
        ctx: &RenderContext<'_>,
        pages_root: &Path,
    ) -> Result<(PathBuf, PageRenderResult)> {
        let target = target_file(pages_root, ctx.rel_path, ctx.version)?;
        if target.exists() {
            return Err(Error::TargetExists(target));
        }
        let result = self.render(content, ctx)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(&target, &result.html).map_err(|e| Error::io(&target, e))?;
        info!(target = %target.display(), "Wrote page");
        Ok((target, result))
    }

    /// Legacy `#{}`, brand fixup, `${}`, then `$eval{}` / `$evalNow{}`.
    fn expand_macros(
        &self,
        source: &str,
        ctx: &RenderContext<'_>,
        warnings: &mut Vec<String>,
    ) -> Result<String> {
        let legacy = substitute_vars(source, '#', &ctx.project.legacy_properties(ctx.version));
        let branded = legacy.replace("jedoc", "josman");
        let with_props = substitute_vars(&branded, '$', &ctx.project.properties(ctx.version));

        let engine = ExpressionEngine::new(ctx.results, &self.evaluation, self.config.ignore_errors);
        let expansion = engine.expand(&with_props, ctx.rel_path)?;
        warnings.extend(expansion.degraded.iter().map(ToString::to_string));
        Ok(expansion.text)
    }

    fn fill_header(&self, page: &mut HtmlDocument, ctx: &RenderContext<'_>) {
        let project = ctx.project;
        let prepended = prepended_path(ctx.rel_path);
        let index = format!("{prepended}index.html");

        if let Some(title) = page.find_first_mut("title") {
            title.set_text(project.display_name());
        }
        if let Some(repo_link) = page.find_by_id_mut("josman-repo-link") {
            repo_link.set_text(project.display_name());
            repo_link.set_attr("href", &index);
        }

        let program_logo = self.assets.program_logo_path();
        set_logo(page, "josman-program", program_logo.as_deref(), prepended, &index);
        let org_logo = self.assets.org_logo_path();
        let org_url = format!("https://github.com/{}", project.organization);
        set_logo(page, "josman-org", org_logo.as_deref(), prepended, &org_url);

        for (id, href) in [
            ("josman-wiki", project.repo_wiki()),
            ("josman-issues", project.repo_issues()),
            ("josman-project", project.repo_url()),
        ] {
            if let Some(link) = page.find_by_id_mut(id) {
                link.set_attr("href", &href);
            }
        }

        if let Some(home) = page.find_by_id_mut("josman-home") {
            home.set_attr("href", &index);
            if is_root_path(ctx.rel_path) {
                home.add_class(SELECTED_CLASS);
            }
        }
        page.remove_by_class(TAB_CLASS);
    }

    fn fill_sidebar(&self, page: &mut HtmlDocument, sidebar: Option<HtmlNode>) {
        match sidebar {
            Some(tree) => {
                if let Some(slot) = page.find_by_id_mut(SIDEBAR_ID) {
                    slot.text.clear();
                    slot.children = vec![tree];
                }
            }
            None => {
                if let Some(slot) = page.find_by_id_mut(SIDEBAR_ID) {
                    slot.set_text("");
                }
                if let Some(block) = page.find_by_id_mut(SIDEBAR_BLOCK_ID) {
                    block.hide();
                }
            }
        }
    }

    /// One tab per known version; the page's own version is selected on
    /// versioned pages.
    fn add_version_tabs(&self, page: &mut HtmlDocument, ctx: &RenderContext<'_>) {
        let Some(tabs) = page.find_by_id_mut(TABS_ID) else {
            return;
        };
        let prepended = prepended_path(ctx.rel_path);
        let root_page = is_root_path(ctx.rel_path);

        for version in self.tabs.versions() {
            let major_minor = version.major_minor();
            let mut tab = HtmlNode::element("a")
                .with_attr("class", TAB_CLASS)
                .with_attr("href", &format!("{prepended}{major_minor}/index.html"))
                .with_text(&major_minor);
            if !root_page && version.same_release_line(ctx.version) {
                tab.add_class(SELECTED_CLASS);
            }
            tabs.children.push(tab);
        }
    }
}

/// Point a logo at its published image, or hide it when there is none.
fn set_logo(page: &mut HtmlDocument, id_prefix: &str, logo: Option<&Path>, prepended: &str, link_href: &str) {
    let link_id = format!("{id_prefix}-logo-link");
    let file_name = logo
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned());

    match file_name {
        Some(file_name) => {
            if let Some(image) = page.find_by_id_mut(&format!("{id_prefix}-logo")) {
                image.set_attr("src", &format!("{prepended}img/{file_name}"));
            }
            if let Some(link) = page.find_by_id_mut(&link_id) {
                link.set_attr("href", link_href);
            }
        }
        None => {
            if let Some(link) = page.find_by_id_mut(&link_id) {
                link.hide();
            }
        }
    }
}
