//! Rewriting of anchors and images in a rendered page fragment.

use josman_renderer::HtmlNode;
use tracing::warn;

use crate::context::ProjectInfo;
use crate::error::{Error, Result};
use crate::path::{DOCS_FOLDER, UriParts, htmlize_path, prepended_path};
use crate::version::Version;

/// Rewrites links of one page so they resolve inside the published site.
#[derive(Debug, Clone)]
pub struct LinkRewriter<'a> {
    version: &'a Version,
    prepended: &'static str,
    rel_path: &'a str,
    project: &'a ProjectInfo,
    strict: bool,
}

impl<'a> LinkRewriter<'a> {
    pub fn new(version: &'a Version, rel_path: &'a str, project: &'a ProjectInfo, strict: bool) -> Self {
        Self {
            version,
            prepended: prepended_path(rel_path),
            rel_path,
            project,
            strict,
        }
    }

    /// Rewrite every `a[href]` and `img[src]` below `root`.
    ///
    /// Returns the warnings for malformed links left untouched. In strict
    /// mode the first malformed link is an error instead.
    pub fn rewrite(&self, root: &mut HtmlNode) -> Result<Vec<String>> {
        let mut warnings = Vec::new();
        let mut failure = None;

        root.for_each_tag_mut("a", &mut |anchor| {
            if failure.is_some() {
                return;
            }
            let Some(href) = anchor.attr("href").map(str::to_owned) else {
                return;
            };
            match self.rewrite_href(&href) {
                Ok(Some(new_href)) => anchor.set_attr("href", &new_href),
                Ok(None) => {}
                Err(err) if self.strict => failure = Some(err),
                Err(err) => {
                    warn!(rel_path = self.rel_path, href = %href, "Leaving malformed link as is");
                    warnings.push(err.to_string());
                }
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }

        root.for_each_tag_mut("img", &mut |image| {
            if let Some(src) = image.attr("src").and_then(|src| self.rewrite_img_src(src)) {
                image.set_attr("src", &src);
            }
        });
        Ok(warnings)
    }

    /// New value for an anchor's `href`, or `None` to keep it.
    ///
    /// Rules, first match wins:
    /// 1. `<prepended>src...` points at the sources of the release tag.
    /// 2. A `.md` target is htmlized; the result still goes through 4 and 5.
    /// 3. `<prepended>../../wiki|issues|milestones` point at GitHub.
    /// 4. `docs` becomes the version index.
    /// 5. `docs/...` moves into the version directory.
    pub fn rewrite_href(&self, href: &str) -> Result<Option<String>> {
        UriParts::parse(href).map_err(|_| self.malformed(href))?;

        let src_prefix = format!("{}src", self.prepended);
        if let Some(rest) = href.strip_prefix(&src_prefix) {
            return Ok(Some(format!(
                "{}/src{rest}",
                self.project.repo_release(self.version)
            )));
        }

        if targets_markdown(href) {
            let htmlized = htmlize_path(href)?;
            return Ok(Some(self.rewrite_docs(&htmlized).unwrap_or(htmlized)));
        }

        let github = [
            ("../../wiki", self.project.repo_wiki()),
            ("../../issues", self.project.repo_issues()),
            ("../../milestones", self.project.repo_milestones()),
        ];
        for (relative, absolute) in github {
            if href.strip_prefix(self.prepended) == Some(relative) {
                return Ok(Some(absolute));
            }
        }

        Ok(self.rewrite_docs(href))
    }

    /// Rules 4 and 5.
    fn rewrite_docs(&self, href: &str) -> Option<String> {
        let major_minor = self.version.major_minor();
        if href.trim_end_matches('/') == DOCS_FOLDER {
            return Some(format!("{major_minor}/index.html"));
        }
        href.strip_prefix("docs/")
            .map(|rest| format!("{major_minor}/{rest}"))
    }

    /// New value for an image's `src`, or `None` to keep it.
    pub fn rewrite_img_src(&self, src: &str) -> Option<String> {
        src.strip_prefix("docs/")
            .map(|rest| format!("{}/{rest}", self.version.major_minor()))
    }

    fn malformed(&self, href: &str) -> Error {
        Error::MalformedLink {
            href: href.to_owned(),
            rel_path: self.rel_path.to_owned(),
        }
    }
}

/// Whether the path part of `href` (query and fragment ignored) ends in `.md`.
fn targets_markdown(href: &str) -> bool {
    let path_end = href.find(['?', '#']).unwrap_or(href.len());
    href[..path_end].ends_with(".md")
}
