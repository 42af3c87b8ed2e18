//! The page template and the static files published next to it.

use std::borrow::Cow;
use std::path::PathBuf;

use rust_embed::RustEmbed;

use crate::error::{Error, Result};
use crate::path::is_root_path;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct SiteAssets;

const SKELETON_FILE: &str = "skeleton.html";

/// Slot receiving the rendered Markdown.
pub const CONTENT_ID: &str = "josman-internal-content";
/// Slot receiving the sidebar tree.
pub const SIDEBAR_ID: &str = "josman-internal-sidebar";
/// Sidebar wrapper, hidden on root pages.
pub const SIDEBAR_BLOCK_ID: &str = "josman-sidebar-managed-block";
/// Container of the version tabs.
pub const TABS_ID: &str = "josman-usage";
/// Class of version tabs; the template ships sample ones.
pub const TAB_CLASS: &str = "josman-version-tab-header";
pub const SELECTED_CLASS: &str = "josman-tag-selected";
/// Elements with this class only exist to preview the template.
pub const STRIP_CLASS: &str = "josman-to-strip";

/// HTML template every page is injected into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    html: String,
}

impl Skeleton {
    /// The template shipped with the crate.
    pub fn embedded() -> Result<Self> {
        let file = SiteAssets::get(SKELETON_FILE)
            .ok_or_else(|| Error::MissingFile(PathBuf::from(SKELETON_FILE)))?;
        let html = String::from_utf8(file.data.into_owned())
            .map_err(|_| Error::InvalidEncoding {
                rel_path: SKELETON_FILE.to_owned(),
            })?;
        Ok(Self { html })
    }

    pub fn from_html(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Template markup for `rel_path`.
    ///
    /// Versioned pages live one directory down, so their script, image and
    /// stylesheet references get a `../` prefix.
    pub fn for_page(&self, rel_path: &str) -> Cow<'_, str> {
        if is_root_path(rel_path) {
            Cow::Borrowed(&self.html)
        } else {
            Cow::Owned(
                self.html
                    .replace("src=\"js/", "src=\"../js/")
                    .replace("src=\"img/", "src=\"../img/")
                    .replace("href=\"css/", "href=\"../css/"),
            )
        }
    }
}

/// Static files to publish at the site root, as `(relative path, bytes)`.
pub fn site_assets() -> impl Iterator<Item = (String, Cow<'static, [u8]>)> {
    SiteAssets::iter()
        .filter(|path| path != SKELETON_FILE)
        .filter_map(|path| {
            let file = SiteAssets::get(&path)?;
            Some((path.into_owned(), file.data))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_skeleton_has_slots() {
        let skeleton = Skeleton::embedded().unwrap();
        let html = skeleton.for_page("README.md");
        for id in [CONTENT_ID, SIDEBAR_ID, SIDEBAR_BLOCK_ID, TABS_ID, "josman-repo-link", "josman-home"] {
            assert!(html.contains(&format!("id=\"{id}\"")), "missing {id}");
        }
    }

    #[test]
    fn test_versioned_pages_get_relative_assets() {
        let skeleton = Skeleton::from_html(
            r#"<link href="css/josman.css" /><script src="js/josman.js"></script><img src="img/a.png" />"#,
        );
        assert_eq!(
            skeleton.for_page("docs/README.md"),
            r#"<link href="../css/josman.css" /><script src="../js/josman.js"></script><img src="../img/a.png" />"#
        );
        assert!(matches!(skeleton.for_page("README.md"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_site_assets_exclude_skeleton() {
        let paths: Vec<String> = site_assets().map(|(path, _)| path).collect();
        assert!(paths.contains(&"css/josman.css".to_owned()));
        assert!(paths.contains(&"js/josman.js".to_owned()));
        assert!(!paths.contains(&SKELETON_FILE.to_owned()));
    }
}
