//! Per-version navigation tree.
//!
//! ```text
//! ul.josman-tree
//!   li
//!     div.josman-sidebar-page-title > a        other pages
//!     ul.josman-tree
//!   li
//!     div.josman-sidebar-page-title.josman-sidebar-selected   current page
//!     ul.josman-tree > li > a                  its h3 headings
//! ```

use josman_renderer::HtmlNode;

use crate::context::SiblingSet;
use crate::error::Result;
use crate::path::{DOCS_FOLDER, htmlize_path, target_name};

const TREE_CLASS: &str = "josman-tree";

/// Build the sidebar of `current_rel_path`.
///
/// `content` is the rendered page, whose `h3` headings become in-page links
/// under the current entry.
pub fn build_sidebar(content: &HtmlNode, current_rel_path: &str, siblings: &SiblingSet) -> Result<HtmlNode> {
    let mut tree = HtmlNode::element("ul").with_attr("class", TREE_CLASS);

    for rel_path in siblings.ordered() {
        let mut title = HtmlNode::element("div").with_attr("class", "josman-sidebar-page-title");
        let mut page_links = HtmlNode::element("ul").with_attr("class", TREE_CLASS);
        let label = target_name(rel_path)?;

        if rel_path == current_rel_path {
            title.add_class("josman-sidebar-selected");
            title.set_text(&label);
            for (href, text) in heading_links(content) {
                page_links.children.push(
                    HtmlNode::element("li")
                        .with_child(HtmlNode::element("a").with_attr("href", &href).with_text(&text)),
                );
            }
        } else {
            let inside_docs = rel_path
                .strip_prefix(DOCS_FOLDER)
                .map_or(rel_path, |rest| rest.trim_start_matches('/'));
            let href = htmlize_path(inside_docs)?;
            title
                .children
                .push(HtmlNode::element("a").with_attr("href", &href).with_text(&label));
        }

        tree.children.push(
            HtmlNode::element("li")
                .with_child(title)
                .with_child(page_links),
        );
    }
    Ok(tree)
}

/// `(href, text)` of every `h3` of the page.
///
/// The href comes from the heading's first anchor, or its `id` when it has
/// no anchor. Headings with neither are skipped.
fn heading_links(content: &HtmlNode) -> Vec<(String, String)> {
    content
        .descendants("h3")
        .into_iter()
        .filter_map(|heading| {
            let href = heading
                .descendants("a")
                .first()
                .and_then(|anchor| anchor.attr("href"))
                .map(str::to_owned)
                .or_else(|| heading.attr("id").map(|id| format!("#{id}")))?;
            Some((href, heading.text_content().trim().to_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use josman_renderer::HtmlDocument;
    use pretty_assertions::assert_eq;

    use super::*;

    fn siblings(paths: &[&str]) -> SiblingSet {
        SiblingSet::new(paths.iter().map(|p| (*p).to_owned()).collect()).unwrap()
    }

    fn titles(tree: &HtmlNode) -> Vec<String> {
        tree.children
            .iter()
            .map(|li| li.children[0].text_content())
            .collect()
    }

    #[test]
    fn test_readme_first_changes_last() {
        let content = HtmlDocument::parse("<p>x</p>").unwrap();
        for paths in [
            ["docs/CHANGES.md", "docs/gettingStarted.md", "docs/README.md"],
            ["docs/README.md", "docs/CHANGES.md", "docs/gettingStarted.md"],
            ["docs/gettingStarted.md", "docs/README.md", "docs/CHANGES.md"],
        ] {
            let tree = build_sidebar(content.root(), "docs/README.md", &siblings(&paths)).unwrap();
            assert_eq!(titles(&tree), vec!["Usage", "Getting started", "Release notes"]);
        }
    }

    #[test]
    fn test_current_page_lists_headings() {
        let content = HtmlDocument::parse(
            r##"<h2 id="top"><a href="#top" name="top"></a>Top</h2>
<h3 id="maven"><a href="#maven" name="maven"></a>Maven</h3>
<h3 id="see-x"><a href="#see-x" name="see-x"></a>See <a href="y.md">x</a></h3>
<h3 id="plain">Plain heading</h3>"##,
        )
        .unwrap();
        let tree = build_sidebar(
            content.root(),
            "docs/README.md",
            &siblings(&["docs/README.md", "docs/faq.md"]),
        )
        .unwrap();

        assert_eq!(
            tree.outer_html(),
            concat!(
                r#"<ul class="josman-tree">"#,
                r#"<li><div class="josman-sidebar-page-title josman-sidebar-selected">Usage</div>"#,
                r##"<ul class="josman-tree"><li><a href="#maven">Maven</a></li><li><a href="#see-x">See x</a></li>"##,
                r##"<li><a href="#plain">Plain heading</a></li></ul></li>"##,
                r#"<li><div class="josman-sidebar-page-title"><a href="faq.html">Faq</a></div>"#,
                r#"<ul class="josman-tree"></ul></li>"#,
                "</ul>"
            )
        );
    }

    #[test]
    fn test_other_pages_have_no_headings() {
        let content = HtmlDocument::parse(r##"<h3 id="a">A</h3>"##).unwrap();
        let tree = build_sidebar(
            content.root(),
            "docs/faq.md",
            &siblings(&["docs/README.md", "docs/faq.md"]),
        )
        .unwrap();
        assert!(tree.children[0].children[1].children.is_empty());
        assert_eq!(tree.children[1].children[1].children.len(), 1);
    }
}
