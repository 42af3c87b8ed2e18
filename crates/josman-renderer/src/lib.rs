//! Markdown rendering and HTML tree manipulation.
//!
//! Two independent pieces live here:
//! - [`MarkdownRenderer`], the pluggable Markdown-to-HTML converter, with the
//!   [`PulldownRenderer`] implementation backed by `pulldown-cmark`.
//! - [`dom`], a small HTML tree with just enough querying and mutation to
//!   fill a page skeleton and rewrite links.
//!
//! # Example
//!
//! ```
//! use josman_renderer::{HtmlDocument, MarkdownRenderer, PulldownRenderer};
//!
//! let html = PulldownRenderer::new().render("### Setup\n\nSee [docs](docs/a.md)");
//! let mut doc = HtmlDocument::parse(&html).unwrap();
//! doc.for_each_tag_mut("a", |a| {
//!     if a.attr("href") == Some("docs/a.md") {
//!         a.set_attr("href", "1.4/a.html");
//!     }
//! });
//! assert!(doc.to_html().contains(r#"href="1.4/a.html""#));
//! ```

pub mod dom;
mod error;
mod markdown;

pub use dom::{HtmlDocument, HtmlNode};
pub use error::HtmlError;
pub use markdown::{MarkdownRenderer, PulldownRenderer, slugify};
