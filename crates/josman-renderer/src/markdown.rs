//! Markdown to HTML conversion.

use std::collections::HashMap;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};

/// Converts Markdown text to an HTML fragment.
///
/// Implementations must render `###` headings as `<h3>` elements whose first
/// anchor has an `href` pointing at the heading, since page navigation is
/// built from `h3 a` pairs.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// [`MarkdownRenderer`] backed by `pulldown-cmark`.
///
/// Soft line breaks are rendered as hard breaks, and every heading gets a
/// slug id plus an empty self-referencing anchor ahead of its content, so
/// links inside the heading never nest in it.
#[derive(Debug, Clone)]
pub struct PulldownRenderer {
    options: Options,
    hard_wraps: bool,
}

impl PulldownRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_FOOTNOTES,
            hard_wraps: true,
        }
    }

    /// Keep soft line breaks as plain newlines.
    #[must_use]
    pub fn without_hard_wraps(mut self) -> Self {
        self.hard_wraps = false;
        self
    }
}

impl Default for PulldownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer for PulldownRenderer {
    fn render(&self, markdown: &str) -> String {
        let mut events: Vec<Event<'_>> = Vec::new();
        let mut heading: Option<(HeadingLevel, Vec<Event<'_>>)> = None;
        let mut slugs = SlugCounter::default();

        for event in Parser::new_ext(markdown, self.options) {
            let event = match event {
                Event::SoftBreak if self.hard_wraps => Event::HardBreak,
                other => other,
            };
            match event {
                Event::Start(Tag::Heading { level, .. }) => heading = Some((level, Vec::new())),
                Event::End(TagEnd::Heading(_)) => {
                    if let Some((level, inner)) = heading.take() {
                        let slug = slugs.next(&plain_text(&inner));
                        events.push(Event::Html(
                            format!(r##"<{level} id="{slug}"><a href="#{slug}" name="{slug}"></a>"##)
                                .into(),
                        ));
                        events.extend(inner);
                        events.push(Event::Html(format!("</{level}>\n").into()));
                    }
                }
                other => match heading.as_mut() {
                    Some((_, inner)) => inner.push(other),
                    None => events.push(other),
                },
            }
        }

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }
}

fn plain_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Hands out unique slugs within one document.
#[derive(Default)]
struct SlugCounter {
    seen: HashMap<String, usize>,
}

impl SlugCounter {
    fn next(&mut self, text: &str) -> String {
        let base = slugify(text);
        let count = self.seen.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            format!("{base}-{}", *count - 1)
        }
    }
}

/// Turn heading text into an anchor name.
///
/// Alphanumerics are lowercased, runs of whitespace, `-` and `_` collapse
/// to a single `-`, everything else is dropped.
///
/// ```
/// assert_eq!(josman_renderer::slugify("Getting Started!"), "getting-started");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "section".to_owned()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    static_assertions::assert_impl_all!(PulldownRenderer: MarkdownRenderer, Send, Sync);

    fn render(markdown: &str) -> String {
        PulldownRenderer::new().render(markdown)
    }

    #[test]
    fn test_heading_starts_with_self_anchor() {
        assert_eq!(
            render("### Maven setup"),
            "<h3 id=\"maven-setup\"><a href=\"#maven-setup\" name=\"maven-setup\"></a>Maven setup</h3>\n"
        );
    }

    #[test]
    fn test_heading_keeps_inline_markup() {
        let html = render("## Use `josman` *now*");
        assert!(html.contains(
            r##"<a href="#use-josman-now" name="use-josman-now"></a>Use <code>josman</code> <em>now</em></h2>"##
        ));
    }

    #[test]
    fn test_heading_with_link_does_not_nest_anchors() {
        assert_eq!(
            render("### See [x](y.md)"),
            "<h3 id=\"see-x\"><a href=\"#see-x\" name=\"see-x\"></a>See <a href=\"y.md\">x</a></h3>\n"
        );
    }

    #[test]
    fn test_duplicate_headings_get_unique_slugs() {
        let html = render("### Intro\n\n### Intro\n");
        assert!(html.contains(r#"id="intro""#));
        assert!(html.contains(r#"id="intro-1""#));
    }

    #[test]
    fn test_soft_breaks_become_hard_breaks() {
        assert_eq!(render("a\nb"), "<p>a<br />\nb</p>\n");
    }

    #[test]
    fn test_soft_breaks_kept_without_hard_wraps() {
        assert_eq!(
            PulldownRenderer::new().without_hard_wraps().render("a\nb"),
            "<p>a\nb</p>\n"
        );
    }

    #[test]
    fn test_links_and_images_pass_through() {
        let html = render("[x](docs/a.md) ![i](docs/img/p.png)");
        assert!(html.contains(r#"<a href="docs/a.md">x</a>"#));
        assert!(html.contains(r#"<img src="docs/img/p.png" alt="i" />"#));
    }

    #[test]
    fn test_table() {
        let html = render("| a |\n|---|\n| 1 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello,  World"), "hello-world");
        assert_eq!(slugify("  -- "), "section");
        assert_eq!(slugify("Caffè_latte"), "caffè-latte");
    }
}
