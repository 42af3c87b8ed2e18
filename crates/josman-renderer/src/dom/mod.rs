//! Minimal HTML tree: parse, query, mutate, serialize.
//!
//! Text is stored the ElementTree way: `text` is the content before the
//! first child, `tail` is the content following the element's closing tag.

mod entities;
mod node;
mod parser;
mod serializer;

pub use node::{HtmlDocument, HtmlNode};
pub(crate) use parser::parse_fragment;

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is kept and written back verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

/// Tag of comment nodes. Not a valid element name, so no query matches it.
const COMMENT_TAG: &str = "!--";

/// Attributes written without a value when their value is empty.
const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen", "async", "autofocus", "autoplay", "checked", "controls", "default", "defer",
    "disabled", "formnovalidate", "hidden", "inert", "ismap", "itemscope", "loop", "multiple",
    "muted", "nomodule", "novalidate", "open", "playsinline", "readonly", "required", "reversed",
    "selected",
];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub(crate) fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|raw| raw.eq_ignore_ascii_case(tag))
}

pub(crate) fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES.iter().any(|b| b.eq_ignore_ascii_case(name))
}
