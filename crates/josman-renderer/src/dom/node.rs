//! Tree node and document types.

use crate::HtmlError;

use super::COMMENT_TAG;
use super::parser::{parse_document, parse_fragment};
use super::serializer::{serialize_children, serialize_node};

/// An element with its attributes, text and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlNode {
    pub tag: String,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
    /// Text before the first child.
    pub text: String,
    /// Text after the closing tag.
    pub tail: String,
    pub children: Vec<HtmlNode>,
}

impl HtmlNode {
    /// Create an empty element.
    #[must_use]
    pub fn element(tag: &str) -> Self {
        Self {
            tag: tag.to_owned(),
            ..Self::default()
        }
    }

    /// Create a comment; `text` is what goes between `<!--` and `-->`.
    #[must_use]
    pub fn comment(text: &str) -> Self {
        Self {
            tag: COMMENT_TAG.to_owned(),
            text: text.to_owned(),
            ..Self::default()
        }
    }

    pub fn is_comment(&self) -> bool {
        self.tag == COMMENT_TAG
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style text setter.
    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.set_text(text);
        self
    }

    /// Builder-style child appender.
    #[must_use]
    pub fn with_child(mut self, child: HtmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            value.clone_into(&mut slot.1);
        } else {
            self.attrs.push((name.to_owned(), value.to_owned()));
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_owned(),
        };
        self.set_attr("class", &classes);
    }

    /// Hide the element with an inline `display:none` style.
    pub fn hide(&mut self) {
        let style = match self.attr("style") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{}; display:none", existing.trim().trim_end_matches(';'))
            }
            _ => "display:none".to_owned(),
        };
        self.set_attr("style", &style);
    }

    /// Replace all content with plain text.
    pub fn set_text(&mut self, text: &str) {
        self.children.clear();
        text.clone_into(&mut self.text);
    }

    /// Replace all content with parsed markup.
    pub fn set_inner_html(&mut self, html: &str) -> Result<(), HtmlError> {
        let fragment = parse_fragment(html)?;
        self.text = fragment.text;
        self.children = fragment.children;
        Ok(())
    }

    /// Append parsed markup after the existing content.
    pub fn append_html(&mut self, html: &str) -> Result<(), HtmlError> {
        let fragment = parse_fragment(html)?;
        self.append_text(&fragment.text);
        self.children.extend(fragment.children);
        Ok(())
    }

    /// Append text after the existing content.
    pub fn append_text(&mut self, text: &str) {
        match self.children.last_mut() {
            Some(last) => last.tail.push_str(text),
            None => self.text.push_str(text),
        }
    }

    /// Concatenated text of this element and its descendants, without tail.
    /// Comments contribute nothing.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            if !child.is_comment() {
                child.collect_text(out);
            }
            out.push_str(&child.tail);
        }
    }

    /// Inner markup of this element.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        serialize_children(self, &mut out);
        out
    }

    /// Markup of this element, excluding its tail.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        let detached = HtmlNode {
            tail: String::new(),
            ..self.clone()
        };
        serialize_node(&detached, &mut out);
        out
    }

    /// All descendants with the given tag, in document order.
    pub fn descendants(&self, tag: &str) -> Vec<&HtmlNode> {
        let mut found = Vec::new();
        for child in &self.children {
            child.collect_by_tag(tag, &mut found);
        }
        found
    }

    fn collect_by_tag<'a>(&'a self, tag: &str, found: &mut Vec<&'a HtmlNode>) {
        if self.tag.eq_ignore_ascii_case(tag) {
            found.push(self);
        }
        for child in &self.children {
            child.collect_by_tag(tag, found);
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&HtmlNode> {
        if self.attr("id") == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_by_id(id))
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut HtmlNode> {
        if self.attr("id") == Some(id) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_by_id_mut(id))
    }

    /// Visit every descendant (and self) with the given tag, in document order.
    pub fn for_each_tag_mut<F: FnMut(&mut HtmlNode)>(&mut self, tag: &str, visit: &mut F) {
        if self.tag.eq_ignore_ascii_case(tag) {
            visit(self);
        }
        for child in &mut self.children {
            child.for_each_tag_mut(tag, visit);
        }
    }

    /// Visit every descendant (and self) carrying the given class.
    pub fn for_each_class_mut<F: FnMut(&mut HtmlNode)>(&mut self, class: &str, visit: &mut F) {
        if self.has_class(class) {
            visit(self);
        }
        for child in &mut self.children {
            child.for_each_class_mut(class, visit);
        }
    }

    /// Remove every descendant carrying the given class.
    ///
    /// The tail text of a removed element is kept in place.
    /// Returns the number of removed elements.
    pub fn remove_by_class(&mut self, class: &str) -> usize {
        let mut removed = 0;
        let mut kept: Vec<HtmlNode> = Vec::with_capacity(self.children.len());
        for mut child in std::mem::take(&mut self.children) {
            if child.has_class(class) {
                removed += 1;
                match kept.last_mut() {
                    Some(previous) => previous.tail.push_str(&child.tail),
                    None => self.text.push_str(&child.tail),
                }
            } else {
                removed += child.remove_by_class(class);
                kept.push(child);
            }
        }
        self.children = kept;
        removed
    }
}

/// A parsed page: optional doctype plus a synthetic root holding the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument {
    doctype: Option<String>,
    root: HtmlNode,
}

impl HtmlDocument {
    /// Parse a full page or a fragment.
    pub fn parse(html: &str) -> Result<Self, HtmlError> {
        let (doctype, root) = parse_document(html)?;
        Ok(Self { doctype, root })
    }

    pub fn root(&self) -> &HtmlNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut HtmlNode {
        &mut self.root
    }

    /// Take the synthetic root, dropping the doctype.
    #[must_use]
    pub fn into_root(self) -> HtmlNode {
        self.root
    }

    pub fn find_by_id(&self, id: &str) -> Option<&HtmlNode> {
        self.root.find_by_id(id)
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut HtmlNode> {
        self.root.find_by_id_mut(id)
    }

    /// First element with the given tag.
    pub fn find_first_mut(&mut self, tag: &str) -> Option<&mut HtmlNode> {
        fn walk<'a>(node: &'a mut HtmlNode, tag: &str) -> Option<&'a mut HtmlNode> {
            for child in &mut node.children {
                if child.tag.eq_ignore_ascii_case(tag) {
                    return Some(child);
                }
                if let Some(found) = walk(child, tag) {
                    return Some(found);
                }
            }
            None
        }
        walk(&mut self.root, tag)
    }

    pub fn descendants(&self, tag: &str) -> Vec<&HtmlNode> {
        self.root.descendants(tag)
    }

    pub fn for_each_tag_mut<F: FnMut(&mut HtmlNode)>(&mut self, tag: &str, mut visit: F) {
        for child in &mut self.root.children {
            child.for_each_tag_mut(tag, &mut visit);
        }
    }

    pub fn for_each_class_mut<F: FnMut(&mut HtmlNode)>(&mut self, class: &str, mut visit: F) {
        for child in &mut self.root.children {
            child.for_each_class_mut(class, &mut visit);
        }
    }

    pub fn remove_by_class(&mut self, class: &str) -> usize {
        self.root.remove_by_class(class)
    }

    pub fn text_content(&self) -> String {
        self.root.text_content()
    }

    /// Serialize back to markup, doctype first.
    pub fn to_html(&self) -> String {
        let mut out = String::with_capacity(4096);
        if let Some(doctype) = &self.doctype {
            out.push_str(doctype);
            out.push('\n');
        }
        serialize_children(&self.root, &mut out);
        out
    }
}
