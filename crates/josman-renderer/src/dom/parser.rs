//! HTML to tree parser built on quick-xml.
//!
//! quick-xml is an XML tokenizer, so the input is made XML-friendly first:
//! comment and raw-text bodies (`script`, `style`, `textarea`) are set aside
//! verbatim, named entities become Unicode and bare ampersands are escaped.
//! Tree building then applies the HTML rules XML lacks: void elements close
//! implicitly, `p`, `li`, `dt` and `dd` are ended by the tags that end them in
//! a browser, and mismatched end tags are tolerated.

use std::io::BufRead;
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use super::entities::{convert_html_entities, decode_entity, escape_bare_ampersands};
use super::node::HtmlNode;
use super::{RAW_TEXT_ELEMENTS, is_void_element};
use crate::HtmlError;

static DOCTYPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(<!DOCTYPE[^>]*>)").expect("invalid doctype regex"));

const ROOT_TAG: &str = "josman-root";

/// Delimits the index of a set-aside body. Private-use, so never in real text.
const RAW_MARK: char = '\u{E000}';

/// Tags whose start closes an open `p`.
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hgroup", "hr", "li", "main", "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// Parse a page, returning its doctype (if any) and a synthetic root.
pub(crate) fn parse_document(html: &str) -> Result<(Option<String>, HtmlNode), HtmlError> {
    let (doctype, body) = match DOCTYPE_PATTERN.captures(html) {
        Some(caps) => {
            let whole = caps.get(0).map_or(0, |m| m.end());
            (Some(caps[1].to_owned()), html[whole..].trim_start())
        }
        None => (None, html),
    };
    Ok((doctype, parse_fragment(body)?))
}

/// Parse markup into the children of a synthetic root node.
pub(crate) fn parse_fragment(html: &str) -> Result<HtmlNode, HtmlError> {
    let (html, raw_bodies) = set_aside_raw_bodies(html);
    let html = escape_bare_ampersands(&convert_html_entities(&html));
    let wrapped = format!("<{ROOT_TAG}>{html}</{ROOT_TAG}>");

    let mut reader = Reader::from_str(&wrapped);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut buf = Vec::new();
    // Skip to the wrapper start.
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) | Event::Eof => break,
            _ => buf.clear(),
        }
    }
    let mut root = build_tree(&mut reader, &raw_bodies)?;
    root.tag = ROOT_TAG.to_owned();
    Ok(root)
}

/// Build the tree with an explicit stack of open elements. The root sits at
/// the bottom and is never popped by the markup.
fn build_tree<R: BufRead>(reader: &mut Reader<R>, raw_bodies: &[String]) -> Result<HtmlNode, HtmlError> {
    let mut buf = Vec::new();
    let mut open = vec![HtmlNode::default()];

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let node = start_node(reader, &e);
                close_implied(&mut open, &node.tag);
                if is_void_element(&node.tag) {
                    attach(&mut open, node);
                } else {
                    open.push(node);
                }
            }
            Event::Empty(e) => {
                let node = start_node(reader, &e);
                close_implied(&mut open, &node.tag);
                attach(&mut open, node);
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                current(&mut open).append_text(&restore_raw_bodies(&text, raw_bodies));
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?;
                current(&mut open).append_text(&decode_entity(&entity));
            }
            Event::CData(e) => {
                current(&mut open).append_text(&String::from_utf8_lossy(&e));
            }
            Event::Comment(e) => {
                let text = reader.decoder().decode(&e)?;
                attach(&mut open, HtmlNode::comment(&restore_raw_bodies(&text, raw_bodies)));
            }
            Event::End(e) => {
                let end_tag = decode_tag(reader, e.name().as_ref());
                if end_tag == ROOT_TAG {
                    break;
                }
                // Close up to the nearest matching open element. Stray end
                // tags such as `</br>` match nothing and are dropped.
                if let Some(depth) = open
                    .iter()
                    .skip(1)
                    .rposition(|node| node.tag.eq_ignore_ascii_case(&end_tag))
                {
                    while open.len() > depth + 1 {
                        close_current(&mut open);
                    }
                }
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }

    while open.len() > 1 {
        close_current(&mut open);
    }
    Ok(open.pop().unwrap_or_default())
}

fn start_node<R: BufRead>(reader: &Reader<R>, e: &BytesStart) -> HtmlNode {
    HtmlNode {
        tag: decode_tag(reader, e.name().as_ref()),
        attrs: decode_attrs(reader, e),
        ..HtmlNode::default()
    }
}

fn current(open: &mut [HtmlNode]) -> &mut HtmlNode {
    let last = open.len() - 1;
    &mut open[last]
}

fn attach(open: &mut [HtmlNode], node: HtmlNode) {
    current(open).children.push(node);
}

fn close_current(open: &mut Vec<HtmlNode>) {
    if open.len() > 1
        && let Some(node) = open.pop()
    {
        attach(open, node);
    }
}

/// Close the open elements that `tag` ends without an end tag of their own.
fn close_implied(open: &mut Vec<HtmlNode>, tag: &str) {
    let tag = tag.to_ascii_lowercase();
    while open.len() > 1 {
        let top = current(open).tag.to_ascii_lowercase();
        let ended = match top.as_str() {
            "p" => CLOSES_P.contains(&tag.as_str()),
            "li" => tag == "li",
            "dt" | "dd" => tag == "dt" || tag == "dd",
            _ => false,
        };
        if !ended {
            break;
        }
        close_current(open);
    }
}

/// Replace comment and raw-text element bodies with numbered markers so the
/// tokenizer never sees them. Returns the marked markup and the bodies.
fn set_aside_raw_bodies(html: &str) -> (String, Vec<String>) {
    // ASCII lowercasing keeps byte offsets, so indexes into `lower` are valid
    // for `html`.
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut bodies = Vec::new();
    let mut pos = 0;

    while let Some(found) = lower[pos..].find('<') {
        let start = pos + found;
        let rest = &lower[start..];
        let body = if rest.starts_with("<!--") {
            let body_start = start + 4;
            lower[body_start..]
                .find("-->")
                .map(|len| (body_start, body_start + len))
        } else {
            raw_text_start(rest).map(|(tag, open_len)| {
                let body_start = start + open_len;
                let close = format!("</{tag}");
                let body_end = lower[body_start..]
                    .find(&close)
                    .map_or(html.len(), |len| body_start + len);
                (body_start, body_end)
            })
        };

        match body {
            Some((body_start, body_end)) => {
                out.push_str(&html[pos..body_start]);
                if body_end > body_start {
                    out.push(RAW_MARK);
                    out.push_str(&bodies.len().to_string());
                    out.push(RAW_MARK);
                    bodies.push(html[body_start..body_end].to_owned());
                }
                pos = body_end;
            }
            None => {
                out.push_str(&html[pos..=start]);
                pos = start + 1;
            }
        }
    }
    out.push_str(&html[pos..]);
    (out, bodies)
}

/// If `rest` opens a raw-text element, its tag and the length of the start
/// tag. Self-closed start tags have no body to set aside.
fn raw_text_start(rest: &str) -> Option<(&'static str, usize)> {
    let name = rest.strip_prefix('<')?;
    let tag = RAW_TEXT_ELEMENTS.iter().find(|tag| {
        name.starts_with(**tag)
            && name[tag.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_whitespace() || c == '>' || c == '/')
    })?;
    let open_len = rest.find('>')? + 1;
    if rest[..open_len].ends_with("/>") {
        return None;
    }
    Some((*tag, open_len))
}

fn restore_raw_bodies(text: &str, bodies: &[String]) -> String {
    if !text.contains(RAW_MARK) {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(RAW_MARK) {
        out.push_str(&rest[..start]);
        let after = &rest[start + RAW_MARK.len_utf8()..];
        let body = after.find(RAW_MARK).and_then(|end| {
            let index: usize = after[..end].parse().ok()?;
            Some((bodies.get(index)?, end))
        });
        match body {
            Some((body, end)) => {
                out.push_str(body);
                rest = &after[end + RAW_MARK.len_utf8()..];
            }
            None => {
                out.push(RAW_MARK);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_tag<R: BufRead>(reader: &Reader<R>, name: &[u8]) -> String {
    reader.decoder().decode(name).map_or_else(
        |_| String::from_utf8_lossy(name).into_owned(),
        std::borrow::Cow::into_owned,
    )
}

fn decode_attrs<R: BufRead>(reader: &Reader<R>, e: &BytesStart) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    for attr in e.html_attributes().flatten() {
        let key = decode_tag(reader, attr.key.as_ref());
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            std::borrow::Cow::into_owned,
        );
        attrs.push((key, value));
    }
    attrs
}
