//! Tree to HTML serializer.

use super::node::HtmlNode;
use super::{is_boolean_attribute, is_raw_text_element, is_void_element};

/// Serialize the content of `node` (text and children) into `out`.
pub(crate) fn serialize_children(node: &HtmlNode, out: &mut String) {
    if is_raw_text_element(&node.tag) {
        out.push_str(&node.text);
    } else {
        escape_into(&node.text, false, out);
    }
    for child in &node.children {
        serialize_node(child, out);
    }
}

/// Serialize one element, including its tail text.
pub(crate) fn serialize_node(node: &HtmlNode, out: &mut String) {
    if node.is_comment() {
        out.push_str("<!--");
        out.push_str(&node.text);
        out.push_str("-->");
        escape_into(&node.tail, false, out);
        return;
    }

    out.push('<');
    out.push_str(&node.tag);
    for (key, value) in &node.attrs {
        out.push(' ');
        out.push_str(key);
        if value.is_empty() && is_boolean_attribute(key) {
            continue;
        }
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }

    if is_void_element(&node.tag) {
        out.push_str(" />");
    } else {
        out.push('>');
        serialize_children(node, out);
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }

    escape_into(&node.tail, false, out);
}

fn escape_into(text: &str, in_attr: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::HtmlDocument;

    fn round_trip(html: &str) -> String {
        HtmlDocument::parse(html).unwrap().to_html()
    }

    #[test]
    fn test_void_elements_self_close() {
        assert_eq!(
            round_trip(r#"<p>a<br>b<img src="x.png" alt="x"></p>"#),
            r#"<p>a<br />b<img src="x.png" alt="x" /></p>"#
        );
    }

    #[test]
    fn test_empty_non_void_elements_keep_end_tag() {
        assert_eq!(
            round_trip(r#"<script src="js/a.js"></script><div id="x"/>"#),
            r#"<script src="js/a.js"></script><div id="x"></div>"#
        );
    }

    #[test]
    fn test_text_and_attributes_are_escaped() {
        assert_eq!(
            round_trip(r#"<a title="say &quot;hi&quot;" href="?a=1&b=2">1 &lt; 2 &amp; Q&A</a>"#),
            r#"<a title="say &quot;hi&quot;" href="?a=1&amp;b=2">1 &lt; 2 &amp; Q&amp;A</a>"#
        );
    }

    #[test]
    fn test_script_and_style_bodies_unescaped() {
        let html = "<script>\nif (a < b && c > 0) { go(); }\n</script>\n<style>\np > a { color: red }\n</style>";
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_textarea_body_unescaped() {
        let html = "<textarea name=\"t\">1 &lt; 2 <b></textarea>";
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_unclosed_paragraphs_do_not_nest() {
        assert_eq!(
            round_trip("<p>a<p>b\n<h3 id=\"h\">H</h3>"),
            "<p>a</p><p>b\n</p><h3 id=\"h\">H</h3>"
        );
    }

    #[test]
    fn test_unclosed_list_items() {
        assert_eq!(
            round_trip("<ul><li>one<li>two</ul>"),
            "<ul><li>one</li><li>two</li></ul>"
        );
    }

    #[test]
    fn test_comments_round_trip() {
        let html = "<div><!-- keep <b>this</b> & that -->x</div><!--[if IE]><p>old</p><![endif]-->";
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_boolean_attributes_stay_bare() {
        assert_eq!(
            round_trip(r#"<input disabled type="checkbox"><input checked="" type="checkbox" /><a title="">x</a>"#),
            r#"<input disabled type="checkbox" /><input checked type="checkbox" /><a title="">x</a>"#
        );
    }

    #[test]
    fn test_doctype_round_trip() {
        assert_eq!(
            round_trip("<!DOCTYPE html>\n<html><head><title>t</title></head></html>"),
            "<!DOCTYPE html>\n<html><head><title>t</title></head></html>"
        );
    }

    #[test]
    fn test_markdown_output_round_trip() {
        let html = "<h1>Title</h1>\n<p>Some <em>text</em> and <code>x &lt; y</code>.</p>\n";
        assert_eq!(round_trip(html), html);
    }
}
