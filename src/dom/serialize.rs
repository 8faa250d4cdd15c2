//! XHTML-compatible serialization of [`Dom`] subtrees.

use quick_xml::escape::{escape, partial_escape};

use super::arena::{Dom, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Serialize a node together with its own tag.
pub fn outer_html(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    write_node(dom, id, &mut out);
    out
}

/// Serialize only the children of a node.
pub fn inner_html(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    for child in dom.children(id) {
        write_node(dom, child, &mut out);
    }
    out
}

fn write_node(dom: &Dom, id: NodeId, out: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };
    match &node.data {
        NodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, out);
            }
        }
        NodeData::Text(text) => out.push_str(&partial_escape(text.as_str())),
        NodeData::Comment(_) | NodeData::Doctype => {}
        NodeData::Element { name, attrs } => {
            let tag = name.local.as_ref();
            if tag.eq_ignore_ascii_case("script") {
                return;
            }

            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                out.push_str(attr.name.local.as_ref());
                out.push_str("=\"");
                out.push_str(&escape(attr.value.as_str()));
                out.push('"');
            }

            if is_void(tag) {
                out.push_str("/>");
                return;
            }
            out.push('>');

            if tag.eq_ignore_ascii_case("style") {
                out.push_str(&dom.text_content(id));
            } else {
                for child in dom.children(id) {
                    write_node(dom, child, out);
                }
            }

            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_elements_self_close() {
        let mut dom = Dom::new();
        let p = dom.create_element("p", &[]);
        dom.append(dom.document(), p);
        dom.append_text(p, "a");
        let br = dom.create_element("br", &[]);
        dom.append(p, br);
        dom.append_text(p, "b");

        assert_eq!(outer_html(&dom, p), "<p>a<br/>b</p>");
    }

    #[test]
    fn test_escaping() {
        let mut dom = Dom::new();
        let a = dom.create_element("a", &[("href", "x?a=1&b=\"2\"")]);
        dom.append(dom.document(), a);
        dom.append_text(a, "1 < 2 & 3");

        assert_eq!(
            outer_html(&dom, a),
            "<a href=\"x?a=1&amp;b=&quot;2&quot;\">1 &lt; 2 &amp; 3</a>"
        );
    }

    #[test]
    fn test_inner_html_skips_comments() {
        let mut dom = Dom::new();
        let div = dom.create_element("div", &[]);
        dom.append(dom.document(), div);
        let comment = dom.create_comment("counter".to_string());
        dom.append(div, comment);
        dom.append_text(div, "text");

        assert_eq!(inner_html(&dom, div), "text");
    }
}
