//! Rebuilding the in-page table of contents.

use lazy_static::lazy_static;
use regex::Regex;

use crate::dom::{Dom, NodeId};

lazy_static! {
    static ref LOCAL_ANCHOR_RE: Regex = Regex::new(r"#[a-z][0-9]+$").unwrap();
    static ref ENTRY_NUMBER_RE: Regex = Regex::new(r"^\d+(?:\.\d+)*").unwrap();
}

const CONTENTS_FACE: &str = "Arial, Helvetica, sans-serif";
const CONTENTS_COLOR: &str = "#999966";
const BOLD_ENTRY_STYLE: &str = "font-weight: bold; margin-bottom: 10px;";

/// Nesting level of an entry from its dotted number prefix: `1` is level 1,
/// `1.2` level 2, `1.2.3` level 3. Unnumbered entries are level 1.
pub fn entry_level(text: &str) -> usize {
    ENTRY_NUMBER_RE
        .find(text.trim())
        .map(|m| m.as_str().split('.').count())
        .unwrap_or(1)
}

/// Inline style of an entry `div` at `level`.
pub fn level_style(level: usize) -> &'static str {
    match level {
        2 => "margin-top: 10px; text-indent: 1em;",
        3 => "margin-bottom: 0px; text-indent: 2em;",
        _ => "margin-top: 10px; text-indent: 0em;",
    }
}

/// Reduce a link to its in-page anchor when it has one.
pub fn local_target(href: &str) -> &str {
    LOCAL_ANCHOR_RE
        .find(href)
        .map(|m| m.as_str())
        .unwrap_or(href)
}

/// Replace the link-bearing `font` run at `node` with a fresh `font` holding
/// one indented `div` per entry. Returns the new node, which takes the old
/// node's place in the tree.
pub fn rebuild_contents(dom: &mut Dom, node: NodeId) -> NodeId {
    let container = dom.create_element(
        "font",
        &[("size", "2"), ("face", CONTENTS_FACE), ("color", CONTENTS_COLOR)],
    );

    let links: Vec<NodeId> = dom
        .find_all_tags(node, "a")
        .into_iter()
        .filter(|&a| dom.attr(a, "href").is_some())
        .collect();

    for a in links {
        let text = dom.text_content(a);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(href) = dom.attr(a, "href") {
            let target = local_target(href).to_string();
            dom.set_attr(a, "href", &target);
        }
        if dom.find_tag(a, "b").is_some() {
            dom.set_attr(a, "style", BOLD_ENTRY_STYLE);
        }

        let level = entry_level(text);
        let div = dom.create_element("div", &[("style", level_style(level))]);
        dom.append(div, a);
        dom.append(container, div);
    }

    dom.insert_before(node, container);
    dom.detach(node);
    container
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{outer_html, parse_fragment};

    #[test]
    fn test_entry_level() {
        assert_eq!(entry_level("1. Вступление"), 1);
        assert_eq!(entry_level("2.3 Ученик"), 2);
        assert_eq!(entry_level(" 2.3.1. Дальше"), 3);
        assert_eq!(entry_level("Заключение"), 1);
    }

    #[test]
    fn test_level_style() {
        assert_eq!(level_style(1), "margin-top: 10px; text-indent: 0em;");
        assert_eq!(level_style(2), "margin-top: 10px; text-indent: 1em;");
        assert_eq!(level_style(3), "margin-bottom: 0px; text-indent: 2em;");
        assert_eq!(level_style(4), level_style(1));
    }

    #[test]
    fn test_local_target() {
        assert_eq!(
            local_target("https://theravada.ru/Texts/dn2-sv.htm#a12"),
            "#a12"
        );
        assert_eq!(local_target("#b3"), "#b3");
        assert_eq!(local_target("dn2-sv.htm"), "dn2-sv.htm");
    }

    #[test]
    fn test_rebuild_contents() {
        let (mut dom, body) = parse_fragment(
            r##"<font size="2"><a href="dn2-sv.htm#a1"><b>1. Начало</b></a><br><a href="#a2">1.1 Вопрос</a><br><a href="#x">  </a></font>"##,
        );
        let font = dom.first_child(body).unwrap();
        let rebuilt = rebuild_contents(&mut dom, font);

        assert_eq!(dom.parent(rebuilt), Some(body));
        assert_eq!(dom.parent(font), None);
        assert_eq!(
            outer_html(&dom, rebuilt),
            concat!(
                r##"<font size="2" face="Arial, Helvetica, sans-serif" color="#999966">"##,
                r##"<div style="margin-top: 10px; text-indent: 0em;"><a href="#a1" style="font-weight: bold; margin-bottom: 10px;"><b>1. Начало</b></a></div>"##,
                r##"<div style="margin-top: 10px; text-indent: 1em;"><a href="#a2">1.1 Вопрос</a></div>"##,
                "</font>"
            )
        );
    }
}
