//! Content extraction from legacy sutta pages.
//!
//! The pages are table layouts from the early 2000s: the sutta text sits in
//! a `<td style="text-align: justify" valign="top">` cell, headings are
//! `<b>` or `<p>` runs distinguished only by `<font size>`, and footnotes
//! live in table rows below the text. [`Extractor::extract`] turns such a
//! page into a [`ContentFragment`] of clean blocks plus the page's
//! [`SuttaMetadata`].

mod classify;
mod metadata;
mod notes;
mod toc;

pub use classify::{Action, Features, classify};
pub use metadata::{UNTITLED, extract_metadata};
pub use notes::{collect_footnotes, note_cells};
pub use toc::{entry_level, level_style, local_target, rebuild_contents};

use tracing::{debug, trace};

use crate::dom::{Dom, NodeId, outer_html, parse_document};
use crate::model::{BlockKind, ContentFragment, SourceDocument, SuttaMetadata};
use crate::util::escape_html;

/// Fallback paragraphs kept when no structure could be recognized.
const FALLBACK_PARAGRAPHS: usize = 10;

/// Extracts content blocks from source pages.
#[derive(Debug, Clone)]
pub struct Extractor {
    content_root: String,
}

impl Extractor {
    /// `content_root` is prefixed to relative `.htm` links.
    pub fn new(content_root: impl Into<String>) -> Self {
        Self {
            content_root: content_root.into(),
        }
    }

    pub fn extract(&self, doc: &SourceDocument) -> (ContentFragment, SuttaMetadata) {
        if doc.is_empty() {
            return (ContentFragment::new(), extract_metadata(&Dom::new()));
        }

        let cleaned = strip_dangling_paragraphs(&doc.text);
        let mut dom = parse_document(&cleaned);
        let metadata = extract_metadata(&dom);
        rewrite_links(&mut dom, &self.content_root);

        let fragment = match find_content_cell(&dom) {
            Some(cell) => {
                let mut fragment = extract_blocks(&mut dom, cell);
                for note in collect_footnotes(&mut dom, cell) {
                    fragment.push(BlockKind::Footnote, note, None);
                }
                if fragment.is_empty() {
                    debug!(url = %doc.identifier, "no structured content, using plain text");
                    fragment = plain_text_fallback(&dom.text_content(cell));
                }
                fragment
            }
            None => {
                debug!(url = %doc.identifier, "content cell not found, using plain text");
                let body = dom.find_tag(dom.document(), "body").unwrap_or(dom.document());
                plain_text_fallback(&dom.text_content(body))
            }
        };

        trace!(url = %doc.identifier, blocks = fragment.len(), "extracted");
        (fragment, metadata)
    }
}

/// Remove `<p>` openers that are never closed.
///
/// An opener survives only when a `</p>` follows before the next `<p`.
/// The legacy pages start many paragraphs with a stray `<p>` that would
/// otherwise swallow the rest of the cell.
pub fn strip_dangling_paragraphs(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut out = String::with_capacity(html.len());
    let mut copied = 0;
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find("<p") {
        let start = pos + offset;
        let after_name = start + 2;
        let is_opener = matches!(bytes.get(after_name), Some(b'>') | Some(b' ' | b'\t' | b'\n' | b'\r'));
        if !is_opener {
            pos = after_name;
            continue;
        }
        let Some(end) = lower[after_name..].find('>').map(|i| after_name + i + 1) else {
            break;
        };

        let next_close = lower[end..].find("</p>");
        let next_open = lower[end..].find("<p");
        let closed = match (next_close, next_open) {
            (Some(close), Some(open)) => close < open,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if !closed {
            out.push_str(&html[copied..start]);
            copied = end;
        }
        pos = end;
    }

    out.push_str(&html[copied..]);
    out
}

/// Prefix relative `.htm` links with the canonical content root.
pub fn rewrite_links(dom: &mut Dom, content_root: &str) {
    for a in dom.find_all_tags(dom.document(), "a") {
        let Some(href) = dom.attr(a, "href") else {
            continue;
        };
        if href.ends_with(".htm") && !href.contains("://") {
            let absolute = format!("{content_root}{href}");
            dom.set_attr(a, "href", &absolute);
        }
    }
}

/// Parse a `style` attribute into lowercase (property, value) pairs.
fn declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            Some((
                prop.trim().to_ascii_lowercase(),
                value.trim().to_ascii_lowercase(),
            ))
        })
        .collect()
}

fn is_content_cell(dom: &Dom, td: NodeId) -> bool {
    let decls = declarations(dom.attr(td, "style").unwrap_or(""));
    let has = |prop: &str, value: &str| decls.iter().any(|(p, v)| p == prop && v == value);

    let justified = has("text-align", "justify");
    let top = dom
        .attr(td, "valign")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("top"))
        || has("vertical-align", "top");
    justified && top
}

/// The last justified, top-aligned table cell.
pub fn find_content_cell(dom: &Dom) -> Option<NodeId> {
    dom.find_all_tags(dom.document(), "td")
        .into_iter()
        .rev()
        .find(|&td| is_content_cell(dom, td))
}

fn features(dom: &Dom, id: NodeId) -> Features {
    let Some(tag) = dom.tag(id) else {
        return Features::text(dom.is_blank_text(id));
    };

    let first_font = dom.find_tag(id, "font");
    let links = dom.find_all_tags(id, "a");
    Features {
        centered: dom
            .attr(id, "align")
            .is_some_and(|a| a.trim().eq_ignore_ascii_case("center")),
        has_italic: dom.find_tag(id, "i").is_some(),
        first_font_size: first_font
            .and_then(|f| dom.attr(f, "size"))
            .map(|s| s.trim().to_string()),
        anchor_links: links
            .iter()
            .filter_map(|&a| dom.attr(a, "href"))
            .filter(|href| local_target(href).starts_with('#'))
            .count(),
        loose_text: has_loose_text(dom, id, &links),
        ..Features::element(tag)
    }
}

/// True when a text node below `id` outside every link contains a letter.
fn has_loose_text(dom: &Dom, id: NodeId, links: &[NodeId]) -> bool {
    dom.descendants(id)
        .filter(|&n| !links.iter().any(|&a| a == n || dom.is_ancestor(a, n)))
        .filter_map(|n| dom.text(n))
        .any(|text| text.chars().any(char::is_alphabetic))
}

/// Classify and rewrite the children of the content cell, in order.
fn extract_blocks(dom: &mut Dom, cell: NodeId) -> ContentFragment {
    let mut fragment = ContentFragment::new();
    let mut contents_done = false;
    let children: Vec<NodeId> = dom.children(cell).collect();

    for (index, child) in children.into_iter().enumerate() {
        match classify(&features(dom, child), contents_done) {
            Action::Drop => {}
            Action::Keep => {
                if dom.is_element(child) || dom.text(child).is_some() {
                    fragment.push(BlockKind::Verbatim, outer_html(dom, child), Some(index));
                }
            }
            Action::Retag {
                tag,
                font_size,
                kind,
            } => {
                dom.set_tag(child, tag);
                if let Some(size) = font_size
                    && let Some(font) = dom.find_tag(child, "font")
                {
                    dom.set_attr(font, "size", size);
                }
                fragment.push(kind, outer_html(dom, child), Some(index));
            }
            Action::Contents => {
                let rebuilt = rebuild_contents(dom, child);
                contents_done = true;
                fragment.push(BlockKind::Contents, outer_html(dom, rebuilt), Some(index));
            }
        }
    }

    fragment
}

/// Split text on blank lines into at most ten escaped paragraphs.
pub fn plain_text_fallback(text: &str) -> ContentFragment {
    let mut fragment = ContentFragment::new();
    let paragraphs = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .take(FALLBACK_PARAGRAPHS);
    for paragraph in paragraphs {
        fragment.push(
            BlockKind::Paragraph,
            format!("<p>{}</p>", escape_html(paragraph)),
            None,
        );
    }
    fragment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_fragment;

    #[test]
    fn test_strip_dangling_paragraphs() {
        assert_eq!(
            strip_dangling_paragraphs("<p class=\"a\">open<p>closed</p>"),
            "open<p>closed</p>"
        );
        assert_eq!(strip_dangling_paragraphs("<P>kept</P>"), "<P>kept</P>");
        assert_eq!(
            strip_dangling_paragraphs("<pre>x</pre><param>"),
            "<pre>x</pre><param>"
        );
        assert_eq!(strip_dangling_paragraphs("<p>never closed"), "never closed");
    }

    #[test]
    fn test_content_cell_is_last_match() {
        let dom = parse_document(
            r#"<table><tr>
                <td style="text-align: justify" valign="top">first</td>
                <td style="TEXT-ALIGN: justify; vertical-align: top;">second</td>
                <td style="text-align: left" valign="top">other</td>
            </tr></table>"#,
        );
        let cell = find_content_cell(&dom).unwrap();
        assert_eq!(dom.text_content(cell), "second");
    }

    #[test]
    fn test_rewrite_links() {
        let mut dom =
            parse_document(r##"<a href="mn2-sv.htm">a</a><a href="http://x.ru/y.htm">b</a><a href="#n1">c</a>"##);
        rewrite_links(&mut dom, "https://root/Texts/");
        let hrefs: Vec<_> = dom
            .find_all_tags(dom.document(), "a")
            .into_iter()
            .map(|a| dom.attr(a, "href").unwrap().to_string())
            .collect();
        assert_eq!(hrefs, vec!["https://root/Texts/mn2-sv.htm", "http://x.ru/y.htm", "#n1"]);
    }

    #[test]
    fn test_plain_text_fallback_caps() {
        let text: String = (0..15).map(|i| format!("para {i} <x>\n\n")).collect();
        let fragment = plain_text_fallback(&text);
        assert_eq!(fragment.len(), 10);
        assert_eq!(fragment.blocks[0].html, "<p>para 0 &lt;x&gt;</p>");
    }

    #[test]
    fn test_contents_features() {
        let (dom, body) = parse_fragment(
            r##"<font size="2"><a href="x.htm#a1">1. Начало</a>, <a href="#a2">1.1</a></font><font size="2">Так я слышал<a href="#n1">1</a><a href="#n2">2</a></font>"##,
        );
        let runs: Vec<_> = dom.element_children(body).collect();

        let toc = features(&dom, runs[0]);
        assert_eq!(toc.anchor_links, 2);
        assert!(!toc.loose_text);

        let prose = features(&dom, runs[1]);
        assert_eq!(prose.anchor_links, 2);
        assert!(prose.loose_text);
    }

    #[test]
    fn test_empty_document() {
        let extractor = Extractor::new("https://root/");
        let (fragment, meta) = extractor.extract(&SourceDocument::empty("u"));
        assert!(fragment.is_empty());
        assert_eq!(meta.original_title, UNTITLED);
    }
}
