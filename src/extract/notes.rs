//! Footnotes from the table cells following the content cell.
//!
//! The source pages lay notes out as rows of three cells: a back link to
//! the note marker in the text, the note number and the note body. Each row
//! becomes a paragraph opening with a numbered link back into the text.

use crate::dom::{Dom, NodeData, NodeId, outer_html};

const NOTE_LINK_STYLE: &str = "color: #996600; font-size: 2; font-family: Times New Roman, Times, serif";
const NOTE_FONT_COLOR: &str = "#999966";

/// Layout-only attributes dropped when a note cell becomes a paragraph.
const CELL_ATTRS: &[&str] = &["valign", "width", "height", "colspan", "rowspan", "bgcolor", "nowrap"];

fn is_end_marker(dom: &Dom, td: NodeId) -> bool {
    dom.attr(td, "class")
        .is_some_and(|class| class.split_whitespace().any(|c| c.eq_ignore_ascii_case("bottom")))
}

/// Note cells: every `td` after `content_cell` (outside it) and before the
/// first `td.bottom`. Without an end marker the page has no notes.
pub fn note_cells(dom: &Dom, content_cell: NodeId) -> Vec<NodeId> {
    let cells = dom.find_all_tags(dom.document(), "td");
    let Some(start) = cells.iter().position(|&td| td == content_cell) else {
        return Vec::new();
    };

    let after: Vec<NodeId> = cells[start + 1..]
        .iter()
        .copied()
        .filter(|&td| !dom.is_ancestor(content_cell, td))
        .collect();

    match after.iter().position(|&td| is_end_marker(dom, td)) {
        Some(end) => after[..end].to_vec(),
        None => Vec::new(),
    }
}

/// Build one paragraph per complete (link, number, body) triple.
pub fn collect_footnotes(dom: &mut Dom, content_cell: NodeId) -> Vec<String> {
    let cells = note_cells(dom, content_cell);
    let mut notes = Vec::new();

    for triple in cells.chunks_exact(3) {
        let back_link = dom
            .find_all_tags(triple[0], "a")
            .into_iter()
            .find_map(|a| dom.attr(a, "href").map(str::to_string))
            .unwrap_or_default();
        let number = dom.text_content(triple[1]).trim().to_string();
        let body = triple[2];

        dom.set_tag(body, "p");
        strip_cell_attrs(dom, body);
        if !back_link.is_empty() {
            insert_note_link(dom, body, &back_link, &number);
        }
        notes.push(outer_html(dom, body));
    }

    notes
}

fn strip_cell_attrs(dom: &mut Dom, id: NodeId) {
    if let Some(node) = dom.get_mut(id)
        && let NodeData::Element { attrs, .. } = &mut node.data
    {
        attrs.retain(|a| {
            !CELL_ATTRS
                .iter()
                .any(|name| a.name.local.as_ref().eq_ignore_ascii_case(name))
        });
    }
}

/// Put `<a href=back_link>number</a> ` in front of the note text.
///
/// The link goes before the first direct text child of the note's colored
/// `font`, falling back to any `font` and then to the cell itself.
fn insert_note_link(dom: &mut Dom, body: NodeId, back_link: &str, number: &str) {
    let fonts = dom.find_all_tags(body, "font");
    let target = fonts
        .iter()
        .copied()
        .find(|&f| {
            dom.attr(f, "color")
                .is_some_and(|c| c.trim().eq_ignore_ascii_case(NOTE_FONT_COLOR))
        })
        .or_else(|| fonts.first().copied())
        .unwrap_or(body);

    let link = dom.create_element("a", &[("href", back_link), ("style", NOTE_LINK_STYLE)]);
    dom.append_text(link, number);
    let space = dom.create_text(" ");

    let first_text = dom.children(target).find(|&c| dom.text(c).is_some());
    match first_text {
        Some(text) => dom.insert_before(text, link),
        None => dom.prepend(target, link),
    }
    dom.insert_after(link, space);
}
