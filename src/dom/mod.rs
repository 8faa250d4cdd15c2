//! Mutable HTML tree used by the extractor and the chapter grouper.
//!
//! Pages are parsed with html5ever into an arena ([`Dom`]) that supports the
//! in-place rewrites the legacy markup needs: renaming tags, editing
//! attributes, unwrapping redundant wrappers and moving nodes around.

mod arena;
mod serialize;
mod tree_sink;

use html5ever::ParseOpts;
use html5ever::tendril::TendrilSink;

pub use arena::{Attribute, Children, Descendants, Dom, Node, NodeData, NodeId};
pub use serialize::{inner_html, outer_html};
pub use tree_sink::{DomSink, NodeHandle};

/// Parse a complete HTML document.
pub fn parse_document(html: &str) -> Dom {
    html5ever::parse_document(DomSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Parse an HTML fragment. Returns the DOM and its `<body>` element, which
/// holds the fragment's nodes.
pub fn parse_fragment(html: &str) -> (Dom, NodeId) {
    let wrapped = format!("<!DOCTYPE html><html><head></head><body>{html}</body></html>");
    let dom = parse_document(&wrapped);
    let body = dom.find_tag(dom.document(), "body").unwrap_or(dom.document());
    (dom, body)
}
