//! Decision table mapping a content cell child to its output form.
//!
//! The legacy pages mark structure only through tags and `<font size>`
//! hints. [`classify`] is a pure function over the few facts that matter
//! ([`Features`]); the caller gathers those facts from the DOM and applies
//! the returned [`Action`].

use crate::model::BlockKind;

/// The facts about one child node that decide its classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Features {
    /// Lowercase tag name, `None` for text nodes.
    pub tag: Option<String>,
    /// `align="center"`.
    pub centered: bool,
    /// Contains an `<i>` element.
    pub has_italic: bool,
    /// `size` of the first nested `<font>`.
    pub first_font_size: Option<String>,
    /// Number of `<a href>` pointing at an in-page anchor.
    pub anchor_links: usize,
    /// Letters outside of links. Numbering and punctuation don't count.
    pub loose_text: bool,
    /// Whitespace-only text node.
    pub blank: bool,
}

impl Features {
    pub fn element(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_ascii_lowercase()),
            ..Self::default()
        }
    }

    pub fn text(blank: bool) -> Self {
        Self {
            tag: None,
            blank,
            ..Self::default()
        }
    }
}

/// What to do with a child of the content cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Rename the element and optionally set the size of its first nested
    /// `<font>`.
    Retag {
        tag: &'static str,
        font_size: Option<&'static str>,
        kind: BlockKind,
    },
    /// Rebuild as the indented table of contents.
    Contents,
    /// Emit unchanged.
    Keep,
    /// Leave out of the output.
    Drop,
}

const HEADING_FONT_SIZES: &[&str] = &["4", "5", "6"];

/// Anchor links needed before a `<font>` run reads as a contents block.
const MIN_CONTENTS_LINKS: usize = 2;

/// Classify one child. `contents_done` is set once the table of contents
/// has been rebuilt; later link-bearing `<font>` runs are kept as they are.
/// A run with prose around its links is body text, not contents.
pub fn classify(features: &Features, contents_done: bool) -> Action {
    let Some(tag) = features.tag.as_deref() else {
        return if features.blank { Action::Drop } else { Action::Keep };
    };

    match tag {
        "br" => Action::Drop,
        "font" if is_contents(features) && !contents_done => Action::Contents,
        "b" => heading(3, "4"),
        "p" if features.centered => heading(3, "4"),
        "p" if features.has_italic => heading(4, "4"),
        "p" if features
            .first_font_size
            .as_deref()
            .is_some_and(|size| HEADING_FONT_SIZES.contains(&size)) =>
        {
            heading(3, "3")
        }
        "p" | "div" => Action::Retag {
            tag: "p",
            font_size: None,
            kind: BlockKind::Paragraph,
        },
        _ => Action::Keep,
    }
}

fn is_contents(features: &Features) -> bool {
    features.anchor_links >= MIN_CONTENTS_LINKS && !features.loose_text
}

fn heading(level: u8, font_size: &'static str) -> Action {
    Action::Retag {
        tag: if level == 4 { "h4" } else { "h3" },
        font_size: Some(font_size),
        kind: BlockKind::Heading(level),
    }
}
