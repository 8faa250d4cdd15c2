//! Data passed between the pipeline stages.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SUBDIVIDED_KEY_RE: Regex =
        Regex::new(r"^([a-z]+)(\d+)_(\d+)(?:-(\d+))?(?:[-.]|$)").unwrap();
    static ref PAGED_KEY_RE: Regex = Regex::new(r"^([a-z]+)(\d+)(?:-(\d{2})-)?").unwrap();
    static ref NUMBER_RE: Regex =
        Regex::new(r"^\p{Lu}{2,3}\s\d+(?:\.\d+)?").unwrap();
}

/// Raw markup of one source page.
///
/// An empty document stands for "nothing could be fetched"; callers skip it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// URL the page was requested from.
    pub identifier: String,
    pub text: String,
    /// Encoding label of `text` as stored (always "utf-8" after decoding).
    pub encoding: String,
}

impl SourceDocument {
    pub fn new(identifier: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            text: text.into(),
            encoding: "utf-8".to_string(),
        }
    }

    pub fn empty(identifier: impl Into<String>) -> Self {
        Self::new(identifier, String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// What kind of output a block became.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    /// The reformatted in-page table of contents.
    Contents,
    Footnote,
    /// Kept without retagging.
    Verbatim,
}

/// One top-level piece of extracted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub html: String,
    /// Position among the content container's children. `None` for
    /// footnotes and plain-text fallback paragraphs.
    pub source_index: Option<usize>,
}

/// Cleaned content of one page, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFragment {
    pub blocks: Vec<Block>,
}

impl ContentFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: BlockKind, html: String, source_index: Option<usize>) {
        self.blocks.push(Block {
            kind,
            html,
            source_index,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn footnotes(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.kind == BlockKind::Footnote)
    }

    pub fn to_html(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.html.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Titles and number parsed from a sutta page heading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuttaMetadata {
    /// Pali title, e.g. "Mūlapariyāya".
    pub original_title: String,
    /// Russian title, e.g. "Корень всего сущего".
    pub translated_title: String,
    /// Collection code and number, e.g. "МН 1" or "АН 4.17".
    pub number: Option<String>,
}

impl SuttaMetadata {
    /// Keep only the `<code> <int>[.<int>]` prefix of a candidate number.
    pub fn normalize_number(candidate: &str) -> Option<String> {
        let collapsed = crate::util::collapse_whitespace(candidate);
        NUMBER_RE.find(&collapsed).map(|m| m.as_str().to_string())
    }
}

/// Position of a page within its collection, parsed from the file name.
///
/// Handles `mn1-mulapariyaya-sutta-sv.htm`, `dn16-02-sv.htm` (second page
/// of DN 16) and `an4_17-20-sv.htm` (AN nipata 4, suttas 17-20).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageKey {
    pub subdivision: Option<u32>,
    pub first: u32,
    pub last: u32,
    pub page: u32,
}

impl PageKey {
    pub fn parse(file_name: &str) -> Option<Self> {
        let name = file_name.rsplit('/').next().unwrap_or(file_name).to_lowercase();

        if let Some(caps) = SUBDIVIDED_KEY_RE.captures(&name) {
            let subdivision = caps[2].parse().ok()?;
            let first: u32 = caps[3].parse().ok()?;
            let last = match caps.get(4) {
                Some(m) => m.as_str().parse().ok()?,
                None => first,
            };
            return Some(Self {
                subdivision: Some(subdivision),
                first,
                last: last.max(first),
                page: 1,
            });
        }

        let caps = PAGED_KEY_RE.captures(&name)?;
        let number = caps[2].parse().ok()?;
        let page = match caps.get(3) {
            Some(m) => m.as_str().parse().ok()?,
            None => 1,
        };
        Some(Self {
            subdivision: None,
            first: number,
            last: number,
            page,
        })
    }

    pub fn is_range(&self) -> bool {
        self.last > self.first
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sub) = self.subdivision {
            write!(f, "{sub}.")?;
        }
        if self.is_range() {
            write!(f, "{}-{}", self.first, self.last)
        } else {
            write!(f, "{}", self.first)
        }
    }
}

/// One extracted page ready for grouping.
#[derive(Debug, Clone)]
pub struct SuttaPage {
    pub key: PageKey,
    pub metadata: SuttaMetadata,
    pub fragment: ContentFragment,
}

/// Heading shown at the top of a chapter document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterHeading {
    pub original: String,
    pub translated: String,
    pub number: String,
}

/// One piece of a chapter: a sutta (or one page of it) with its metadata.
#[derive(Debug, Clone)]
pub struct ChapterPart {
    pub metadata: SuttaMetadata,
    pub fragment: ContentFragment,
}

/// One content document of the book.
#[derive(Debug, Clone)]
pub struct Chapter {
    /// Label used in the table of contents.
    pub title: String,
    /// File name inside the book, e.g. `mn1.xhtml`.
    pub file_name: String,
    pub heading: ChapterHeading,
    pub parts: Vec<ChapterPart>,
    /// When set, every part is preceded by its own small title block.
    pub part_titles: bool,
    pub subdivision: Option<u32>,
    pub first: u32,
    pub last: u32,
}

impl Chapter {
    /// Number of source pages merged into this chapter.
    pub fn page_count(&self) -> usize {
        self.parts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_key_single() {
        let key = PageKey::parse("mn1-mulapariyaya-sutta-sv.htm").unwrap();
        assert_eq!((key.subdivision, key.first, key.last, key.page), (None, 1, 1, 1));
    }

    #[test]
    fn test_page_key_paged() {
        let key = PageKey::parse("https://theravada.ru/Texts/dn16-03-sv.htm").unwrap();
        assert_eq!((key.first, key.page), (16, 3));
    }

    #[test]
    fn test_page_key_subdivided() {
        let key = PageKey::parse("an4_17-20-sv.htm").unwrap();
        assert_eq!(key.subdivision, Some(4));
        assert_eq!((key.first, key.last), (17, 20));
        assert!(key.is_range());

        let key = PageKey::parse("sn12_3-sv.html").unwrap();
        assert_eq!((key.subdivision, key.first, key.last), (Some(12), 3, 3));
        assert_eq!(key.to_string(), "12.3");
    }

    #[test]
    fn test_page_key_rejects_unrelated() {
        assert!(PageKey::parse("index.htm").is_none());
    }

    #[test]
    fn test_normalize_number() {
        assert_eq!(SuttaMetadata::normalize_number(" МН  1 "), Some("МН 1".into()));
        assert_eq!(SuttaMetadata::normalize_number("АН 4.17"), Some("АН 4.17".into()));
        assert_eq!(SuttaMetadata::normalize_number("Содержание"), None);
    }
}
