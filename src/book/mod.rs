use std::collections::BTreeMap;

/// An assembled ebook, ready to be packaged.
///
/// Resources are keyed by their path inside the content directory
/// (`mn1.xhtml`, `style/style.css`) and kept sorted so the
/// packaged archive is reproducible.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: Metadata,
    pub spine: Vec<SpineItem>,
    pub toc: Vec<TocEntry>,
    pub resources: BTreeMap<String, Resource>,
}

/// Book metadata (Dublin Core)
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub identifier: String,
    pub publisher: Option<String>,
    pub description: Option<String>,
    /// Work the translation was made from.
    pub source: Option<String>,
    /// Href of the cover image resource.
    pub cover_image: Option<String>,
}

/// An item in the reading order (spine)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub linear: bool,
}

/// A table of contents entry (hierarchical)
///
/// Section entries point at their first leaf so every entry is a
/// navigable target.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
    pub children: Vec<TocEntry>,
}

/// A resource (content document, image, CSS)
#[derive(Debug, Clone)]
pub struct Resource {
    pub data: Vec<u8>,
    pub media_type: String,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the book
    pub fn add_resource(
        &mut self,
        href: impl Into<String>,
        data: Vec<u8>,
        media_type: impl Into<String>,
    ) {
        self.resources.insert(
            href.into(),
            Resource {
                data,
                media_type: media_type.into(),
            },
        );
    }

    /// Get a resource by href
    pub fn get_resource(&self, href: &str) -> Option<&Resource> {
        self.resources.get(href)
    }

    /// Add a spine item
    pub fn add_spine_item(
        &mut self,
        id: impl Into<String>,
        href: impl Into<String>,
        media_type: impl Into<String>,
    ) {
        self.spine.push(SpineItem {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            linear: true,
        });
    }

    /// Leaf entries of the table of contents, in order.
    pub fn toc_leaves(&self) -> Vec<&TocEntry> {
        fn walk<'a>(entries: &'a [TocEntry], out: &mut Vec<&'a TocEntry>) {
            for entry in entries {
                if entry.children.is_empty() {
                    out.push(entry);
                } else {
                    walk(&entry.children, out);
                }
            }
        }
        let mut leaves = Vec::new();
        walk(&self.toc, &mut leaves);
        leaves
    }

    /// Depth of the table of contents tree (1 for a flat list).
    pub fn toc_depth(&self) -> usize {
        fn depth(entries: &[TocEntry]) -> usize {
            entries
                .iter()
                .map(|e| 1 + depth(&e.children))
                .max()
                .unwrap_or(0)
        }
        depth(&self.toc).max(1)
    }
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}

impl TocEntry {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: TocEntry) -> Self {
        self.children.push(child);
        self
    }

    /// Section entry pointing at its first child.
    pub fn section(title: impl Into<String>, children: Vec<TocEntry>) -> Self {
        let href = children.first().map(|c| c.href.clone()).unwrap_or_default();
        Self {
            title: title.into(),
            href,
            children,
        }
    }
}
