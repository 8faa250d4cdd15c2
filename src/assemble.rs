//! Building a [`Book`] from grouped chapters.
//!
//! The assembler renders the title page, navigation document, and one
//! XHTML document per chapter, then arranges the table of contents
//! according to the collection's [`TocLayout`]. Packaging into an archive
//! is left to [`crate::epub`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use quick_xml::escape::escape;
use tracing::{debug, warn};

use crate::book::{Book, Metadata, TocEntry};
use crate::config::{BookInfo, CollectionConfig, Section, TocLayout};
use crate::error::{Error, Result};
use crate::model::{Chapter, ChapterPart};
use crate::util::detect_media_format;

const XHTML: &str = "application/xhtml+xml";
const STYLESHEET: &str = "style/style.css";
pub const TITLE_PAGE: &str = "title.xhtml";
pub const NAV_PAGE: &str = "nav.xhtml";
pub const COVER_PAGE: &str = "cover.xhtml";

/// Stylesheet used when the collection does not supply its own.
pub const DEFAULT_CSS: &str = r#"body {
    background: #FFFFCC;
    padding: 20px;
}

h1 {
    text-align: center;
    color: #8B4513;
    margin-bottom: 30px;
    font-size: 1.8em;
}

h2 {
    color: #8B4513;
    margin-top: 30px;
    margin-bottom: 15px;
    font-size: 1.4em;
}

h3 {
    color: #8B4513;
    margin-top: 15px;
    margin-bottom: 5px;
    font-size: 1.2em;
}

p {
    margin: 7px;
    text-align: justify;
}

p.indent {
    text-indent: 1em;
}

a {
    border: 0px solid #FFFFCC;
    text-decoration: none;
    color: #8B4513;
}

.a {
    text-indent: 1em;
}

.center {
    text-align: center;
}
"#;

/// Turns chapters into a [`Book`].
#[derive(Debug, Clone)]
pub struct Assembler {
    info: BookInfo,
    css: Option<String>,
    cover: Option<PathBuf>,
    layout: TocLayout,
    local_code: String,
    subdivision_names: BTreeMap<String, String>,
}

impl Assembler {
    pub fn new(info: BookInfo) -> Self {
        Self {
            info,
            css: None,
            cover: None,
            layout: TocLayout::Flat,
            local_code: String::new(),
            subdivision_names: BTreeMap::new(),
        }
    }

    /// Assembler carrying a collection's book info, stylesheet, TOC layout
    /// and subdivision names.
    pub fn for_collection(config: &CollectionConfig) -> Self {
        Self {
            local_code: config.local_code.clone(),
            subdivision_names: config.subdivisions.clone(),
            ..Self::new(config.book.clone())
        }
        .with_css(config.css.clone())
        .with_layout(config.toc.clone())
    }

    pub fn with_css(mut self, css: Option<String>) -> Self {
        self.css = css;
        self
    }

    pub fn with_cover(mut self, cover: Option<PathBuf>) -> Self {
        self.cover = cover;
        self
    }

    pub fn with_layout(mut self, layout: TocLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Build the book. Fails with [`Error::NoChapters`] on an empty list.
    pub fn assemble(&self, chapters: &[Chapter]) -> Result<Book> {
        if chapters.is_empty() {
            return Err(Error::NoChapters);
        }

        let mut book = Book::new();
        book.metadata = self.metadata();

        let css = self.css.as_deref().unwrap_or(DEFAULT_CSS);
        book.add_resource(STYLESHEET, css.as_bytes().to_vec(), "text/css");

        self.add_cover(&mut book);

        book.add_resource(TITLE_PAGE, self.title_page().into_bytes(), XHTML);
        book.add_spine_item("title", TITLE_PAGE, XHTML);

        book.toc = self.toc(chapters);
        book.add_resource(NAV_PAGE, nav_document(&book.toc).into_bytes(), XHTML);
        book.add_spine_item("nav", NAV_PAGE, XHTML);

        for chapter in chapters {
            let id = chapter.file_name.trim_end_matches(".xhtml");
            book.add_resource(&chapter.file_name, chapter_document(chapter).into_bytes(), XHTML);
            book.add_spine_item(id, &chapter.file_name, XHTML);
        }

        debug!(title = %book.metadata.title, chapters = chapters.len(), "assembled book");
        Ok(book)
    }

    fn metadata(&self) -> Metadata {
        let info = &self.info;
        let mut metadata = Metadata::new(info.full_title())
            .with_author(info.author.clone())
            .with_language(info.language.clone());
        if let Some(identifier) = &info.identifier {
            metadata = metadata.with_identifier(identifier.clone());
        }
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        metadata.publisher = non_empty(&info.publisher);
        metadata.description = non_empty(&info.description);
        metadata.source = non_empty(&info.source);
        metadata
    }

    fn add_cover(&self, book: &mut Book) {
        let Some(path) = &self.cover else {
            return;
        };
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cover image not readable, skipping");
                return;
            }
        };

        let format = detect_media_format(&path.to_string_lossy(), &data);
        if !format.is_image() {
            warn!(path = %path.display(), "cover is not a recognized image, skipping");
            return;
        }
        let href = format!("cover.{}", format.extension());
        book.add_resource(&href, data, format.mime_type());
        book.add_resource(COVER_PAGE, cover_page(&href).into_bytes(), XHTML);
        book.add_spine_item("cover", COVER_PAGE, XHTML);
        if let Some(item) = book.spine.last_mut() {
            item.linear = false;
        }
        book.metadata.cover_image = Some(href);
    }

    fn title_page(&self) -> String {
        let info = &self.info;
        let mut body = String::from("<div style=\"text-align: center; margin-top: 15%;\">\n");
        body.push_str(&format!("<h2>{}</h2>\n", escape(info.title.as_str())));
        if !info.subtitle.is_empty() {
            body.push_str(&format!("<h1>{}</h1>\n", escape(info.subtitle.as_str())));
        }
        if let Some(translator) = &info.translator {
            body.push_str(&format!("<h3>{}</h3>\n", escape(translator.as_str())));
        }
        if !info.source.is_empty() {
            body.push_str(&format!(
                "<p><i>источник: {}</i></p>\n",
                escape(info.source.as_str())
            ));
        }
        body.push_str(
            "<div style=\"text-align: center; margin-top: 47%;\">\n\
             <h2 style=\"margin-bottom: 1px\">www.theravada.ru</h2>\n\
             </div>\n</div>",
        );
        xhtml_document(&info.title, STYLESHEET, &body)
    }

    fn toc(&self, chapters: &[Chapter]) -> Vec<TocEntry> {
        match &self.layout {
            TocLayout::Flat => chapters.iter().map(leaf).collect(),
            TocLayout::Sections { sections } => section_toc(chapters, sections),
            TocLayout::Subdivisions => self.subdivision_toc(chapters),
        }
    }

    fn subdivision_title(&self, number: u32) -> String {
        match self.subdivision_names.get(&number.to_string()) {
            Some(name) => format!("{number}. {name}"),
            None => format!("{} {number}", self.local_code).trim().to_string(),
        }
    }

    /// One entry per run of chapters sharing a subdivision.
    fn subdivision_toc(&self, chapters: &[Chapter]) -> Vec<TocEntry> {
        let mut toc: Vec<TocEntry> = Vec::new();
        let mut current: Option<u32> = None;
        let mut children: Vec<TocEntry> = Vec::new();

        for chapter in chapters {
            if chapter.subdivision != current && !children.is_empty() {
                let title = current.map(|n| self.subdivision_title(n)).unwrap_or_default();
                toc.push(TocEntry::section(title, std::mem::take(&mut children)));
            }
            current = chapter.subdivision;
            match chapter.subdivision {
                Some(_) => children.push(leaf(chapter)),
                None => toc.push(leaf(chapter)),
            }
        }
        if let Some(number) = current
            && !children.is_empty()
        {
            toc.push(TocEntry::section(self.subdivision_title(number), children));
        }
        toc
    }
}

fn leaf(chapter: &Chapter) -> TocEntry {
    TocEntry::new(&chapter.title, &chapter.file_name)
}

fn suttas_label(first: u32, last: u32) -> String {
    if first == last {
        format!("Сутта {first}")
    } else {
        format!("Сутты {first}-{last}")
    }
}

enum Slot {
    Section {
        index: usize,
        groups: Vec<(usize, Vec<TocEntry>)>,
    },
    Leaf(TocEntry),
}

/// Section, then subgroup, then chapters. Chapters outside every section
/// become top-level entries; spine order is preserved throughout.
fn section_toc(chapters: &[Chapter], sections: &[Section]) -> Vec<TocEntry> {
    let ranges: Vec<Vec<(u32, u32)>> = sections.iter().map(Section::subgroups).collect();
    let mut slots: Vec<Slot> = Vec::new();

    for chapter in chapters {
        let placement = sections.iter().enumerate().find_map(|(s, section)| {
            if !section.contains(chapter.first) {
                return None;
            }
            let g = ranges[s]
                .iter()
                .position(|&(a, b)| (a..=b).contains(&chapter.first))?;
            Some((s, g))
        });

        let Some((s, g)) = placement else {
            slots.push(Slot::Leaf(leaf(chapter)));
            continue;
        };

        let existing = slots
            .iter()
            .position(|slot| matches!(slot, Slot::Section { index, .. } if *index == s));
        let pos = match existing {
            Some(pos) => pos,
            None => {
                slots.push(Slot::Section {
                    index: s,
                    groups: Vec::new(),
                });
                slots.len() - 1
            }
        };
        let Slot::Section { groups, .. } = &mut slots[pos] else {
            continue;
        };
        match groups.iter_mut().find(|(index, _)| *index == g) {
            Some((_, entries)) => entries.push(leaf(chapter)),
            None => groups.push((g, vec![leaf(chapter)])),
        }
    }

    slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Leaf(entry) => entry,
            Slot::Section { index, groups } => {
                let children = groups
                    .into_iter()
                    .map(|(g, entries)| {
                        let (a, b) = ranges[index][g];
                        TocEntry::section(suttas_label(a, b), entries)
                    })
                    .collect();
                TocEntry::section(&sections[index].name, children)
            }
        })
        .collect()
}

fn xhtml_document(title: &str, stylesheet: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"ru\" lang=\"ru\">\n\
         <head>\n<title>{}</title>\n\
         <link rel=\"stylesheet\" type=\"text/css\" href=\"{stylesheet}\"/>\n\
         </head>\n<body>\n{body}\n</body>\n</html>\n",
        escape(title)
    )
}

fn cover_page(image: &str) -> String {
    let body = format!(
        "<div style=\"text-align: center;\"><img src=\"{}\" alt=\"cover\" style=\"max-width: 100%;\"/></div>",
        escape(image)
    );
    xhtml_document("Cover", STYLESHEET, &body)
}

/// Heading table at the top of every chapter.
pub fn sutta_title_html(original: &str, translated: &str, number: &str) -> String {
    format!(
        "<table width=\"100%\" border=\"0\" cellspacing=\"0\" cellpadding=\"0\">\n\
         <tr><td><div align=\"center\">\n\
         <font size=\"4\" face=\"Times New Roman, Times, serif\"><i>{}</i>:<br/>\n\
         <font size=\"5\" color=\"brown\">{}</font><br/>\n\
         <font size=\"3\">{}</font>\n\
         </font>\n</div></td></tr>\n</table>\n<br/>",
        escape(original),
        escape(translated),
        escape(number)
    )
}

/// Smaller heading placed before each sutta of a merged chapter.
pub fn part_title_html(part: &ChapterPart) -> String {
    let meta = &part.metadata;
    let colon = if meta.original_title.is_empty() { "" } else { ":" };
    format!(
        "<br/>\n<div align=\"center\">\n\
         <font size=\"3\" face=\"Times New Roman, Times, serif\"><i>{}</i>{colon}<br/>\n\
         <font size=\"4\" color=\"brown\">{}</font><br/>\n\
         <font size=\"3\">{}</font>\n\
         </font>\n</div>\n<br/>",
        escape(meta.original_title.as_str()),
        escape(meta.translated_title.as_str()),
        escape(meta.number.as_deref().unwrap_or(""))
    )
}

/// Full XHTML document for one chapter.
pub fn chapter_document(chapter: &Chapter) -> String {
    let heading = &chapter.heading;
    let mut body = sutta_title_html(&heading.original, &heading.translated, &heading.number);
    for part in &chapter.parts {
        body.push('\n');
        if chapter.part_titles {
            body.push_str(&part_title_html(part));
            body.push('\n');
        }
        body.push_str(&part.fragment.to_html());
    }
    xhtml_document(&chapter.title, STYLESHEET, &body)
}

/// Navigation document mirroring the table of contents.
pub fn nav_document(toc: &[TocEntry]) -> String {
    fn list(entries: &[TocEntry], out: &mut String) {
        out.push_str("<ol>\n");
        for entry in entries {
            out.push_str(&format!(
                "<li><a href=\"{}\">{}</a>",
                escape(entry.href.as_str()),
                escape(entry.title.as_str())
            ));
            if !entry.children.is_empty() {
                out.push('\n');
                list(&entry.children, out);
            }
            out.push_str("</li>\n");
        }
        out.push_str("</ol>");
    }

    let mut body = String::from("<nav id=\"toc\">\n<h1>Содержание</h1>\n");
    list(toc, &mut body);
    body.push_str("\n</nav>");
    xhtml_document("Содержание", STYLESHEET, &body)
}
