use std::io::{Seek, Write};
use std::path::Path;

use quick_xml::escape::escape;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::book::{Book, TocEntry};
use crate::error::Result;

/// Content directory inside the archive.
const CONTENT_DIR: &str = "OEBPS";

/// Write a [`Book`] to an EPUB file on disk.
///
/// Creates an EPUB 2 file with OPF package document, NCX table of contents,
/// and all resources packaged under `OEBPS/`.
///
/// # Example
///
/// ```no_run
/// use suttapub::{Book, Metadata, write_epub};
///
/// let mut book = Book::new();
/// book.metadata = Metadata::new("Маджхима Никая").with_author("Buddha");
/// write_epub(&book, "majjhima.epub")?;
/// # Ok::<(), suttapub::Error>(())
/// ```
pub fn write_epub<P: AsRef<Path>>(book: &Book, path: P) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_epub_to_writer(book, file)
}

/// Write a [`Book`] to any [`Write`] + [`Seek`] destination.
pub fn write_epub_to_writer<W: Write + Seek>(book: &Book, writer: W) -> Result<()> {
    let mut zip = ZipWriter::new(writer);

    // mimetype must be first and uncompressed
    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("mimetype", options_stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    let identifier = book_identifier(book);

    let opf = generate_opf(book, &identifier);
    zip.start_file(format!("{CONTENT_DIR}/content.opf"), options_deflate)?;
    zip.write_all(opf.as_bytes())?;

    let ncx = generate_ncx(book, &identifier);
    zip.start_file(format!("{CONTENT_DIR}/toc.ncx"), options_deflate)?;
    zip.write_all(ncx.as_bytes())?;

    for (href, resource) in &book.resources {
        if href == "toc.ncx" || href == "content.opf" {
            continue;
        }
        zip.start_file(format!("{CONTENT_DIR}/{href}"), options_deflate)?;
        zip.write_all(&resource.data)?;
    }

    zip.finish()?;
    Ok(())
}

/// The configured identifier, else a stable `urn:sha1:` of the title so a
/// rebuilt book keeps its identity in reading apps.
pub fn book_identifier(book: &Book) -> String {
    if book.metadata.identifier.is_empty() {
        let digest = sha1_smol::Sha1::from(book.metadata.title.as_bytes()).digest();
        format!("urn:sha1:{digest}")
    } else {
        book.metadata.identifier.clone()
    }
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

fn generate_opf(book: &Book, identifier: &str) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );

    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape(book.metadata.title.as_str())
    ));
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape(identifier)
    ));

    let language = if book.metadata.language.is_empty() {
        "ru"
    } else {
        &book.metadata.language
    };
    opf.push_str(&format!("    <dc:language>{}</dc:language>\n", escape(language)));

    for author in &book.metadata.authors {
        opf.push_str(&format!(
            "    <dc:creator opf:role=\"aut\">{}</dc:creator>\n",
            escape(author.as_str())
        ));
    }

    let optional = [
        ("publisher", &book.metadata.publisher),
        ("description", &book.metadata.description),
        ("source", &book.metadata.source),
    ];
    for (element, value) in optional {
        if let Some(value) = value {
            opf.push_str(&format!(
                "    <dc:{element}>{}</dc:{element}>\n",
                escape(value.as_str())
            ));
        }
    }

    if book.metadata.cover_image.is_some() {
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    }

    opf.push_str("  </metadata>\n  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );

    for (href, resource) in &book.resources {
        let id = if book.metadata.cover_image.as_deref() == Some(href.as_str()) {
            "cover-image".to_string()
        } else {
            href_to_id(href)
        };
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
            id,
            escape(href.as_str()),
            escape(resource.media_type.as_str())
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    for item in &book.spine {
        let id = href_to_id(&item.href);
        if item.linear {
            opf.push_str(&format!("    <itemref idref=\"{id}\"/>\n"));
        } else {
            opf.push_str(&format!("    <itemref idref=\"{id}\" linear=\"no\"/>\n"));
        }
    }
    opf.push_str("  </spine>\n");

    if let Some(cover_page) = book.spine.iter().find(|s| s.id == "cover") {
        opf.push_str(&format!(
            "  <guide>\n    <reference type=\"cover\" title=\"Cover\" href=\"{}\"/>\n  </guide>\n",
            escape(cover_page.href.as_str())
        ));
    }

    opf.push_str("</package>\n");
    opf
}

fn generate_ncx(book: &Book, identifier: &str) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
    );
    ncx.push_str(&format!(
        "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
        escape(identifier)
    ));
    ncx.push_str(&format!(
        "    <meta name=\"dtb:depth\" content=\"{}\"/>\n",
        book.toc_depth()
    ));
    ncx.push_str(
        r#"    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
"#,
    );
    ncx.push_str(&format!(
        "    <text>{}</text>\n  </docTitle>\n  <navMap>\n",
        escape(book.metadata.title.as_str())
    ));

    let mut play_order = 1;
    for entry in &book.toc {
        write_nav_point(&mut ncx, entry, &mut play_order, 2);
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn write_nav_point(ncx: &mut String, entry: &TocEntry, play_order: &mut usize, indent: usize) {
    let indent_str = "  ".repeat(indent);

    ncx.push_str(&format!(
        "{indent_str}<navPoint id=\"navpoint-{play_order}\" playOrder=\"{play_order}\">\n"
    ));
    ncx.push_str(&format!(
        "{indent_str}  <navLabel>\n{indent_str}    <text>{}</text>\n{indent_str}  </navLabel>\n",
        escape(entry.title.as_str())
    ));
    ncx.push_str(&format!(
        "{indent_str}  <content src=\"{}\"/>\n",
        escape(entry.href.as_str())
    ));

    *play_order += 1;

    for child in &entry.children {
        write_nav_point(ncx, child, play_order, indent + 1);
    }

    ncx.push_str(&format!("{indent_str}</navPoint>\n"));
}

/// Manifest id for an href. Ids must start with a letter.
pub fn href_to_id(href: &str) -> String {
    let id = href.replace(['/', '.', ' ', '-'], "_");
    if id.starts_with(|c: char| c.is_ascii_alphabetic()) {
        id
    } else {
        format!("item_{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Metadata;

    fn sample() -> Book {
        let mut book = Book::new();
        book.metadata = Metadata::new("Дигха & Никая").with_author("Buddha");
        book.metadata.source = Some("Digha Nikaya".into());
        book.add_resource("chapters/dn1.xhtml", b"<html/>".to_vec(), "application/xhtml+xml");
        book.add_spine_item("dn1", "chapters/dn1.xhtml", "application/xhtml+xml");
        book.toc.push(TocEntry::section(
            "Part",
            vec![TocEntry::new("1. Brahmajāla", "chapters/dn1.xhtml")],
        ));
        book
    }

    #[test]
    fn test_identifier_is_stable() {
        let book = sample();
        let id = book_identifier(&book);
        assert!(id.starts_with("urn:sha1:"));
        assert_eq!(id, book_identifier(&book));

        let mut named = sample();
        named.metadata.identifier = "digha-nikaya-ru".into();
        assert_eq!(book_identifier(&named), "digha-nikaya-ru");
    }

    #[test]
    fn test_opf_contents() {
        let book = sample();
        let opf = generate_opf(&book, "id-1");
        assert!(opf.contains("<dc:title>Дигха &amp; Никая</dc:title>"));
        assert!(opf.contains("<dc:source>Digha Nikaya</dc:source>"));
        assert!(opf.contains("<itemref idref=\"chapters_dn1_xhtml\"/>"));
        assert!(!opf.contains("<guide>"));
    }

    #[test]
    fn test_ncx_depth_and_nesting() {
        let book = sample();
        let ncx = generate_ncx(&book, "id-1");
        assert!(ncx.contains("<meta name=\"dtb:depth\" content=\"2\"/>"));
        assert!(ncx.contains("playOrder=\"2\""));
        assert!(ncx.contains("<content src=\"chapters/dn1.xhtml\"/>"));
    }

    #[test]
    fn test_href_to_id() {
        assert_eq!(href_to_id("style/style.css"), "style_style_css");
        assert_eq!(href_to_id("1.xhtml"), "item_1_xhtml");
    }
}
