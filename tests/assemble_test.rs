use std::io::Read;

use suttapub::config::{BookInfo, TocLayout, preset};
use suttapub::model::BlockKind;
use suttapub::{
    Assembler, Book, ContentFragment, Error, PageKey, SuttaMetadata, SuttaPage, group, write_epub,
};
use tempfile::TempDir;

fn page(first: u32) -> SuttaPage {
    let mut fragment = ContentFragment::new();
    fragment.push(BlockKind::Paragraph, format!("<p>Сутта {first}</p>"), Some(0));
    SuttaPage {
        key: PageKey {
            subdivision: None,
            first,
            last: first,
            page: 1,
        },
        metadata: SuttaMetadata {
            original_title: format!("Pali {first}"),
            translated_title: format!("Перевод {first}"),
            number: Some(format!("МН {first}")),
        },
        fragment,
    }
}

fn majjhima_book(count: u32) -> Book {
    let config = preset("majjhima").unwrap();
    let chapters = group((1..=count).map(page).collect(), &config);
    Assembler::for_collection(&config).assemble(&chapters).unwrap()
}

fn chapter_hrefs(book: &Book) -> Vec<&str> {
    book.spine
        .iter()
        .map(|s| s.href.as_str())
        .filter(|h| h.starts_with("mn"))
        .collect()
}

#[test]
fn test_every_chapter_in_toc_once() {
    let book = majjhima_book(152);
    let leaves: Vec<_> = book.toc_leaves().iter().map(|e| e.href.as_str()).collect();
    assert_eq!(leaves, chapter_hrefs(&book));
    assert_eq!(leaves.len(), 152);
}

#[test]
fn test_majjhima_sections() {
    let book = majjhima_book(152);
    assert_eq!(book.toc.len(), 3);

    let last = &book.toc[2];
    assert_eq!(last.title, "Последний раздел");
    let groups: Vec<_> = last.children.iter().map(|g| g.title.as_str()).collect();
    assert_eq!(
        groups,
        vec![
            "Сутты 101-110",
            "Сутты 111-120",
            "Сутты 121-130",
            "Сутты 131-142",
            "Сутты 143-152"
        ]
    );
    assert_eq!(last.children[3].children.len(), 12);
    assert_eq!(book.toc_depth(), 3);
}

#[test]
fn test_partial_collection_sections() {
    let book = majjhima_book(12);
    assert_eq!(book.toc.len(), 1);
    assert_eq!(book.toc[0].children.len(), 2);
    assert_eq!(book.toc[0].children[1].children.len(), 2);
}

#[test]
fn test_flat_layout() {
    let config = preset("majjhima").unwrap();
    let chapters = group((1..=3).map(page).collect(), &config);
    let book = Assembler::for_collection(&config)
        .with_layout(TocLayout::Flat)
        .assemble(&chapters)
        .unwrap();
    let titles: Vec<_> = book.toc.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["1. Pali 1", "2. Pali 2", "3. Pali 3"]);
}

#[test]
fn test_chapter_document_content() {
    let book = majjhima_book(1);
    let doc = book.get_resource("mn1.xhtml").unwrap();
    let text = String::from_utf8(doc.data.clone()).unwrap();
    assert!(text.starts_with("<?xml"));
    assert!(text.contains("<i>Pali 1</i>:"));
    assert!(text.contains("<font size=\"5\" color=\"brown\">Перевод 1</font>"));
    assert!(text.contains("<p>Сутта 1</p>"));
    assert!(text.contains("href=\"style/style.css\""));
}

#[test]
fn test_custom_css() {
    let config = preset("majjhima").unwrap();
    let chapters = group(vec![page(1)], &config);
    let book = Assembler::for_collection(&config)
        .with_css(Some("p { margin: 0 }".into()))
        .assemble(&chapters)
        .unwrap();
    assert_eq!(
        book.get_resource("style/style.css").unwrap().data,
        b"p { margin: 0 }".to_vec()
    );
}

#[test]
fn test_no_chapters_writes_nothing() {
    let result = Assembler::new(BookInfo::default()).assemble(&[]);
    assert!(matches!(result, Err(Error::NoChapters)));
}

#[test]
fn test_cover_image_added() {
    let dir = TempDir::new().unwrap();
    let cover = dir.path().join("cover.png");
    std::fs::write(&cover, [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();

    let config = preset("majjhima").unwrap();
    let chapters = group(vec![page(1)], &config);
    let book = Assembler::for_collection(&config)
        .with_cover(Some(cover))
        .assemble(&chapters)
        .unwrap();

    assert_eq!(book.metadata.cover_image.as_deref(), Some("cover.png"));
    assert_eq!(book.get_resource("cover.png").unwrap().media_type, "image/png");
    assert_eq!(book.spine[0].href, "cover.xhtml");
    assert!(!book.spine[0].linear);
    assert_eq!(book.spine[1].href, "title.xhtml");
}

#[test]
fn test_written_epub_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("majjhima.epub");
    let book = majjhima_book(3);
    write_epub(&book, &path).unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();

    {
        let mut first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), zip::CompressionMethod::Stored);
        let mut mimetype = String::new();
        first.read_to_string(&mut mimetype).unwrap();
        assert_eq!(mimetype, "application/epub+zip");
    }

    let mut opf = String::new();
    archive
        .by_name("OEBPS/content.opf")
        .unwrap()
        .read_to_string(&mut opf)
        .unwrap();
    assert!(opf.contains("<dc:identifier id=\"BookId\">majjhima-nikaya-ru</dc:identifier>"));
    assert!(opf.contains("<dc:source>Majjhima Nikaya by Bodhi &amp; Nyanamoli</dc:source>"));
    assert!(opf.find("idref=\"title_xhtml\"").unwrap() < opf.find("idref=\"mn1_xhtml\"").unwrap());

    let mut ncx = String::new();
    archive
        .by_name("OEBPS/toc.ncx")
        .unwrap()
        .read_to_string(&mut ncx)
        .unwrap();
    assert!(ncx.contains("<meta name=\"dtb:depth\" content=\"3\"/>"));
    assert!(ncx.contains("<content src=\"mn3.xhtml\"/>"));

    for name in [
        "META-INF/container.xml",
        "OEBPS/nav.xhtml",
        "OEBPS/title.xhtml",
        "OEBPS/style/style.css",
        "OEBPS/mn2.xhtml",
    ] {
        assert!(archive.by_name(name).is_ok(), "missing {name}");
    }
}
