use proptest::prelude::*;
use suttapub::model::BlockKind;
use suttapub::{Extractor, SourceDocument};

const CONTENT_ROOT: &str = "https://theravada.ru/Teaching/Canon/Suttanta/Texts/";

const PAGE: &str = r##"<html><head>
<meta http-equiv="Content-Type" content="text/html; charset=utf-8">
</head><body>
<table>
<tr><td align="center">
<font size="5">Mūlapariyāya: МН 1 Корень всего сущего</font>
<font size="3">МН 1</font>
</td></tr>
<tr><td style="text-align: justify" valign="top">
<font size="2"><a href="#part1">1. Вступление</a><a href="#part2"><b>2.1 Земля</b></a></font>
<b>Вступление</b>
<p align="center">Так я слышал</p>
<p><i>Обычный человек</i></p>
<p>Однажды Благословенный проживал<a href="#note3">3</a>.</p>
<div>См. <a href="mn2-sabbasava-sutta-sv.htm">МН 2</a></div>
<br>
</td></tr>
<tr><td><a href="#note3">^</a></td><td>3</td><td><font>Укаттха</font></td></tr>
<tr><td class="bottom"></td></tr>
</table>
</body></html>"##;

fn extract(html: &str) -> (suttapub::ContentFragment, suttapub::SuttaMetadata) {
    Extractor::new(CONTENT_ROOT).extract(&SourceDocument::new("mn1-sv.htm", html))
}

#[test]
fn test_full_page_structure() {
    let (fragment, _) = extract(PAGE);
    let kinds: Vec<BlockKind> = fragment.blocks.iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::Contents,
            BlockKind::Heading(3),
            BlockKind::Heading(3),
            BlockKind::Heading(4),
            BlockKind::Paragraph,
            BlockKind::Paragraph,
            BlockKind::Footnote,
        ]
    );

    assert!(fragment.blocks[1].html.starts_with("<h3>"));
    assert!(fragment.blocks[3].html.starts_with("<h4>"));
    assert!(fragment.blocks[5].html.starts_with("<p>"));
}

#[test]
fn test_page_metadata() {
    let (_, meta) = extract(PAGE);
    assert_eq!(meta.original_title, "Mūlapariyāya");
    assert_eq!(meta.translated_title, "Корень всего сущего");
    assert_eq!(meta.number.as_deref(), Some("МН 1"));
}

#[test]
fn test_contents_rebuilt() {
    let (fragment, _) = extract(PAGE);
    let contents = &fragment.blocks[0].html;
    assert!(contents.starts_with("<font size=\"2\""));
    assert_eq!(contents.matches("<div").count(), 2);
    assert!(contents.contains("href=\"#part1\""));
}

#[test]
fn test_relative_links_made_absolute() {
    let (fragment, _) = extract(PAGE);
    let html = fragment.to_html();
    assert!(html.contains(&format!("href=\"{CONTENT_ROOT}mn2-sabbasava-sutta-sv.htm\"")));
    assert!(html.contains("href=\"#note3\""));
}

#[test]
fn test_footnote_opens_with_back_link() {
    let (fragment, _) = extract(PAGE);
    let notes: Vec<_> = fragment.footnotes().collect();
    assert_eq!(notes.len(), 1);
    let note = &notes[0].html;
    assert!(note.starts_with("<p><font><a href=\"#note3\""));
    assert!(note.contains(">3</a> Укаттха"));
}

#[test]
fn test_missing_cell_falls_back_to_text() {
    let html = "<html><body><div>первый абзац\n\nвторой абзац</div></body></html>";
    let (fragment, meta) = extract(html);
    assert_eq!(fragment.len(), 2);
    assert_eq!(fragment.blocks[0].html, "<p>первый абзац</p>");
    assert!(meta.number.is_none());
}

#[test]
fn test_prose_with_note_marker_is_kept() {
    let html = r##"<table><tr><td style="text-align: justify" valign="top"><font size="2">Так я слышал. Однажды Благословенный пребывал<a href="#n1">1</a> в Саваттхи.</font></td></tr></table>"##;
    let (fragment, _) = extract(html);

    assert_eq!(fragment.len(), 1);
    assert_eq!(fragment.blocks[0].kind, BlockKind::Verbatim);
    let text = &fragment.blocks[0].html;
    assert!(text.contains("Так я слышал"));
    assert!(text.contains("<a href=\"#n1\">1</a> в Саваттхи."));
}

/// One child of the content cell, rendered around a unique marker word.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Paragraph,
    Bold,
    Div,
    Centered,
    Italic,
    NotedFont,
    ContentsFont,
    Break,
}

impl Shape {
    fn render(self, marker: &str) -> String {
        match self {
            Shape::Paragraph => format!("<p>{marker}</p>"),
            Shape::Bold => format!("<b>{marker}</b>"),
            Shape::Div => format!("<div>{marker}</div>"),
            Shape::Centered => format!("<p align=\"center\">{marker}</p>"),
            Shape::Italic => format!("<p><i>{marker}</i></p>"),
            Shape::NotedFont => {
                format!("<font size=\"2\">{marker} text<a href=\"#n1\">1</a> more</font>")
            }
            Shape::ContentsFont => {
                format!("<font size=\"2\"><a href=\"#a1\">1. {marker}</a><br><a href=\"#a2\">2. end</a></font>")
            }
            Shape::Break => "<br>".to_string(),
        }
    }

    fn dropped(self) -> bool {
        matches!(self, Shape::Break)
    }
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    prop_oneof![
        Just(Shape::Paragraph),
        Just(Shape::Bold),
        Just(Shape::Div),
        Just(Shape::Centered),
        Just(Shape::Italic),
        Just(Shape::NotedFont),
        Just(Shape::ContentsFont),
        Just(Shape::Break),
    ]
}

proptest! {
    #[test]
    fn test_output_follows_input_order(
        children in prop::collection::vec((shape_strategy(), "[a-z]{1,8}"), 1..20)
    ) {
        let markers: Vec<String> = children
            .iter()
            .enumerate()
            .map(|(i, (_, w))| format!("n{i}x{w}"))
            .collect();
        let cell: String = children
            .iter()
            .zip(&markers)
            .map(|((shape, _), marker)| shape.render(marker))
            .collect();
        let html = format!(
            r#"<table><tr><td style="text-align: justify" valign="top">{cell}</td></tr></table>"#
        );

        let (fragment, _) = extract(&html);
        let output = fragment.to_html();
        let mut cursor = 0;
        for ((shape, _), marker) in children.iter().zip(&markers) {
            if shape.dropped() {
                continue;
            }
            let found = output[cursor..].find(marker.as_str());
            prop_assert!(found.is_some(), "{} missing or out of order in {}", marker, output);
            cursor += found.unwrap_or(0) + marker.len();
        }

        let indices: Vec<_> = fragment.blocks.iter().filter_map(|b| b.source_index).collect();
        prop_assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }
}
