//! Benchmarks for page extraction and book assembly.
//!
//! Run with: cargo bench

use std::hint::black_box;
use std::io::Cursor;

use criterion::{Criterion, criterion_group, criterion_main};

use suttapub::config::preset;
use suttapub::{Assembler, Extractor, PageKey, SourceDocument, SuttaPage, group, write_epub_to_writer};

const CONTENT_ROOT: &str = "https://theravada.ru/Teaching/Canon/Suttanta/Texts/";

/// A page shaped like the long Majjhima suttas: contents, headings,
/// a few hundred paragraphs and a block of footnotes.
fn sample_page(paragraphs: usize) -> String {
    let mut html = String::from(
        r#"<html><body><table><tr><td align="center">
<font size="5">Mūlapariyāya: МН 1 Корень всего сущего</font><font size="3">МН 1</font>
</td></tr><tr><td style="text-align: justify" valign="top">
<font size="2"><a href="#p1">1. Вступление</a><a href="#p2">2. Земля</a></font>
"#,
    );
    for i in 0..paragraphs {
        if i % 25 == 0 {
            html.push_str(&format!("<b>Раздел {i}</b>\n"));
        }
        html.push_str(&format!(
            "<p>Так я слышал. Однажды Благословенный проживал в Уккаттхе<a href=\"#note{i}\">{i}</a>.</p>\n"
        ));
    }
    html.push_str("</td></tr>\n");
    for i in 0..20 {
        html.push_str(&format!(
            "<tr><td><a href=\"#n{i}\">^</a></td><td>{i}</td><td><font color=\"#999966\">Примечание {i}</font></td></tr>\n"
        ));
    }
    html.push_str("<tr><td class=\"bottom\"></td></tr></table></body></html>");
    html
}

fn bench_extract(c: &mut Criterion) {
    let doc = SourceDocument::new("mn1-sv.htm", sample_page(400));
    let extractor = Extractor::new(CONTENT_ROOT);

    c.bench_function("extract_page", |b| {
        b.iter(|| extractor.extract(black_box(&doc)));
    });
}

fn bench_group_and_assemble(c: &mut Criterion) {
    let config = preset("anguttara").expect("anguttara preset");
    let extractor = Extractor::new(CONTENT_ROOT);
    let doc = SourceDocument::new("an1_1-sv.htm", sample_page(10));
    let (fragment, metadata) = extractor.extract(&doc);

    let pages: Vec<SuttaPage> = (1..=200)
        .map(|n| SuttaPage {
            key: PageKey {
                subdivision: Some(1 + n / 50),
                first: n,
                last: n,
                page: 1,
            },
            metadata: metadata.clone(),
            fragment: fragment.clone(),
        })
        .collect();

    c.bench_function("group_blocks", |b| {
        b.iter(|| group(black_box(pages.clone()), &config));
    });

    let chapters = group(pages, &config);
    let assembler = Assembler::for_collection(&config);
    c.bench_function("assemble_and_write", |b| {
        b.iter(|| {
            let book = assembler.assemble(&chapters).expect("assemble");
            let mut out = Cursor::new(Vec::new());
            write_epub_to_writer(&book, &mut out).expect("write");
            out.into_inner().len()
        });
    });
}

criterion_group!(benches, bench_extract, bench_group_and_assemble);
criterion_main!(benches);
