//! Turning extracted pages into chapters.
//!
//! Long collections publish one sutta per page; the numerical collections
//! publish very short suttas, often several to a page. [`group`] merges
//! pages according to the collection's [`Grouping`] so every chapter has a
//! readable size. Chapters always partition the input: every page lands in
//! exactly one chapter, in input order.

use tracing::debug;

use crate::config::{BlockRule, CollectionConfig, Grouping};
use crate::dom::{Dom, NodeId, inner_html, parse_fragment};
use crate::model::{Chapter, ChapterHeading, ChapterPart, ContentFragment, PageKey, SuttaPage};

/// Group pages, which must be sorted by [`PageKey`], into chapters.
pub fn group(pages: Vec<SuttaPage>, config: &CollectionConfig) -> Vec<Chapter> {
    let runs = match &config.grouping {
        Grouping::Single => pages.into_iter().map(|p| vec![p]).collect(),
        Grouping::Pages => split_runs(pages, |prev, next| {
            prev.key.subdivision != next.key.subdivision || prev.key.first != next.key.first
        }),
        Grouping::Blocks(rule) => block_runs(pages, rule),
    };

    let chapters: Vec<Chapter> = runs
        .into_iter()
        .filter(|run| !run.is_empty())
        .map(|run| match &config.grouping {
            Grouping::Blocks(_) => block_chapter(run, config),
            _ => sutta_chapter(run, config),
        })
        .collect();

    debug!(collection = %config.name, chapters = chapters.len(), "grouped pages");
    chapters
}

/// Split into runs, starting a new run wherever `breaks(prev, next)` holds.
fn split_runs(
    pages: Vec<SuttaPage>,
    breaks: impl Fn(&SuttaPage, &SuttaPage) -> bool,
) -> Vec<Vec<SuttaPage>> {
    let mut runs: Vec<Vec<SuttaPage>> = Vec::new();
    for page in pages {
        match runs.last_mut() {
            Some(run) if run.last().is_some_and(|prev| !breaks(prev, &page)) => run.push(page),
            _ => runs.push(vec![page]),
        }
    }
    runs
}

/// Whether a block that started at `start` closes after `page`.
pub fn closes_block(rule: &BlockRule, start: u32, page: &PageKey, next: Option<&PageKey>) -> bool {
    let Some(next) = next else {
        return true;
    };
    let block = rule.block_size.max(1);
    let following = page.last.saturating_add(1);

    if following % block == start % block {
        return true;
    }
    if next.subdivision != page.subdivision {
        return true;
    }
    if let Some(span) = rule.range_span
        && page.is_range()
        && !next.is_range()
        && page.last.saturating_sub(start) > span
    {
        return true;
    }
    rule.break_on_gap && next.first != following
}

fn block_runs(pages: Vec<SuttaPage>, rule: &BlockRule) -> Vec<Vec<SuttaPage>> {
    let keys: Vec<PageKey> = pages.iter().map(|p| p.key.clone()).collect();
    let mut runs = Vec::new();
    let mut current: Vec<SuttaPage> = Vec::new();

    for (i, page) in pages.into_iter().enumerate() {
        let start = current.first().map(|p| p.key.first).unwrap_or(page.key.first);
        let close = closes_block(rule, start, &keys[i], keys.get(i + 1));
        current.push(page);
        if close {
            runs.push(std::mem::take(&mut current));
        }
    }
    runs
}

fn part(page: SuttaPage) -> ChapterPart {
    ChapterPart {
        metadata: page.metadata,
        fragment: page.fragment,
    }
}

/// One sutta, possibly spread over several pages.
fn sutta_chapter(run: Vec<SuttaPage>, config: &CollectionConfig) -> Chapter {
    let key = run[0].key.clone();
    let metadata = run[0].metadata.clone();

    let label = match key.subdivision {
        Some(sub) => format!("{sub}.{}", range_label(key.first, key.last)),
        None => range_label(key.first, key.last),
    };
    let file_stem = match key.subdivision {
        Some(sub) => format!("{}{sub}_{}", config.code, range_label(key.first, key.last)),
        None => format!("{}{}", config.code, key.first),
    };
    let name = if metadata.original_title.is_empty() {
        &metadata.translated_title
    } else {
        &metadata.original_title
    };

    Chapter {
        title: format!("{label}. {name}"),
        file_name: format!("{file_stem}.xhtml"),
        heading: ChapterHeading {
            original: metadata.original_title.clone(),
            translated: metadata.translated_title.clone(),
            number: metadata
                .number
                .clone()
                .unwrap_or_else(|| format!("{} {label}", config.local_code)),
        },
        parts: run.into_iter().map(part).collect(),
        part_titles: false,
        subdivision: key.subdivision,
        first: key.first,
        last: key.last,
    }
}

/// Several short suttas merged into one chapter.
fn block_chapter(run: Vec<SuttaPage>, config: &CollectionConfig) -> Chapter {
    let subdivision = run[0].key.subdivision;
    let first = run[0].key.first;
    let last = run.iter().map(|p| p.key.last).max().unwrap_or(first);
    let range = range_label(first, last);
    let suttas = if first == last {
        format!("Сутта {range}")
    } else {
        format!("Сутты {range}")
    };

    let (original, number, file_stem) = match subdivision {
        Some(sub) => (
            config
                .subdivision_name(sub)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} {sub}", config.local_code)),
            format!("{} {sub}.{range}", config.local_code),
            format!("{}{sub}_{range}", config.code),
        ),
        None => (
            config.book.title.clone(),
            format!("{} {range}", config.local_code),
            format!("{}_{range}", config.code),
        ),
    };

    let mut removed = 0;
    let parts = run
        .into_iter()
        .map(|page| {
            let mut chapter_part = part(page);
            removed += collapse_fragment(&mut chapter_part.fragment);
            chapter_part
        })
        .collect();
    if removed > 0 {
        debug!(chapter = %file_stem, removed, "collapsed nested wrappers");
    }

    Chapter {
        title: suttas.clone(),
        file_name: format!("{file_stem}.xhtml"),
        heading: ChapterHeading {
            original,
            translated: suttas,
            number,
        },
        parts,
        part_titles: true,
        subdivision,
        first,
        last,
    }
}

fn range_label(first: u32, last: u32) -> String {
    if last > first {
        format!("{first}-{last}")
    } else {
        first.to_string()
    }
}

/// Collapse redundant wrappers in every block. Returns the number of
/// removed elements.
pub fn collapse_fragment(fragment: &mut ContentFragment) -> usize {
    let mut removed = 0;
    for block in &mut fragment.blocks {
        let (html, count) = collapse_html(&block.html);
        if count > 0 {
            block.html = html;
            removed += count;
        }
    }
    removed
}

/// Collapse `span>span>span`, `div>div` and `font>font>font` chains in an
/// HTML fragment.
pub fn collapse_html(html: &str) -> (String, usize) {
    let (mut dom, body) = parse_fragment(html);
    let removed = collapse_wrappers(&mut dom, body);
    if removed == 0 {
        return (html.to_string(), 0);
    }
    (inner_html(&dom, body), removed)
}

/// The single element child of `id` when it has tag `tag` and every other
/// child is blank text.
fn sole_child(dom: &Dom, id: NodeId, tag: &str) -> Option<NodeId> {
    let mut found = None;
    for child in dom.children(id) {
        if dom.is_blank_text(child) {
            continue;
        }
        if found.is_some() || !dom.has_tag(child, tag) {
            return None;
        }
        found = Some(child);
    }
    found
}

/// Unwrap nested duplicate wrappers below `root` until none remain.
pub fn collapse_wrappers(dom: &mut Dom, root: NodeId) -> usize {
    let mut removed = 0;
    loop {
        let mut changed = false;
        let nodes: Vec<NodeId> = dom.descendants(root).collect();
        for id in nodes {
            if !dom.is_ancestor(root, id) {
                continue;
            }
            if dom.has_tag(id, "span")
                && sole_child(dom, id, "span").is_some_and(|inner| sole_child(dom, inner, "span").is_some())
            {
                dom.unwrap(id);
            } else if dom.has_tag(id, "div") && sole_child(dom, id, "div").is_some() {
                dom.unwrap(id);
            } else if dom.has_tag(id, "font")
                && let Some(innermost) =
                    sole_child(dom, id, "font").and_then(|inner| sole_child(dom, inner, "font"))
            {
                dom.unwrap(innermost);
            } else {
                continue;
            }
            removed += 1;
            changed = true;
        }
        if !changed {
            return removed;
        }
    }
}
