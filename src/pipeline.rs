//! The end-to-end run: locate, fetch, extract, group, assemble, write.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::assemble::Assembler;
use crate::book::Book;
use crate::config::CollectionConfig;
use crate::epub::write_epub;
use crate::error::Result;
use crate::extract::Extractor;
use crate::fetch::{Fetcher, PageClient, cache_file_name};
use crate::group::group;
use crate::model::{PageKey, SuttaPage};
use crate::source::SourceLocator;

/// Progress callbacks. Every method defaults to doing nothing.
pub trait Observer {
    fn sources_listed(&mut self, _count: usize) {}
    fn page_done(&mut self, _url: &str, _blocks: usize) {}
    fn chapters_grouped(&mut self, _count: usize) {}
    fn book_written(&mut self, _path: &Path) {}
}

/// Observer that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Observer for Silent {}

/// One collection run over a fetcher.
pub struct Pipeline<'a, C> {
    fetcher: &'a Fetcher<C>,
    config: &'a CollectionConfig,
    extractor: Extractor,
    cover: Option<PathBuf>,
}

impl<'a, C: PageClient> Pipeline<'a, C> {
    pub fn new(fetcher: &'a Fetcher<C>, config: &'a CollectionConfig) -> Self {
        Self {
            fetcher,
            config,
            extractor: Extractor::new(config.content_root.clone()),
            cover: None,
        }
    }

    pub fn with_cover(mut self, cover: Option<PathBuf>) -> Self {
        self.cover = cover;
        self
    }

    /// Source URLs of the collection, in reading order.
    pub fn sources(&self) -> Result<Vec<String>> {
        SourceLocator::new(self.fetcher, self.config).list_sources()
    }

    /// Fetch and extract every page, sorted by [`PageKey`].
    ///
    /// Pages that could not be fetched, or whose file name carries no
    /// sutta number, are skipped.
    pub fn extract_pages(&self, urls: &[String], observer: &mut dyn Observer) -> Vec<SuttaPage> {
        let mut pages = Vec::with_capacity(urls.len());
        for url in urls {
            let doc = self.fetcher.fetch(url);
            if doc.is_empty() {
                debug!(url = %url, "skipping empty page");
                observer.page_done(url, 0);
                continue;
            }
            let Some(key) = PageKey::parse(&cache_file_name(url)) else {
                warn!(url = %url, "page name carries no sutta number, skipping");
                observer.page_done(url, 0);
                continue;
            };

            let (fragment, metadata) = self.extractor.extract(&doc);
            observer.page_done(url, fragment.len());
            pages.push(SuttaPage {
                key,
                metadata,
                fragment,
            });
        }
        pages.sort_by(|a, b| a.key.cmp(&b.key));
        pages
    }

    /// Run every stage up to, but not including, writing the archive.
    pub fn build(&self, observer: &mut dyn Observer) -> Result<Book> {
        let urls = self.sources()?;
        info!(collection = %self.config.name, sources = urls.len(), "located sources");
        observer.sources_listed(urls.len());

        let pages = self.extract_pages(&urls, observer);
        let chapters = group(pages, self.config);
        observer.chapters_grouped(chapters.len());

        Assembler::for_collection(self.config)
            .with_cover(self.cover.clone())
            .assemble(&chapters)
    }

    /// Build the book and write it to `output`.
    pub fn run(&self, output: &Path, observer: &mut dyn Observer) -> Result<Book> {
        let book = self.build(observer)?;
        write_epub(&book, output)?;
        info!(path = %output.display(), chapters = book.spine.len(), "wrote book");
        observer.book_written(output);
        Ok(book)
    }
}
