//! Source page discovery.
//!
//! Turns a collection's listing page into the ordered list of sutta page
//! URLs, following subdivision index pages and probing for the extra pages
//! of long suttas where the collection needs it.

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{CollectionConfig, Listing, compile};
use crate::dom::parse_document;
use crate::error::Result;
use crate::fetch::{Fetcher, PageClient, cache_file_name};
use crate::model::PageKey;
use crate::util::resolve_url;

/// Marker of the first page of a multi-page sutta.
const FIRST_PAGE_MARKER: &str = "-01-";

/// Lists the source pages of one collection.
pub struct SourceLocator<'a, C> {
    fetcher: &'a Fetcher<C>,
    config: &'a CollectionConfig,
}

impl<'a, C: PageClient> SourceLocator<'a, C> {
    pub fn new(fetcher: &'a Fetcher<C>, config: &'a CollectionConfig) -> Self {
        Self { fetcher, config }
    }

    /// Ordered, de-duplicated page URLs for the collection.
    ///
    /// A listing page that cannot be fetched contributes nothing; only an
    /// invalid link pattern is an error.
    pub fn list_sources(&self) -> Result<Vec<String>> {
        let pattern = self.config.link_regex()?;

        let urls = match &self.config.listing {
            Listing::Flat => self.list_links(&self.config.listing_url, &pattern),
            Listing::Paged => {
                let listed = self.list_links(&self.config.listing_url, &pattern);
                self.expand_pages(listed)
            }
            Listing::Nested { index_pattern } => {
                let index_pattern = compile(index_pattern)?;
                let indexes = self.list_links(&self.config.listing_url, &index_pattern);
                debug!(count = indexes.len(), "subdivision index pages");
                let mut urls = Vec::new();
                for index in &indexes {
                    urls.extend(self.list_links(index, &pattern));
                }
                urls
            }
        };

        let urls = dedup_pages(urls);
        info!(
            collection = %self.config.name,
            count = urls.len(),
            "listed source pages"
        );
        Ok(urls)
    }

    /// Links on `page_url` that look like pages matched by `pattern`.
    fn list_links(&self, page_url: &str, pattern: &Regex) -> Vec<String> {
        let doc = self.fetcher.fetch(page_url);
        if doc.is_empty() {
            warn!(url = page_url, "listing page unavailable");
            return Vec::new();
        }

        let dom = parse_document(&doc.text);
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for a in dom.find_all_tags(dom.document(), "a") {
            let Some(href) = dom.attr(a, "href").map(str::trim) else {
                continue;
            };
            if !href.to_ascii_lowercase().ends_with(".htm") || !pattern.is_match(href) {
                continue;
            }
            let url = self.rewrite(resolve_url(&self.config.site_root, href));
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }
        debug!(url = page_url, count = links.len(), "listing links");
        links
    }

    fn rewrite(&self, mut url: String) -> String {
        for rewrite in &self.config.path_rewrites {
            if url.contains(&rewrite.from) {
                url = url.replace(&rewrite.from, &rewrite.to);
            }
        }
        url
    }

    /// Insert the continuation pages of every multi-page sutta right after
    /// its first page.
    fn expand_pages(&self, listed: Vec<String>) -> Vec<String> {
        let mut urls = Vec::with_capacity(listed.len());
        for url in listed {
            let is_first = url.contains(FIRST_PAGE_MARKER);
            urls.push(url.clone());
            if is_first {
                let found = self.discover_pages(&url);
                debug!(url = %url, extra = found.len(), "discovered continuation pages");
                urls.extend(found);
            }
        }
        urls
    }

    /// Probe `-02-`, `-03-`, ... until the first page that does not exist.
    pub fn discover_pages(&self, first_page: &str) -> Vec<String> {
        let mut pages = Vec::new();
        let mut number = 2;
        loop {
            let candidate = first_page.replacen(FIRST_PAGE_MARKER, &format!("-{number:02}-"), 1);
            if !self.page_exists(&candidate) {
                break;
            }
            pages.push(candidate);
            number += 1;
        }
        pages
    }

    fn page_exists(&self, url: &str) -> bool {
        if self.fetcher.options().offline {
            return self
                .fetcher
                .options()
                .cache_dir
                .join(cache_file_name(url))
                .is_file();
        }
        self.fetcher.client().probe(url)
    }
}

/// Drop repeated URLs and repeated links to the same sutta page, keeping
/// the first occurrence.
fn dedup_pages(urls: Vec<String>) -> Vec<String> {
    let mut seen_urls = HashSet::new();
    let mut seen_keys = HashSet::new();
    urls.into_iter()
        .filter(|url| {
            if !seen_urls.insert(url.clone()) {
                return false;
            }
            match PageKey::parse(&cache_file_name(url)) {
                Some(key) => seen_keys.insert(key),
                None => true,
            }
        })
        .collect()
}
