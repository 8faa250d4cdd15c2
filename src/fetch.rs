//! Page fetching with an on-disk cache.
//!
//! Pages are downloaded once, decoded from windows-1251 and stored as UTF-8
//! files named after the last URL path segment. Every failure is logged and
//! turned into an empty [`SourceDocument`] so one bad page never stops a run.

use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::FetchOptions;
use crate::error::{Error, Result};
use crate::model::SourceDocument;
use crate::util::decode_text;

lazy_static! {
    static ref CHARSET_RE: Regex = Regex::new(r"(?i)windows-1251").unwrap();
}

/// Legacy encoding of the source site.
pub const SOURCE_ENCODING: &str = "windows-1251";

/// Transport used by the fetcher and the source locator.
pub trait PageClient {
    /// Download the body of `url`. Non-success statuses are errors.
    fn get(&self, url: &str) -> Result<Vec<u8>>;

    /// Whether `url` answers with a success status.
    fn probe(&self, url: &str) -> bool;
}

impl<T: PageClient + ?Sized> PageClient for &T {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        (**self).get(url)
    }

    fn probe(&self, url: &str) -> bool {
        (**self).probe(url)
    }
}

/// [`PageClient`] over blocking HTTP.
pub struct HttpClient {
    agent: ureq::Agent,
    probe_agent: ureq::Agent,
    user_agent: String,
}

impl HttpClient {
    pub fn new(options: &FetchOptions) -> Self {
        Self {
            agent: agent_with_timeout(options.timeout),
            probe_agent: agent_with_timeout(options.probe_timeout),
            user_agent: options.user_agent.clone(),
        }
    }

    fn request(&self, agent: &ureq::Agent, url: &str) -> Result<Vec<u8>> {
        let response = agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .header("Accept-Language", "en-US,en;q=0.5")
            .call();

        match response {
            Ok(mut resp) => resp.body_mut().read_to_vec().map_err(|e| Error::Http {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(ureq::Error::StatusCode(code)) => Err(Error::Http {
                url: url.to_string(),
                message: format!("status {code}"),
            }),
            Err(e) => Err(Error::Http {
                url: url.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

fn agent_with_timeout(timeout: std::time::Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    config.into()
}

impl PageClient for HttpClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.request(&self.agent, url)
    }

    fn probe(&self, url: &str) -> bool {
        match self.request(&self.probe_agent, url) {
            Ok(_) => true,
            Err(e) => {
                debug!(url, error = %e, "probe failed");
                false
            }
        }
    }
}

/// Cache file name for a page URL.
///
/// The last path segment, percent-decoded, with `.htm` extended to `.html`.
pub fn cache_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let path = match without_query.find("://") {
        Some(pos) => {
            let rest = &without_query[pos + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("")
        }
        None => without_query,
    };
    let segment = path.rsplit('/').next().unwrap_or("");
    let name = percent_decode_str(segment).decode_utf8_lossy().into_owned();

    if name.is_empty() {
        "index.html".to_string()
    } else if name.ends_with(".htm") {
        format!("{name}l")
    } else if name.ends_with(".html") {
        name
    } else {
        format!("{name}.html")
    }
}

/// Decode a downloaded page and relabel its declared charset.
pub fn normalize_page(bytes: &[u8]) -> String {
    let text = decode_text(bytes, Some(SOURCE_ENCODING));
    CHARSET_RE.replace_all(&text, "utf-8").into_owned()
}

/// Downloads pages through a [`PageClient`], keeping a local copy of each.
pub struct Fetcher<C> {
    client: C,
    options: FetchOptions,
}

impl<C: PageClient> Fetcher<C> {
    pub fn new(client: C, options: FetchOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub fn cache_path(&self, url: &str) -> PathBuf {
        self.options.cache_dir.join(cache_file_name(url))
    }

    /// Return the page for `url`, from the cache when allowed.
    pub fn fetch(&self, url: &str) -> SourceDocument {
        let path = self.cache_path(url);

        if (self.options.skip_cached || self.options.offline) && path.is_file() {
            match fs::read_to_string(&path) {
                Ok(text) => {
                    debug!(url, path = %path.display(), "cache hit");
                    return SourceDocument::new(url, text);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "unreadable cache file"),
            }
        }

        if self.options.offline {
            debug!(url, "offline cache miss");
            return SourceDocument::empty(url);
        }

        let bytes = match self.client.get(url) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url, error = %e, "fetch failed");
                return SourceDocument::empty(url);
            }
        };

        let text = normalize_page(&bytes);
        if let Err(e) = store(&path, &text) {
            warn!(path = %path.display(), error = %e, "could not write cache file");
        }
        SourceDocument::new(url, text)
    }

    /// Download every page not yet cached. Returns the number of pages
    /// that ended up available locally.
    pub fn download_all<'a>(
        &self,
        urls: impl IntoIterator<Item = &'a str>,
        mut on_page: impl FnMut(&str),
    ) -> usize {
        let mut available = 0;
        for url in urls {
            if !self.fetch(url).is_empty() {
                available += 1;
            }
            on_page(url);
        }
        available
    }

    /// Read a page that is already cached, without any network access.
    pub fn cached(&self, url: &str) -> Option<SourceDocument> {
        let path = self.cache_path(url);
        fs::read_to_string(path)
            .ok()
            .map(|text| SourceDocument::new(url, text))
    }
}

fn store(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

/// Read a local page file, decoding legacy encodings.
pub fn read_page_file(path: &Path) -> Result<SourceDocument> {
    let bytes = fs::read(path)?;
    let text = normalize_page(&bytes);
    Ok(SourceDocument::new(path.display().to_string(), text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_file_name() {
        assert_eq!(
            cache_file_name("https://theravada.ru/Teaching/Canon/Suttanta/Texts/mn1-mulapariyaya-sutta-sv.htm"),
            "mn1-mulapariyaya-sutta-sv.html"
        );
        assert_eq!(
            cache_file_name("https://theravada.ru/Texts/dn16-02-sv.htm?x=1"),
            "dn16-02-sv.html"
        );
        assert_eq!(cache_file_name("https://theravada.ru/"), "index.html");
        assert_eq!(cache_file_name("https://theravada.ru/a/page"), "page.html");
    }

    #[test]
    fn test_cache_file_name_percent_decoded() {
        assert_eq!(
            cache_file_name("https://example.org/%D1%81%D1%83%D1%82%D1%82%D0%B0.htm"),
            "сутта.html"
        );
    }

    #[test]
    fn test_normalize_page_relabels_charset() {
        let mut bytes = b"<meta content=\"text/html; charset=Windows-1251\">".to_vec();
        // "Будда"
        bytes.extend_from_slice(&[0xC1, 0xF3, 0xE4, 0xE4, 0xE0]);
        let text = normalize_page(&bytes);
        assert_eq!(text, "<meta content=\"text/html; charset=utf-8\">Будда");
    }
}
