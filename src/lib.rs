//! # suttapub
//!
//! Turns the Russian sutta translations published on theravada.ru into
//! EPUB books.
//!
//! The pipeline runs in five stages:
//!
//! - [`SourceLocator`] reads a collection's listing page and produces the
//!   ordered list of sutta page URLs.
//! - [`Fetcher`] downloads each page once, converts it from windows-1251
//!   and keeps it in an on-disk cache.
//! - [`Extractor`] recovers headings, the in-page contents and footnotes
//!   from the legacy table markup.
//! - [`group`] merges pages into chapters of readable size.
//! - [`Assembler`] builds a [`Book`] that [`write_epub`] packages.
//!
//! ## Quick Start
//!
//! ```no_run
//! use suttapub::{Config, FetchOptions, Fetcher, HttpClient, Pipeline, Silent};
//!
//! let config = Config::builtin();
//! let collection = config.collection("majjhima")?;
//! let options = FetchOptions::default().with_cache_dir("cache/majjhima");
//! let fetcher = Fetcher::new(HttpClient::new(&options), options);
//!
//! Pipeline::new(&fetcher, collection).run("majjhima.epub".as_ref(), &mut Silent)?;
//! # Ok::<(), suttapub::Error>(())
//! ```
//!
//! ## Extracting a single page
//!
//! ```
//! use suttapub::{Extractor, SourceDocument};
//!
//! let page = r#"<table><tr><td style="text-align: justify" valign="top">
//!     <p>Так я слышал.</p>
//! </td></tr></table>"#;
//! let (fragment, _) = Extractor::new("https://theravada.ru/")
//!     .extract(&SourceDocument::new("mn1-sv.htm", page));
//! assert_eq!(fragment.to_html(), "<p>Так я слышал.</p>");
//! ```

pub mod align;
pub mod assemble;
pub mod book;
pub mod config;
pub mod dom;
pub mod epub;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod group;
pub mod model;
pub mod pipeline;
pub mod source;
pub(crate) mod util;

pub use align::{AlignSession, Decision, Edit, Outcome, Resolver, auto_align};
pub use assemble::Assembler;
pub use book::{Book, Metadata, Resource, SpineItem, TocEntry};
pub use config::{CollectionConfig, Config, FetchOptions};
pub use epub::{write_epub, write_epub_to_writer};
pub use error::{Error, Result};
pub use extract::Extractor;
pub use fetch::{Fetcher, HttpClient, PageClient};
pub use group::group;
pub use model::{Chapter, ContentFragment, PageKey, SourceDocument, SuttaMetadata, SuttaPage};
pub use pipeline::{Observer, Pipeline, Silent};
pub use source::SourceLocator;
