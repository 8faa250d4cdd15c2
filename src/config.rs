//! Per-collection configuration.
//!
//! Everything that differs between the Digha, Majjhima, Samyutta and
//! Anguttara books lives here as data: where the listing page is, which
//! links count as sutta pages, how pages are grouped into chapters and how
//! the table of contents is laid out. Built-in presets cover the four
//! collections; a TOML file can override them or add new ones.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const SITE_ROOT: &str = "https://theravada.ru/Teaching/Canon/Suttanta/";
pub const CONTENT_ROOT: &str = "https://theravada.ru/Teaching/Canon/Suttanta/Texts/";
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

/// How the listing page leads to sutta pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Listing {
    /// The listing page links directly to every sutta page.
    Flat,
    /// Like `Flat`, but long suttas are split into `-01-`, `-02-`, ...
    /// pages and only the first one is linked.
    Paged,
    /// The listing page links to subdivision index pages (matched by
    /// `index_pattern`), which in turn link to the sutta pages.
    Nested { index_pattern: String },
}

/// Textual replacement applied to every discovered URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRewrite {
    pub from: String,
    pub to: String,
}

/// When a run of short suttas is closed into one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockRule {
    pub block_size: u32,
    /// Close after a range page when the next page is a single sutta and
    /// the group already spans more than this many numbers.
    pub range_span: Option<u32>,
    /// Close on any numbering gap between consecutive pages.
    pub break_on_gap: bool,
}

impl Default for BlockRule {
    fn default() -> Self {
        Self {
            block_size: 10,
            range_span: Some(9),
            break_on_gap: false,
        }
    }
}

/// How extracted pages become chapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Grouping {
    /// One chapter per page.
    Single,
    /// Pages of the same sutta (`dn16-01-`, `dn16-02-`, ...) form one chapter.
    Pages,
    /// Consecutive short suttas are merged into blocks.
    Blocks(BlockRule),
}

/// A top-level part of the table of contents covering a number range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub first: u32,
    pub last: u32,
    /// Sizes of the "Сутты N-M" subgroups. Empty means runs of ten.
    #[serde(default)]
    pub groups: Vec<u32>,
}

impl Section {
    pub fn new(name: impl Into<String>, first: u32, last: u32) -> Self {
        Self {
            name: name.into(),
            first,
            last,
            groups: Vec::new(),
        }
    }

    pub fn with_groups(mut self, groups: Vec<u32>) -> Self {
        self.groups = groups;
        self
    }

    pub fn contains(&self, number: u32) -> bool {
        (self.first..=self.last).contains(&number)
    }

    /// Inclusive number ranges of the subgroups.
    pub fn subgroups(&self) -> Vec<(u32, u32)> {
        let mut ranges = Vec::new();
        let mut start = self.first;
        if self.groups.is_empty() {
            while start <= self.last {
                let end = (start + 9).min(self.last);
                ranges.push((start, end));
                start = end + 1;
            }
        } else {
            for &size in &self.groups {
                if size == 0 || start > self.last {
                    continue;
                }
                let end = (start + size - 1).min(self.last);
                ranges.push((start, end));
                start = end + 1;
            }
            if start <= self.last {
                ranges.push((start, self.last));
            }
        }
        ranges
    }
}

/// Shape of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TocLayout {
    /// One entry per chapter.
    #[default]
    Flat,
    /// Section, then "Сутты N-M" subgroup, then chapters.
    Sections { sections: Vec<Section> },
    /// One entry per subdivision (samyutta, nipata) holding its chapters.
    Subdivisions,
}

/// Book-level metadata and title page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookInfo {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub source: String,
    pub publisher: String,
    pub author: String,
    pub language: String,
    pub translator: Option<String>,
    pub identifier: Option<String>,
}

impl Default for BookInfo {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: String::new(),
            description: String::new(),
            source: String::new(),
            publisher: "theravada.ru".to_string(),
            author: "Buddha".to_string(),
            language: "ru".to_string(),
            translator: None,
            identifier: None,
        }
    }
}

impl BookInfo {
    /// Title as it appears in the package metadata.
    pub fn full_title(&self) -> String {
        if self.subtitle.is_empty() {
            self.title.clone()
        } else {
            format!("{}: {}", self.title, self.subtitle)
        }
    }
}

/// Everything needed to turn one collection into a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default)]
    pub name: String,
    /// File name prefix, e.g. `mn`.
    pub code: String,
    /// Printed collection code, e.g. `МН`.
    pub local_code: String,
    pub listing_url: String,
    #[serde(default = "default_site_root")]
    pub site_root: String,
    #[serde(default = "default_content_root")]
    pub content_root: String,
    /// Regex a link target must contain to count as a sutta page.
    pub link_pattern: String,
    pub listing: Listing,
    #[serde(default)]
    pub path_rewrites: Vec<PathRewrite>,
    /// Display names of subdivisions, keyed by their number.
    #[serde(default)]
    pub subdivisions: BTreeMap<String, String>,
    pub grouping: Grouping,
    #[serde(default)]
    pub toc: TocLayout,
    pub book: BookInfo,
    /// Replaces the built-in stylesheet when set.
    #[serde(default)]
    pub css: Option<String>,
}

fn default_site_root() -> String {
    SITE_ROOT.to_string()
}

fn default_content_root() -> String {
    CONTENT_ROOT.to_string()
}

impl CollectionConfig {
    /// Compiled `link_pattern`.
    pub fn link_regex(&self) -> Result<Regex> {
        compile(&self.link_pattern)
    }

    pub fn subdivision_name(&self, number: u32) -> Option<&str> {
        self.subdivisions.get(&number.to_string()).map(String::as_str)
    }

    /// Check the fields that would otherwise fail halfway through a run.
    pub fn validate(&self) -> Result<()> {
        if self.code.is_empty() {
            return Err(Error::InvalidConfig(format!("{}: empty code", self.name)));
        }
        if self.listing_url.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "{}: empty listing_url",
                self.name
            )));
        }
        compile(&self.link_pattern)?;
        if let Listing::Nested { index_pattern } = &self.listing {
            compile(index_pattern)?;
        }
        if let Grouping::Blocks(rule) = &self.grouping
            && rule.block_size == 0
        {
            return Err(Error::InvalidConfig(format!(
                "{}: block_size must be positive",
                self.name
            )));
        }
        if let TocLayout::Sections { sections } = &self.toc {
            for section in sections {
                if section.first > section.last {
                    return Err(Error::InvalidConfig(format!(
                        "{}: section {:?} has first > last",
                        self.name, section.name
                    )));
                }
            }
        }
        for key in self.subdivisions.keys() {
            if key.parse::<u32>().is_err() {
                return Err(Error::InvalidConfig(format!(
                    "{}: subdivision key {key:?} is not a number",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidConfig(format!("bad pattern {pattern:?}: {e}")))
}

/// A set of collections, built-in presets first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionConfig>,
}

impl Config {
    /// The built-in presets.
    pub fn builtin() -> Self {
        let collections = presets()
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();
        Self { collections }
    }

    /// Parse a TOML document of `[collections.<name>]` tables.
    pub fn from_toml(text: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;
        for (name, collection) in config.collections.iter_mut() {
            if collection.name.is_empty() {
                collection.name = name.clone();
            }
        }
        Ok(config)
    }

    /// Built-in presets, with collections from `path` replacing presets of
    /// the same name.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::builtin();
        if let Some(path) = path {
            let text = std::fs::read_to_string(path)?;
            let overrides = Self::from_toml(&text)?;
            tracing::debug!(path = %path.display(), count = overrides.collections.len(), "loaded collection config");
            config.collections.extend(overrides.collections);
        }
        for collection in config.collections.values() {
            collection.validate()?;
        }
        Ok(config)
    }

    pub fn collection(&self, name: &str) -> Result<&CollectionConfig> {
        self.collections
            .get(name)
            .ok_or_else(|| Error::UnknownCollection(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

/// Fetcher behavior.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub cache_dir: PathBuf,
    /// Serve cached pages without touching the network.
    pub skip_cached: bool,
    /// Never touch the network.
    pub offline: bool,
    pub timeout: Duration,
    pub probe_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            skip_cached: true,
            offline: false,
            timeout: Duration::from_secs(20),
            probe_timeout: Duration::from_secs(10),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl FetchOptions {
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_skip_cached(mut self, skip: bool) -> Self {
        self.skip_cached = skip;
        self
    }
}

/// All built-in collection presets.
pub fn presets() -> Vec<CollectionConfig> {
    vec![digha(), majjhima(), samyutta(), anguttara()]
}

/// Look up one built-in preset by name.
pub fn preset(name: &str) -> Option<CollectionConfig> {
    presets().into_iter().find(|c| c.name == name)
}

fn nested_rewrites() -> Vec<PathRewrite> {
    vec![PathRewrite {
        from: "/Canon/Texts/".to_string(),
        to: "/Canon/Suttanta/Texts/".to_string(),
    }]
}

fn numbered(names: &[&str]) -> BTreeMap<String, String> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| ((i + 1).to_string(), name.to_string()))
        .collect()
}

fn digha() -> CollectionConfig {
    CollectionConfig {
        name: "digha".to_string(),
        code: "dn".to_string(),
        local_code: "ДН".to_string(),
        listing_url: format!("{SITE_ROOT}digha.htm"),
        site_root: default_site_root(),
        content_root: default_content_root(),
        link_pattern: "dn[0-9]+".to_string(),
        listing: Listing::Paged,
        path_rewrites: Vec::new(),
        subdivisions: BTreeMap::new(),
        grouping: Grouping::Pages,
        toc: TocLayout::Flat,
        book: BookInfo {
            title: "Дигха Никая".to_string(),
            subtitle: "Длинные проповеди Будды".to_string(),
            description: "Russian translation of Long Discourses of the Buddha".to_string(),
            source: "Digha Nikaya of Pali Canon".to_string(),
            translator: Some("Перевод с палийского: SV".to_string()),
            identifier: Some("digha-nikaya-ru".to_string()),
            ..BookInfo::default()
        },
        css: None,
    }
}

fn majjhima() -> CollectionConfig {
    CollectionConfig {
        name: "majjhima".to_string(),
        code: "mn".to_string(),
        local_code: "МН".to_string(),
        listing_url: format!("{SITE_ROOT}majjhima.htm"),
        site_root: default_site_root(),
        content_root: default_content_root(),
        link_pattern: "mn[0-9]+".to_string(),
        listing: Listing::Flat,
        path_rewrites: Vec::new(),
        subdivisions: BTreeMap::new(),
        grouping: Grouping::Single,
        toc: TocLayout::Sections {
            sections: vec![
                Section::new("Коренной раздел", 1, 50),
                Section::new("Срединный раздел", 51, 100),
                Section::new("Последний раздел", 101, 152).with_groups(vec![10, 10, 10, 12, 10]),
            ],
        },
        book: BookInfo {
            title: "Маджхима Никая".to_string(),
            subtitle: "«Средние проповеди Будды»".to_string(),
            description: "Russian translation of Middle Length Discourses of the Buddha"
                .to_string(),
            source: "Majjhima Nikaya by Bodhi & Nyanamoli".to_string(),
            translator: Some("Перевод с английского: SV".to_string()),
            identifier: Some("majjhima-nikaya-ru".to_string()),
            ..BookInfo::default()
        },
        css: None,
    }
}

const SAMYUTTAS: &[&str] = &[
    "Дэвата Саньютта – Дэвы",
    "Дэвапутта Саньютта – Молодые дэвы",
    "Косала Саньютта - Косалы",
    "Мара Саньютта - Мара",
    "Бхиккхуни Саньютта - Монахини",
    "Брахма Саньютта - Брахмы",
    "Брахмана Саньютта - Брахманы",
    "Вангиса Саньютта - Вангиса",
    "Вана Саньютта - Лес",
    "Яккха Саньютта - Яккхи",
    "Сакка Саньютта - Сакка",
    "Нидана Саньютта - Причинность",
    "Абхисамая Саньютта - Постижение",
    "Дхату Саньютта - Элементы",
    "Анаматагга Саньютта - Без постижимого начала",
    "Кассапа Саньютта - Кассапа",
    "Лабхасаккара Саньютта - Приобретения и похвала",
    "Рахула Саньютта - Рахула",
    "Лаккхана Саньютта - Лаккхана",
    "Опамма Саньютта - Метафоры",
    "Бхиккху Саньютта - Монахи",
    "Кхандха Саньютта - Совокупности",
    "Радха Саньютта - Радха",
    "Диттхи Саньютта - Воззрения",
    "Окканти Саньютта - Вступление",
    "Уппада Саньютта - Возникновение",
    "Килеса Саньютта - Загрязнения",
    "Сарипутта Саньютта - Сарипутта",
    "Нага Саньютта - Наги",
    "Супанна Саньютта - Супанны",
    "Гандхабба Саньютта - Гандхаббы",
    "Валахака Саньютта - Дэвы облаков",
    "Ваччхаготта Саньютта - Ваччхаготта",
    "Самадхи Саньютта - Сосредоточение",
    "Салаятана Саньютта - Шесть сфер",
    "Ведана Саньютта - Чувство",
    "Матугама Саньютта - Женщины",
    "Джамбукхадака Саньютта - Джамбукхадака",
    "Самандака Саньютта - Самандака",
    "Моггаллана Саньютта - Моггаллана",
    "Читта Саньютта - Домохозяин Читта",
    "Гамани Саньютта - Начальник",
    "Асанкхата Саньютта - Необусловленное",
    "Абьяката Саньютта - Необъявленное",
    "Магга Саньютта - Путь",
    "Бодджханга Саньютта - Факторы просветления",
    "Сатипаттхана Саньютта - Основы осознанности",
    "Индрия Саньютта - Качества",
    "Саммаппадхана Саньютта - Правильные старания",
    "Бала Саньютта - Силы",
    "Иддхипада Саньютта - Основы сверхъестественных сил",
    "Ануруддха Саньютта - Ануруддха",
    "Джхана Саньютта - Джханы",
    "Анапана Саньютта - Дыхание",
    "Сотапатти Саньютта - Вступление в поток",
    "Сачча Саньютта - Истины",
];

const NIPATAS: &[&str] = &[
    "Екака Нипата: Книга Единиц",
    "Дука Нипата - Книга Двух",
    "Тика Нипата: Книга Трёх",
    "Чатукка Нипата: Книга Четырёх",
    "Панчака Нипата: Книга Пяти",
    "Чхакка Нипата: Книга Шести",
    "Саттака Нипата: Книга Семи",
    "Аттхака Нипата: Книга Восьми",
    "Навака Нипата: Книга Девяти",
    "Дасака Нипата: Книга десяти",
    "Екадасака Нипата: Книга Одиннадцати",
];

fn samyutta() -> CollectionConfig {
    CollectionConfig {
        name: "samyutta".to_string(),
        code: "sn".to_string(),
        local_code: "СН".to_string(),
        listing_url: format!("{SITE_ROOT}samyutta.htm"),
        site_root: default_site_root(),
        content_root: default_content_root(),
        link_pattern: "sn[0-9]+".to_string(),
        listing: Listing::Nested {
            index_pattern: "samyutta-[0-9]+".to_string(),
        },
        path_rewrites: nested_rewrites(),
        subdivisions: numbered(SAMYUTTAS),
        grouping: Grouping::Blocks(BlockRule::default()),
        toc: TocLayout::Subdivisions,
        book: BookInfo {
            title: "Саньютта Никая".to_string(),
            subtitle: "Связанные проповеди Будды".to_string(),
            description: "Russian translation of Connected Discourses of the Buddha"
                .to_string(),
            source: "Samyutta Nikaya of Pali Canon".to_string(),
            translator: Some("Перевод с палийского: SV".to_string()),
            identifier: Some("samyutta-nikaya-ru".to_string()),
            ..BookInfo::default()
        },
        css: None,
    }
}

fn anguttara() -> CollectionConfig {
    CollectionConfig {
        name: "anguttara".to_string(),
        code: "an".to_string(),
        local_code: "АН".to_string(),
        listing_url: format!("{SITE_ROOT}anguttara.htm"),
        site_root: default_site_root(),
        content_root: default_content_root(),
        link_pattern: "an[0-9]+".to_string(),
        listing: Listing::Nested {
            index_pattern: "anguttara-[0-9]+".to_string(),
        },
        path_rewrites: nested_rewrites(),
        subdivisions: numbered(NIPATAS),
        grouping: Grouping::Blocks(BlockRule::default()),
        toc: TocLayout::Subdivisions,
        book: BookInfo {
            title: "Ангуттара Никая".to_string(),
            subtitle: "Номерные проповеди Будды".to_string(),
            description: "Russian translation of Numerical Discourses of the Buddha".to_string(),
            source: "Anguttara Nikaya of Pali Canon".to_string(),
            translator: Some("Перевод с палийского: SV".to_string()),
            identifier: Some("anguttara-nikaya-ru".to_string()),
            ..BookInfo::default()
        },
        css: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        let config = Config::builtin();
        let names: Vec<_> = config.names().collect();
        assert_eq!(names, vec!["anguttara", "digha", "majjhima", "samyutta"]);
        for collection in config.collections.values() {
            collection.validate().unwrap();
        }
    }

    #[test]
    fn test_subdivision_names() {
        let sn = preset("samyutta").unwrap();
        assert_eq!(sn.subdivisions.len(), 56);
        assert_eq!(sn.subdivision_name(12), Some("Нидана Саньютта - Причинность"));
        let an = preset("anguttara").unwrap();
        assert_eq!(an.subdivision_name(11), Some("Екадасака Нипата: Книга Одиннадцати"));
        assert_eq!(an.subdivision_name(12), None);
    }

    #[test]
    fn test_majjhima_subgroups() {
        let mn = preset("majjhima").unwrap();
        let TocLayout::Sections { sections } = &mn.toc else {
            panic!("majjhima uses sections");
        };
        let first = sections[0].subgroups();
        assert_eq!(first.len(), 5);
        assert_eq!(first[0], (1, 10));
        assert_eq!(first[4], (41, 50));

        let last = sections[2].subgroups();
        assert_eq!(last, vec![(101, 110), (111, 120), (121, 130), (131, 142), (143, 152)]);
    }

    #[test]
    fn test_uneven_default_subgroups() {
        let section = Section::new("x", 1, 25);
        assert_eq!(section.subgroups(), vec![(1, 10), (11, 20), (21, 25)]);
    }

    #[test]
    fn test_toml_override() {
        let text = r#"
[collections.majjhima]
code = "mn"
local_code = "МН"
listing_url = "http://localhost/majjhima.htm"
link_pattern = "mn[0-9]+"
listing = { mode = "flat" }
grouping = { kind = "single" }

[collections.majjhima.book]
title = "Test"
"#;
        let config = Config::from_toml(text).unwrap();
        let mn = config.collection("majjhima").unwrap();
        assert_eq!(mn.name, "majjhima");
        assert_eq!(mn.listing_url, "http://localhost/majjhima.htm");
        assert_eq!(mn.content_root, CONTENT_ROOT);
        assert_eq!(mn.toc, TocLayout::Flat);
        assert_eq!(mn.book.language, "ru");
    }

    #[test]
    fn test_blocks_grouping_from_toml() {
        let text = r#"
[collections.x]
code = "xn"
local_code = "ХН"
listing_url = "http://localhost/x.htm"
link_pattern = "xn[0-9]+"
listing = { mode = "nested", index_pattern = "x-[0-9]+" }
grouping = { kind = "blocks", block_size = 5 }
toc = { kind = "subdivisions" }
book = { title = "X" }
"#;
        let config = Config::from_toml(text).unwrap();
        let x = config.collection("x").unwrap();
        let Grouping::Blocks(rule) = &x.grouping else {
            panic!("expected block grouping");
        };
        assert_eq!(rule.block_size, 5);
        assert_eq!(rule.range_span, Some(9));
        x.validate().unwrap();
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut mn = preset("majjhima").unwrap();
        mn.link_pattern = "mn[".to_string();
        assert!(matches!(mn.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_collection() {
        let config = Config::builtin();
        assert!(matches!(
            config.collection("khuddaka"),
            Err(Error::UnknownCollection(_))
        ));
    }
}
