//! Small helpers shared by the pipeline stages.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref WS_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Decode page bytes.
///
/// 1. Valid UTF-8 (BOM handled by encoding_rs) is returned as is
/// 2. Otherwise the hinted encoding label is used
/// 3. Unknown labels fall back to windows-1251, the encoding of the
///    legacy Russian sites
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1251.decode(bytes);
    result
}

/// Collapse whitespace runs into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Remove markup tags, leaving trimmed text.
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").trim().to_string()
}

/// Escape text for inclusion in HTML or XML.
pub fn escape_html(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// Resolve a link target against the URL of the page it appeared on.
/// e.g. resolve_url("https://a.ru/x/y.htm", "../z.htm") -> "https://a.ru/z.htm"
pub fn resolve_url(base: &str, href: &str) -> String {
    if href.contains("://") {
        return href.to_string();
    }

    let (origin, path) = match base.find("://") {
        Some(pos) => {
            let rest = &base[pos + 3..];
            match rest.find('/') {
                Some(i) => (&base[..pos + 3 + i], &rest[i..]),
                None => (base, "/"),
            }
        }
        None => ("", base),
    };

    if let Some(stripped) = href.strip_prefix("//") {
        let scheme = base.split("://").next().unwrap_or("https");
        return format!("{scheme}://{stripped}");
    }
    if href.starts_with('/') {
        return format!("{origin}{href}");
    }

    // Directory part of the base path
    let dir = &path[..path.rfind('/').map(|i| i + 1).unwrap_or(0)];
    let mut components: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();

    let mut rel = href;
    while rel.starts_with("../") || rel.starts_with("./") {
        if let Some(rest) = rel.strip_prefix("../") {
            components.pop();
            rel = rest;
        } else if let Some(rest) = rel.strip_prefix("./") {
            rel = rest;
        }
    }

    if components.is_empty() {
        format!("{origin}/{rel}")
    } else {
        format!("{origin}/{}/{rel}", components.join("/"))
    }
}

/// Detected image format of a cover file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    Svg,
    WebP,
    Binary,
}

impl MediaFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::Gif => "image/gif",
            MediaFormat::Svg => "image/svg+xml",
            MediaFormat::WebP => "image/webp",
            MediaFormat::Binary => "application/octet-stream",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Png => "png",
            MediaFormat::Gif => "gif",
            MediaFormat::Svg => "svg",
            MediaFormat::WebP => "webp",
            MediaFormat::Binary => "bin",
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, MediaFormat::Binary)
    }
}

/// Detect an image format from its file name, falling back to magic bytes.
pub fn detect_media_format(path: &str, data: &[u8]) -> MediaFormat {
    let path_lower = path.to_lowercase();

    if path_lower.ends_with(".jpg") || path_lower.ends_with(".jpeg") {
        return MediaFormat::Jpeg;
    }
    if path_lower.ends_with(".png") {
        return MediaFormat::Png;
    }
    if path_lower.ends_with(".gif") {
        return MediaFormat::Gif;
    }
    if path_lower.ends_with(".svg") {
        return MediaFormat::Svg;
    }
    if path_lower.ends_with(".webp") {
        return MediaFormat::WebP;
    }

    if data.len() >= 4 {
        if data[0] == 0xFF && data[1] == 0xD8 {
            return MediaFormat::Jpeg;
        }
        if data[..4] == [0x89, 0x50, 0x4E, 0x47] {
            return MediaFormat::Png;
        }
        if data[..3] == [0x47, 0x49, 0x46] {
            return MediaFormat::Gif;
        }
        if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return MediaFormat::WebP;
        }
    }

    MediaFormat::Binary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_windows_1251() {
        // "Будда" in windows-1251
        let bytes = [0xC1, 0xF3, 0xE4, 0xE4, 0xE0];
        assert_eq!(decode_text(&bytes, Some("windows-1251")), "Будда");
        assert_eq!(decode_text(&bytes, None), "Будда");
    }

    #[test]
    fn test_decode_utf8_passthrough() {
        let text = "Сутта";
        assert_eq!(decode_text(text.as_bytes(), Some("windows-1251")), "Сутта");
    }

    #[test]
    fn test_strip_tags_and_whitespace() {
        assert_eq!(strip_tags("<p><b>Hi</b> there</p>\n"), "Hi there");
        assert_eq!(collapse_whitespace("  a\n\n b\t c "), "a b c");
    }

    #[test]
    fn test_resolve_url() {
        let base = "https://theravada.ru/Teaching/Canon/Suttanta/";
        assert_eq!(
            resolve_url(base, "Texts/mn1-sv.htm"),
            "https://theravada.ru/Teaching/Canon/Suttanta/Texts/mn1-sv.htm"
        );
        assert_eq!(
            resolve_url("https://theravada.ru/Teaching/Canon/Suttanta/samyutta.htm", "../Texts/sn1_1-sv.htm"),
            "https://theravada.ru/Teaching/Canon/Texts/sn1_1-sv.htm"
        );
        assert_eq!(resolve_url(base, "/index.htm"), "https://theravada.ru/index.htm");
        assert_eq!(resolve_url(base, "http://dhamma.ru/x.htm"), "http://dhamma.ru/x.htm");
        assert_eq!(resolve_url(base, "//cdn.ru/a.htm"), "https://cdn.ru/a.htm");
    }

    #[test]
    fn test_detect_media_format() {
        assert_eq!(detect_media_format("cover.JPG", &[]), MediaFormat::Jpeg);
        assert_eq!(detect_media_format("cover.png", &[]), MediaFormat::Png);
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A];
        assert_eq!(detect_media_format("cover", &png), MediaFormat::Png);
        assert_eq!(detect_media_format("cover", &[1, 2, 3, 4]), MediaFormat::Binary);
        assert_eq!(MediaFormat::Png.mime_type(), "image/png");
    }
}
