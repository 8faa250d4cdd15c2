//! Title and number of a sutta page.

use lazy_static::lazy_static;
use regex::Regex;

use crate::dom::{Dom, NodeId};
use crate::model::SuttaMetadata;
use crate::util::collapse_whitespace;

lazy_static! {
    /// Collection code and sutta number inside a title, e.g. "МН 1", "АН 4.17".
    static ref TITLE_NUMBER_RE: Regex =
        Regex::new(r"\b\p{Lu}{2,3}\s\d+(?:\.\d+)?(?:[-–]\d+)?").unwrap();
}

pub const UNTITLED: &str = "Untitled";

/// First `<font size=N>` in document order.
fn find_font(dom: &Dom, size: &str) -> Option<NodeId> {
    dom.descendants(dom.document())
        .find(|&id| dom.has_tag(id, "font") && dom.attr(id, "size").map(str::trim) == Some(size))
}

/// Parse titles and number from the page heading.
///
/// The heading is the first `<font size=5>` (or `<font size=6>`) and looks
/// like `Pali: Russian`. The number comes from the following
/// `<font size=3>`, or failing that, from the heading itself.
pub fn extract_metadata(dom: &Dom) -> SuttaMetadata {
    let Some(title_node) = find_font(dom, "5").or_else(|| find_font(dom, "6")) else {
        return SuttaMetadata {
            original_title: UNTITLED.to_string(),
            translated_title: UNTITLED.to_string(),
            number: None,
        };
    };

    let raw = dom.text_content(title_node).replace(['\n', '\r'], "");
    let title = raw.trim();

    let parts: Vec<&str> = title.split(": ").collect();
    let (original, translated) = match parts.as_slice() {
        [original, translated] => (original.trim().to_string(), strip_number(translated)),
        _ => (title.to_string(), title.to_string()),
    };

    let number = following_number(dom, title_node).or_else(|| {
        TITLE_NUMBER_RE
            .find(title)
            .map(|m| collapse_whitespace(m.as_str()))
    });

    SuttaMetadata {
        original_title: original,
        translated_title: translated,
        number,
    }
}

fn strip_number(title: &str) -> String {
    collapse_whitespace(&TITLE_NUMBER_RE.replace_all(title, ""))
}

/// Text of the next `<font size=3>` after `title_node`, if it is a valid
/// sutta number.
fn following_number(dom: &Dom, title_node: NodeId) -> Option<String> {
    let candidate = dom
        .descendants(dom.document())
        .skip_while(|&id| id != title_node)
        .skip(1)
        .find(|&id| dom.has_tag(id, "font") && dom.attr(id, "size").map(str::trim) == Some("3"))?;
    SuttaMetadata::normalize_number(&dom.text_content(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;

    #[test]
    fn test_split_title_and_number_from_heading() {
        let dom = parse_document(
            r#"<font size="5">Mūlapariyāya: МН 1 Корень всего сущего</font>"#,
        );
        let meta = extract_metadata(&dom);
        assert_eq!(meta.original_title, "Mūlapariyāya");
        assert_eq!(meta.translated_title, "Корень всего сущего");
        assert_eq!(meta.number.as_deref(), Some("МН 1"));
    }

    #[test]
    fn test_number_from_following_font() {
        let dom = parse_document(
            r#"<font size="4"><i>Intro</i></font>
               <font size="6">Satipaṭṭhāna: Основы
осознанности<br><font size="3">МН 10</font></font>"#,
        );
        let meta = extract_metadata(&dom);
        assert_eq!(meta.original_title, "Satipaṭṭhāna");
        assert_eq!(meta.translated_title, "Основыосознанности");
        assert_eq!(meta.number.as_deref(), Some("МН 10"));
    }

    #[test]
    fn test_invalid_following_number_falls_back_to_title() {
        let dom = parse_document(
            r#"<font size="5">Kosala: СН 3.1 Молодой</font><font size="3">перевод SV</font>"#,
        );
        let meta = extract_metadata(&dom);
        assert_eq!(meta.number.as_deref(), Some("СН 3.1"));
        assert_eq!(meta.translated_title, "Молодой");
    }

    #[test]
    fn test_without_colon() {
        let dom = parse_document(r#"<font size="5">Сутта о корне</font>"#);
        let meta = extract_metadata(&dom);
        assert_eq!(meta.original_title, "Сутта о корне");
        assert_eq!(meta.translated_title, "Сутта о корне");
        assert_eq!(meta.number, None);
    }

    #[test]
    fn test_untitled() {
        let dom = parse_document("<p>no heading</p>");
        let meta = extract_metadata(&dom);
        assert_eq!(meta.original_title, UNTITLED);
        assert_eq!(meta.translated_title, UNTITLED);
    }
}
