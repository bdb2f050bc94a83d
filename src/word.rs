use crate::error::{DleError, Result, StructuralError};
use crate::node::{self, DLE_MAIN_URL, ParsedNode};
use scraper::ElementRef;
use serde_json::Value;
use std::fmt;

/// A word that refers to another dictionary entry.
///
/// The source renders references two ways: a real `<a href>` link (active)
/// or a `<mark data-id>` highlight that is still searchable (inactive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    html: String,
    parent_href: String,
    text: String,
    href: Option<String>,
    is_active_link: bool,
}

impl Word {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_parent(html, "")
    }

    /// Parses a word, completing non-rooted anchors with `parent_href`.
    pub fn from_html_with_parent(html: &str, parent_href: &str) -> Result<Self> {
        let dom = node::fragment(html)?;
        let mut word = Self::from_element(node::first_element(&dom)?, parent_href)?;
        word.html = html.to_string();
        Ok(word)
    }

    pub fn try_from_html(html: &str) -> Option<Self> {
        Self::from_html(html).ok()
    }

    /// Recognises, in priority order, a `<mark data-id>`, an `<a href>` and a
    /// `<span>` with class `u` or a `data-id`. Superscripts never count as text.
    pub fn from_element(el: ElementRef<'_>, parent_href: &str) -> Result<Self> {
        let (text, href, is_active_link) = if let Some(mark) = node::find_first(el, "mark") {
            let id = mark
                .value()
                .attr("data-id")
                .ok_or(StructuralError::MissingAttribute {
                    element: "mark",
                    attribute: "data-id",
                })?;
            (
                node::text_skipping(mark, &["sup"]),
                Some(format!("/?id={}", id)),
                false,
            )
        } else if let Some((anchor, href)) = node::find_first(el, "a")
            .and_then(|a| a.value().attr("href").map(|href| (a, href)))
        {
            let href = if href.is_empty() || href.starts_with('/') {
                href.to_string()
            } else {
                format!("/{}{}", parent_href, href)
            };
            (
                node::text_skipping(anchor, &["sup"]).trim().to_string(),
                Some(href).filter(|h| !h.is_empty()),
                true,
            )
        } else if let Some(span) = node::find_first(el, "span").filter(|span| {
            node::first_class(span).is_some_and(|c| c.eq_ignore_ascii_case("u"))
                || span.value().attr("data-id").is_some()
        }) {
            (node::text_skipping(span, &["sup"]), None, false)
        } else {
            return Err(DleError::unrecognized_word(&el.html()));
        };

        Ok(Word {
            html: el.html(),
            parent_href: parent_href.to_string(),
            text,
            href,
            is_active_link,
        })
    }

    pub(crate) fn classify(el: ElementRef<'_>, parent_href: &str) -> Option<Self> {
        Self::from_element(el, parent_href).ok()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Site-relative reference, always starting with `/`.
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    pub fn is_active_link(&self) -> bool {
        self.is_active_link
    }

    /// Absolute URL of the referenced search, empty when there is no reference.
    pub fn link(&self) -> String {
        self.href
            .as_ref()
            .map(|href| format!("{}{}", DLE_MAIN_URL, href))
            .unwrap_or_default()
    }
}

impl ParsedNode for Word {
    fn html(&self) -> &str {
        &self.html
    }

    fn set_html(&mut self, html: &str) -> Result<()> {
        *self = Self::from_html_with_parent(html, &self.parent_href)?;
        Ok(())
    }

    fn to_dict(&self, extended: bool) -> Value {
        let mut dict = node::base_dict(&self.html, extended);
        dict.insert("text".to_string(), Value::from(self.text.as_str()));
        if self.is_active_link || extended {
            dict.insert("link".to_string(), Value::from(self.link()));
        }
        if extended {
            dict.insert(
                "is_active_link".to_string(),
                Value::from(self.is_active_link),
            );
        }
        Value::Object(dict)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mark_is_inactive_reference() {
        let word = Word::from_html(r#"<mark data-id="12345">casa</mark>"#).unwrap();
        assert_eq!(word.text(), "casa");
        assert!(!word.is_active_link());
        assert_eq!(word.href(), Some("/?id=12345"));
        assert_eq!(word.link(), "https://dle.rae.es/?id=12345");
        assert_eq!(word.to_dict(false), json!({"text": "casa"}));
    }

    #[test]
    fn test_rooted_anchor_is_active_link() {
        let word = Word::from_html(r#"<a href="/abajo">abajo</a>"#).unwrap();
        assert_eq!(word.text(), "abajo");
        assert!(word.is_active_link());
        assert_eq!(word.href(), Some("/abajo"));
        assert_eq!(
            word.to_dict(false),
            json!({"text": "abajo", "link": "https://dle.rae.es/abajo"})
        );
    }

    #[test]
    fn test_relative_anchor_uses_parent_context() {
        let word = Word::from_html_with_parent(r#"<a href="otraref">x</a>"#, "ctx/").unwrap();
        assert_eq!(word.href(), Some("/ctx/otraref"));

        let mut word = word;
        word.set_html(r#"<a href="otra">y</a>"#).unwrap();
        assert_eq!(word.href(), Some("/ctx/otra"));
    }

    #[test]
    fn test_superscripts_are_stripped() {
        let word = Word::from_html(r#"<a href="/bajo">bajo<sup>1</sup></a>"#).unwrap();
        assert_eq!(word.text(), "bajo");
    }

    #[test]
    fn test_plain_span_word_has_no_link() {
        let word = Word::from_html(r#"<span class="u">enferma</span>"#).unwrap();
        assert_eq!(word.text(), "enferma");
        assert_eq!(word.href(), None);
        assert!(!word.is_active_link());
        assert_eq!(word.link(), "");

        let word = Word::from_html(r#"<span data-id="77">tal</span>"#).unwrap();
        assert_eq!(word.text(), "tal");
    }

    #[test]
    fn test_unrecognized_markup_fails() {
        let err = Word::from_html(r#"<span class="h">ejemplo</span>"#).unwrap_err();
        assert!(matches!(err, DleError::AmbiguousMarkup(_)));
        assert!(Word::try_from_html("<i>nada</i>").is_none());
    }

    #[test]
    fn test_mark_takes_priority_over_anchor() {
        let word =
            Word::from_html(r#"<span><a href="/x">x</a><mark data-id="9">y</mark></span>"#)
                .unwrap();
        assert_eq!(word.text(), "y");
        assert!(!word.is_active_link());
    }
}
