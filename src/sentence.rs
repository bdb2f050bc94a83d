use crate::abbr::Abbr;
use crate::error::Result;
use crate::node::{self, ParsedNode};
use crate::word::Word;
use log::debug;
use scraper::{ElementRef, Node};
use serde_json::Value;
use std::fmt;

/// Regional and subject marks that leak into sentence text as trailing
/// fragments, plus superscript digits that come through as bare text.
pub const UNWANTED_ABBREVIATIONS: [&str; 38] = [
    "And.", "Arg.", "Col.", "C. Rica", "Cuba.", "Ec.", "El Salv.", "Guat.", "Hond.", "León.",
    "Mat.", "Méx.", "Mur.", "Nav.", "Nic.", "Pan.", "Par.", "Perú", "P. Rico.", "R. Dom.",
    "Ur.", "Ven.", "TV.", "Zool.", "Arq.", "Constr.", "Fotogr.", "Geol.", "Ling.", "Métr.",
    "Pint.", "Psiquiatr.", "Teatro.", "1.", "2.", "3.", "4.", "Med.",
];

/// Span classes that carry sentence text even without a `data-id`.
const KEPT_SPAN_CLASSES: [&str; 2] = ["af", "u"];

/// One piece of a sentence, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Abbr(Abbr),
    Word(Word),
    Text(String),
}

impl Component {
    fn to_dict(&self, extended: bool) -> Value {
        match self {
            Component::Abbr(abbr) => abbr.to_dict(extended),
            Component::Word(word) => word.to_dict(extended),
            Component::Text(text) => Value::from(text.as_str()),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Abbr(abbr) => write!(f, "{}", abbr),
            Component::Word(word) => write!(f, "{}", word),
            Component::Text(text) => f.write_str(text),
        }
    }
}

type Classifier = fn(ElementRef<'_>) -> Option<Component>;

fn classify_abbr(el: ElementRef<'_>) -> Option<Component> {
    Abbr::classify(el).map(Component::Abbr)
}

fn classify_word(el: ElementRef<'_>) -> Option<Component> {
    Word::classify(el, "").map(Component::Word)
}

/// Tried in order against every element child; the first hit wins.
const CLASSIFIERS: [Classifier; 2] = [classify_abbr, classify_word];

fn is_unwanted(text: &str) -> bool {
    let text = text.trim();
    UNWANTED_ABBREVIATIONS
        .iter()
        .any(|token| text.ends_with(token))
}

/// A run of text made of plain strings, words and abbreviations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    html: String,
    ignore_tags: Vec<String>,
    components: Vec<Component>,
}

impl Sentence {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_ignoring(html, &[])
    }

    /// Parses a sentence, skipping child elements whose tag is in `ignore_tags`.
    pub fn from_html_ignoring(html: &str, ignore_tags: &[&str]) -> Result<Self> {
        let dom = node::fragment(html)?;
        let mut sentence = Self::from_element(node::first_element(&dom)?, ignore_tags);
        sentence.html = html.to_string();
        Ok(sentence)
    }

    pub fn try_from_html(html: &str) -> Option<Self> {
        Self::from_html(html).ok()
    }

    /// Walks the direct children of `root`. Never fails: unrecognised
    /// elements contribute their visible text.
    pub fn from_element(root: ElementRef<'_>, ignore_tags: &[&str]) -> Self {
        let mut components = Vec::new();
        for child in root.children() {
            match child.value() {
                Node::Text(text) => {
                    if is_unwanted(text) {
                        debug!("Dropping trailing abbreviation fragment {:?}", &**text);
                        continue;
                    }
                    components.push(Component::Text(text.to_string()));
                }
                Node::Element(element) => {
                    if ignore_tags.contains(&element.name()) {
                        continue;
                    }
                    let Some(el) = ElementRef::wrap(child) else {
                        continue;
                    };
                    if element.name() == "span"
                        && element.attr("data-id").is_none()
                        && element.attr("class").is_some()
                        && !node::has_any_class(&el, &KEPT_SPAN_CLASSES)
                    {
                        continue;
                    }
                    match CLASSIFIERS.iter().find_map(|classify| classify(el)) {
                        Some(component) => components.push(component),
                        None => components.push(Component::Text(node::text_of(el))),
                    }
                }
                _ => {}
            }
        }

        Sentence {
            html: root.html(),
            ignore_tags: ignore_tags.iter().map(|t| t.to_string()).collect(),
            components,
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Trimmed concatenation of every component.
    pub fn text(&self) -> String {
        self.components
            .iter()
            .map(Component::to_string)
            .collect::<String>()
            .trim()
            .to_string()
    }
}

impl ParsedNode for Sentence {
    fn html(&self) -> &str {
        &self.html
    }

    fn set_html(&mut self, html: &str) -> Result<()> {
        let ignore_tags = self.ignore_tags.clone();
        let ignore: Vec<&str> = ignore_tags.iter().map(String::as_str).collect();
        *self = Self::from_html_ignoring(html, &ignore)?;
        Ok(())
    }

    fn to_dict(&self, extended: bool) -> Value {
        let mut dict = node::base_dict(&self.html, extended);
        dict.insert("text".to_string(), Value::from(self.text()));
        if extended {
            dict.insert(
                "components".to_string(),
                Value::Array(
                    self.components
                        .iter()
                        .map(|c| c.to_dict(extended))
                        .collect(),
                ),
            );
        }
        Value::Object(dict)
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_concatenates_in_order() {
        let sentence = Sentence::from_html("<p>  En <b>lugar</b> o parte inferior. </p>").unwrap();
        assert_eq!(sentence.text(), "En lugar o parte inferior.");
        assert_eq!(sentence.components().len(), 3);
        assert!(
            sentence
                .components()
                .iter()
                .all(|c| matches!(c, Component::Text(_)))
        );
    }

    #[test]
    fn test_mixed_components_keep_document_order() {
        let html = r#"<span class="h">Vive <mark data-id="X1">abajo</mark>, <abbr title="usado también">U. t.</abbr> <a href="/calle">calle</a>.</span>"#;
        let sentence = Sentence::from_html(html).unwrap();
        let kinds: Vec<&str> = sentence
            .components()
            .iter()
            .map(|c| match c {
                Component::Abbr(_) => "abbr",
                Component::Word(_) => "word",
                Component::Text(_) => "text",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["text", "word", "text", "abbr", "text", "word", "text"]
        );
        assert_eq!(sentence.text(), "Vive abajo, U. t. (usado también) calle.");
    }

    #[test]
    fn test_ignored_tags_are_skipped() {
        let html = r#"<div> Que está <abbr class="d" title="adjetivo">adj.</abbr> debajo.</div>"#;
        let sentence = Sentence::from_html_ignoring(html, &["abbr"]).unwrap();
        assert_eq!(sentence.text(), "Que está  debajo.");
        assert!(
            !sentence
                .components()
                .iter()
                .any(|c| matches!(c, Component::Abbr(_)))
        );
    }

    #[test]
    fn test_decorative_spans_are_skipped_unless_allowed() {
        let html = r#"<div>uno <span class="n_acep">1.</span><span class="af">dos</span> <span>tres</span></div>"#;
        let sentence = Sentence::from_html(html).unwrap();
        assert_eq!(sentence.text(), "uno dos tres");
    }

    #[test]
    fn test_trailing_region_mark_is_dropped() {
        let sentence = Sentence::from_html(r#"<div class="n2">Ú. t. en Arg. y Mur.</div>"#).unwrap();
        assert!(sentence.components().is_empty());
        assert_eq!(sentence.text(), "");

        let sentence =
            Sentence::from_html(r#"<div>Se usa <i>poco</i>. Mur.</div>"#).unwrap();
        assert_eq!(sentence.text(), "Se usa poco");
    }

    #[test]
    fn test_reparse_preserves_ignore_list() {
        let html = r#"<div>a <abbr title="b">b.</abbr> c</div>"#;
        let mut sentence = Sentence::from_html_ignoring(html, &["abbr"]).unwrap();
        let before = sentence.clone();
        sentence.reparse().unwrap();
        assert_eq!(sentence, before);
        assert_eq!(sentence.text(), "a  c");
    }

    #[test]
    fn test_extended_dict_lists_components() {
        let sentence = Sentence::from_html(r#"<p>ver <a href="/bajo">bajo</a></p>"#).unwrap();
        let dict = sentence.to_dict(true);
        assert_eq!(dict["text"], "ver bajo");
        assert_eq!(dict["components"][0], "ver ");
        assert_eq!(dict["components"][1]["text"], "bajo");
        assert_eq!(dict["components"][1]["is_active_link"], true);
        assert!(sentence.to_dict(false).get("components").is_none());
    }
}
