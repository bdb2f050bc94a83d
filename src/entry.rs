use crate::definition::Definition;
use crate::error::{Result, StructuralError};
use crate::lema::{EntryLema, LemaHeader};
use crate::node::{self, ParsedNode};
use crate::sentence::Sentence;
use log::trace;
use scraper::ElementRef;
use serde_json::Value;
use std::fmt;

/// A headword with its ordered definitions and usage notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<L: LemaHeader = EntryLema> {
    html: String,
    lema: L,
    supplementary_info: Vec<Sentence>,
    definitions: Vec<Definition>,
    raw_text: String,
}

impl<L: LemaHeader> Entry<L> {
    /// Parses an entry from a wrapper element whose children are the
    /// header, definitions and notes.
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = node::fragment(html)?;
        let root = node::first_element(&dom)?;
        Self::from_elements(node::element_children(root), html.to_string())
    }

    pub fn try_from_html(html: &str) -> Option<Self> {
        Self::from_html(html).ok()
    }

    /// Builds an entry from a sequence of sibling elements. The first one
    /// recognised as a header becomes the lemma; `li` children whose class
    /// starts with `j` or `m` are definitions and `div` children whose class
    /// starts with `n` are notes.
    pub fn from_elements<'a, I>(children: I, html: String) -> Result<Self>
    where
        I: IntoIterator<Item = ElementRef<'a>>,
    {
        let mut lema: Option<L> = None;
        let mut supplementary_info = Vec::new();
        let mut definitions = Vec::new();
        let mut raw_text = String::new();

        for child in children {
            raw_text.push_str(&node::text_of(child));
            if lema.is_none() {
                if let Some(header) = L::classify(child) {
                    lema = Some(header);
                    continue;
                }
            }
            let class_letter = node::first_class(&child)
                .and_then(|c| c.chars().next())
                .map(|c| c.to_ascii_lowercase());
            match (child.value().name(), class_letter) {
                ("li", Some('j' | 'm')) => definitions.push(Definition::from_element(child)?),
                ("div", Some('n')) => supplementary_info.push(Sentence::from_element(child, &[])),
                (name, _) => trace!("Skipping <{}> inside entry", name),
            }
        }

        let lema = lema.ok_or(StructuralError::MissingLema)?;
        Ok(Entry {
            html,
            lema,
            supplementary_info,
            definitions,
            raw_text,
        })
    }

    pub fn lema(&self) -> &L {
        &self.lema
    }

    pub fn supplementary_info(&self) -> &[Sentence] {
        &self.supplementary_info
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Visible text of everything the entry was built from.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Fields shared with [`crate::article::Article`], which lays them out
    /// alongside its own.
    pub(crate) fn dict_fields(&self, extended: bool) -> Vec<(&'static str, Value)> {
        vec![
            ("lema", self.lema.to_dict(extended)),
            (
                "supplementary_info",
                Value::Array(
                    self.supplementary_info
                        .iter()
                        .map(|s| s.to_dict(extended))
                        .collect(),
                ),
            ),
            (
                "definitions",
                Value::Array(
                    self.definitions
                        .iter()
                        .map(|d| d.to_dict(extended))
                        .collect(),
                ),
            ),
        ]
    }
}

impl<L: LemaHeader> ParsedNode for Entry<L> {
    fn html(&self) -> &str {
        &self.html
    }

    fn set_html(&mut self, html: &str) -> Result<()> {
        *self = Self::from_html(html)?;
        Ok(())
    }

    fn to_dict(&self, extended: bool) -> Value {
        let mut dict = node::base_dict(&self.html, extended);
        for (key, value) in self.dict_fields(extended) {
            dict.insert(key.to_string(), value);
        }
        if extended {
            dict.insert("raw_text".to_string(), Value::from(self.raw_text.as_str()));
        }
        Value::Object(dict)
    }
}

impl<L: LemaHeader> fmt::Display for Entry<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DleError;

    const COMPLEX_FORM: &str = r#"<div><h3 class="k5" id="AbC">venirse abajo</h3><li class="m"><div class="c-definitions__item"><div><span class="n_acep">1.</span> <abbr class="d" title="verbo pronominal">prnl.</abbr> Caerse, hundirse.</div></div></li><div class="n2">U. t. en sent. fig.</div><li class="m"><div class="c-definitions__item"><div><span class="n_acep">2.</span> <abbr class="d" title="verbo pronominal">prnl.</abbr> Desanimarse.</div></div></li></div>"#;

    #[test]
    fn test_entry_collects_definitions_and_notes() {
        let entry: Entry = Entry::from_html(COMPLEX_FORM).unwrap();
        assert_eq!(entry.lema().lema(), "venirse abajo");
        assert_eq!(entry.definitions().len(), 2);
        assert_eq!(entry.definitions()[1].index(), 2);
        assert!(entry.definitions()[0].is_verb());
        assert_eq!(entry.supplementary_info().len(), 1);
        assert_eq!(entry.supplementary_info()[0].text(), "U. t. en sent. fig.");
        assert!(entry.raw_text().starts_with("venirse abajo"));
    }

    #[test]
    fn test_only_first_header_is_the_lemma() {
        let entry: Entry =
            Entry::from_html(r#"<div><h3 class="k5">uno</h3><h3 class="k6">dos</h3></div>"#)
                .unwrap();
        assert_eq!(entry.lema().lema(), "uno");
        assert!(entry.definitions().is_empty());
    }

    #[test]
    fn test_missing_lemma_fails() {
        let err = Entry::<EntryLema>::from_html(r#"<div><div class="n2">nota</div></div>"#)
            .unwrap_err();
        assert!(matches!(
            err,
            DleError::Structural(StructuralError::MissingLema)
        ));
    }

    #[test]
    fn test_dict_layout() {
        let entry: Entry = Entry::from_html(COMPLEX_FORM).unwrap();
        let dict = entry.to_dict(false);
        assert_eq!(dict["lema"]["lema"], "venirse abajo");
        assert_eq!(dict["definitions"].as_array().unwrap().len(), 2);
        assert_eq!(dict["supplementary_info"][0]["text"], "U. t. en sent. fig.");
        assert!(dict.get("raw_text").is_none());
        assert!(entry.to_dict(true).get("raw_text").is_some());
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let mut entry: Entry = Entry::from_html(COMPLEX_FORM).unwrap();
        let before = entry.clone();
        entry.reparse().unwrap();
        assert_eq!(entry, before);
    }
}
