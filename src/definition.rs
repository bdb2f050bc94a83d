use crate::abbr::Abbr;
use crate::error::{Result, StructuralError};
use crate::node::{self, ParsedNode};
use crate::sentence::Sentence;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node};
use serde_json::{Value, json};
use std::fmt;

static INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\D*$").unwrap());

const ITEM_CLASS: &str = "c-definitions__item";
const FOOTER_CLASS: &str = "c-definitions__item-footer";
const WORD_LIST_CLASS: &str = "c-word-list";

const SYNONYMS_LABEL: &str = "Sin.";
const ANTONYMS_LABEL: &str = "Ant.";
const WORD_LIST_MARKERS: [&str; 2] = ["Sin.:", "Ant.:"];
const SCOPE_TITLE: &str = "Ámbito del sentido";
const IGNORED_ABBREVIATIONS: [&str; 3] = ["", "etc.", "etc.,"];

/// Abbreviation classes re-injected into the main sentence to keep spacing.
const SPACING_ABBR_CLASSES: [&str; 3] = ["d", "g", "c"];

const NOUN_ABBREVIATIONS: [&str; 5] = ["s.", "sust.", "m.", "f.", "m. y f."];
const VERB_ABBREVIATION_MARKS: [&str; 6] = ["part.", "ger.", "pret.", "fut.", "pres.", "infinit."];

/// One numbered sense of a headword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    html: String,
    id: String,
    index: u32,
    category: Abbr,
    first_of_category: bool,
    abbreviations: Vec<Abbr>,
    sentence: Sentence,
    examples: Vec<Sentence>,
    synonyms: Vec<Vec<String>>,
    antonyms: Vec<Vec<String>>,
    raw_text: String,
}

#[derive(Default)]
struct Labelled {
    synonyms: Vec<Vec<String>>,
    antonyms: Vec<Vec<String>>,
}

impl Definition {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = node::fragment(html)?;
        let mut definition = Self::from_element(node::first_element(&dom)?)?;
        definition.html = html.to_string();
        Ok(definition)
    }

    pub fn try_from_html(html: &str) -> Option<Self> {
        Self::from_html(html).ok()
    }

    pub fn from_element(root: ElementRef<'_>) -> Result<Self> {
        let item = node::elements_within(root)
            .find(|e| e.value().name() == "div" && node::has_class(e, ITEM_CLASS))
            .ok_or(StructuralError::MissingDefinitionRoot)?;

        // Pass A: flat scan over every span and abbr.
        let mut index = None;
        let mut category: Option<Abbr> = None;
        let mut first_of_category = false;
        let mut abbreviations = Vec::new();
        let mut examples = Vec::new();
        for el in node::elements_within(root) {
            let class = node::first_class(&el)
                .map(str::to_lowercase)
                .unwrap_or_default();
            match el.value().name() {
                "span" if class == "n_acep" => {
                    if index.is_none() {
                        index = INDEX_RE
                            .captures(&node::text_of(el))
                            .and_then(|caps| caps[1].parse::<u32>().ok());
                    }
                }
                "span" if class == "h" => examples.push(Sentence::from_element(el, &[])),
                "abbr" if category.is_none() => {
                    category = Some(Abbr::from_element(el)?);
                    first_of_category = class == "d";
                }
                "abbr" => {
                    let text = node::text_of(el);
                    if WORD_LIST_MARKERS.contains(&text.as_str())
                        || IGNORED_ABBREVIATIONS.contains(&text.trim())
                        || el.value().attr("title") == Some(SCOPE_TITLE)
                    {
                        continue;
                    }
                    abbreviations.push(Abbr::from_element(el)?);
                }
                _ => {}
            }
        }
        let category = category.ok_or(StructuralError::MissingCategory)?;

        // Pass B: structural walk of the item's children.
        let mut labelled = Labelled::default();
        let mut label = String::new();
        let mut raw_sentence = String::from("<div> ");
        for child in node::element_children(item) {
            if child.value().attr("class").is_some() {
                if node::has_class(&child, FOOTER_CLASS) {
                    collect_word_lists(child, &mut label, &mut labelled);
                }
            } else {
                rebuild_sentence(child, &mut raw_sentence);
            }
        }
        raw_sentence.push_str("</div>");
        debug!("Rebuilt definition sentence markup: {}", raw_sentence);

        let sentence = Sentence::from_html_ignoring(&raw_sentence, &["abbr"])?;

        Ok(Definition {
            html: root.html(),
            id: root.value().id().unwrap_or_default().to_string(),
            index: index.unwrap_or(0),
            category,
            first_of_category,
            abbreviations,
            sentence,
            examples,
            synonyms: labelled.synonyms,
            antonyms: labelled.antonyms,
            raw_text: node::text_of(root).trim().to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ordinal of the sense within its entry, 0 when unnumbered.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Grammatical category: the first abbreviation of the definition.
    pub fn category(&self) -> &Abbr {
        &self.category
    }

    /// Whether the category opens a block of senses sharing it.
    pub fn first_of_category(&self) -> bool {
        self.first_of_category
    }

    /// Usage marks (register, region, subject) that follow the category.
    pub fn abbreviations(&self) -> &[Abbr] {
        &self.abbreviations
    }

    pub fn sentence(&self) -> &Sentence {
        &self.sentence
    }

    pub fn text(&self) -> String {
        self.sentence.text()
    }

    pub fn examples(&self) -> &[Sentence] {
        &self.examples
    }

    pub fn synonyms(&self) -> &[Vec<String>] {
        &self.synonyms
    }

    pub fn antonyms(&self) -> &[Vec<String>] {
        &self.antonyms
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn is_adjective(&self) -> bool {
        self.category.abbr() == "adj."
    }

    pub fn is_adverb(&self) -> bool {
        self.category.abbr() == "adv."
    }

    pub fn is_interjection(&self) -> bool {
        self.category.abbr() == "interj."
    }

    pub fn is_noun(&self) -> bool {
        NOUN_ABBREVIATIONS.contains(&self.category.abbr())
    }

    pub fn is_pronoun(&self) -> bool {
        self.category.abbr() == "pron."
    }

    pub fn is_verb(&self) -> bool {
        self.category.text().to_lowercase().contains("verbo")
            || VERB_ABBREVIATION_MARKS
                .iter()
                .any(|mark| self.category.abbr().contains(mark))
    }
}

/// Reads the synonym/antonym lists of a definition footer. Each list child
/// that is not a label becomes one word group under the last label seen.
fn collect_word_lists(footer: ElementRef<'_>, label: &mut String, labelled: &mut Labelled) {
    for list in node::element_children(footer).filter(|e| node::has_class(e, WORD_LIST_CLASS)) {
        for part in node::element_children(list) {
            if part.value().name() == "div" {
                *label = node::text_of(part).replace(':', "").trim().to_string();
                continue;
            }
            let group = node::leaf_tokens(part);
            if group.is_empty() {
                continue;
            }
            match label.as_str() {
                SYNONYMS_LABEL => labelled.synonyms.push(group),
                ANTONYMS_LABEL => labelled.antonyms.push(group),
                other => debug!("Ignoring word list under label {:?}", other),
            }
        }
    }
}

/// Re-serializes the pieces of a sentence block that belong in the main
/// sentence. Abbreviations are kept only for the whitespace around them.
fn rebuild_sentence(block: ElementRef<'_>, out: &mut String) {
    for child in block.children() {
        let el = match child.value() {
            Node::Text(text) => {
                out.push_str(&node::escape_text(text));
                continue;
            }
            Node::Element(_) => match ElementRef::wrap(child) {
                Some(el) => el,
                None => continue,
            },
            _ => continue,
        };
        match el.value().name() {
            "i" => {
                for part in el.children() {
                    out.push(' ');
                    match ElementRef::wrap(part) {
                        Some(inner) => out.push_str(&node::escape_text(&node::text_of(inner))),
                        None => {
                            if let Some(text) = part.value().as_text() {
                                out.push_str(&node::escape_text(text));
                            }
                        }
                    }
                }
            }
            "a" => {
                for part in el.children() {
                    if let Some(text) = part.value().as_text() {
                        out.push_str(&node::escape_text(text));
                    } else if let Some(inner) = ElementRef::wrap(part).filter(|e| e.value().name() == "i") {
                        out.push_str(&node::escape_text(&node::text_of(inner)));
                    }
                }
            }
            "span" if !node::has_class(&el, "h") => out.push_str(&el.html()),
            "abbr" if node::has_any_class(&el, &SPACING_ABBR_CLASSES) => {
                out.push(' ');
                out.push_str(&el.html());
            }
            _ => {}
        }
    }
}

fn word_groups(groups: &[Vec<String>]) -> Value {
    json!(groups)
}

impl ParsedNode for Definition {
    fn html(&self) -> &str {
        &self.html
    }

    fn set_html(&mut self, html: &str) -> Result<()> {
        *self = Self::from_html(html)?;
        Ok(())
    }

    fn to_dict(&self, extended: bool) -> Value {
        let mut dict = node::base_dict(&self.html, extended);
        if extended {
            dict.insert("id".to_string(), Value::from(self.id.as_str()));
            dict.insert(
                "first_of_category".to_string(),
                Value::from(self.first_of_category),
            );
            dict.insert("raw_text".to_string(), Value::from(self.raw_text.as_str()));
        }
        dict.insert("index".to_string(), Value::from(self.index));
        dict.insert("category".to_string(), self.category.to_dict(extended));
        dict.insert(
            "is".to_string(),
            json!({
                "adjective": self.is_adjective(),
                "adverb": self.is_adverb(),
                "interjection": self.is_interjection(),
                "noun": self.is_noun(),
                "pronoun": self.is_pronoun(),
                "verb": self.is_verb(),
            }),
        );
        dict.insert(
            "abbreviations".to_string(),
            Value::Array(
                self.abbreviations
                    .iter()
                    .map(|a| a.to_dict(extended))
                    .collect(),
            ),
        );
        dict.insert("sentence".to_string(), self.sentence.to_dict(extended));
        dict.insert(
            "examples".to_string(),
            Value::Array(self.examples.iter().map(|e| e.to_dict(extended)).collect()),
        );
        if !self.synonyms.is_empty() {
            dict.insert("synonyms".to_string(), word_groups(&self.synonyms));
        }
        if !self.antonyms.is_empty() {
            dict.insert("antonyms".to_string(), word_groups(&self.antonyms));
        }
        Value::Object(dict)
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {} {}", self.index, self.category.abbr(), self.text())
    }
}
