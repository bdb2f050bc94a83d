//! The parse-once contract shared by every dictionary entity, plus the small
//! set of DOM helpers the classifiers are built from.
//!
//! Entities keep the markup they were built from rather than the DOM itself:
//! `scraper::Html` is not `Send`, and holding only the source text lets any
//! parsed value move freely between threads. Building an entity is two-phase:
//! [`fragment`] (or [`document`]) builds the DOM, then the entity classifies it.

use crate::error::{DleError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use serde_json::{Map, Value};

/// Base URL every relative dictionary link is resolved against.
pub const DLE_MAIN_URL: &str = "https://dle.rae.es";

static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Shared behaviour of all values built from an HTML fragment.
pub trait ParsedNode: Sized {
    /// The markup this value was parsed from.
    fn html(&self) -> &str;

    /// Replaces the source markup and rebuilds the whole value from it.
    ///
    /// On failure the previous value is left untouched.
    fn set_html(&mut self, html: &str) -> Result<()>;

    /// Plain nested-mapping view of the value. `extended` adds identifiers,
    /// source text and derived flags.
    fn to_dict(&self, extended: bool) -> Value;

    /// Runs the parse again over the unchanged markup.
    fn reparse(&mut self) -> Result<()> {
        let html = self.html().to_owned();
        self.set_html(&html)
    }
}

fn check_markup(html: &str) -> Result<()> {
    if html.trim().is_empty() {
        return Err(DleError::EmptyInput("no HTML has been set".to_string()));
    }
    if !ANY_TAG.is_match(html) {
        return Err(DleError::EmptyInput("no HTML tags to parse".to_string()));
    }
    Ok(())
}

/// Builds the DOM of a fragment (anything that would live inside `<body>`).
pub fn fragment(html: &str) -> Result<Html> {
    check_markup(html)?;
    Ok(Html::parse_fragment(html))
}

/// Builds the DOM of a complete page.
pub fn document(html: &str) -> Result<Html> {
    check_markup(html)?;
    Ok(Html::parse_document(html))
}

/// First top-level element of a parsed fragment.
pub fn first_element(dom: &Html) -> Result<ElementRef<'_>> {
    element_children(dom.root_element())
        .next()
        .ok_or_else(|| DleError::EmptyInput("fragment contains no elements".to_string()))
}

/// Starts a dictionary with the fields every entity shares.
pub fn base_dict(html: &str, extended: bool) -> Map<String, Value> {
    let mut dict = Map::new();
    if extended {
        dict.insert("html".to_string(), Value::from(html));
    }
    dict
}

pub fn element_children<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children().filter_map(ElementRef::wrap)
}

/// The element itself followed by every element below it, in document order.
pub fn elements_within<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.descendants().filter_map(ElementRef::wrap)
}

/// First element named `name`, the element itself included.
pub fn find_first<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    elements_within(el).find(|e| e.value().name() == name)
}

pub fn first_class<'a>(el: &ElementRef<'a>) -> Option<&'a str> {
    el.value()
        .attr("class")
        .and_then(|classes| classes.split_whitespace().next())
}

pub fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

pub fn has_any_class(el: &ElementRef<'_>, wanted: &[&str]) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| wanted.contains(&c)))
}

/// All text below an element, concatenated.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Text below `el`, leaving out whole subtrees of the named elements.
pub fn text_skipping(el: ElementRef<'_>, skipped: &[&str]) -> String {
    let mut out = String::new();
    collect_text(el, skipped, &mut out);
    out
}

fn collect_text(el: ElementRef<'_>, skipped: &[&str], out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if skipped.contains(&e.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, skipped, out);
                }
            }
            _ => {}
        }
    }
}

/// Strips periods, commas, digits (superscript homograph marks) and
/// surrounding whitespace from a word-list token.
pub fn clean_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '.' | ',') && !c.is_ascii_digit())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Flattens every text leaf below `el` into cleaned, non-empty tokens.
pub fn leaf_tokens(el: ElementRef<'_>) -> Vec<String> {
    el.descendants()
        .filter_map(|n| n.value().as_text().map(|t| clean_token(t)))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Escapes text so it survives being spliced back into markup.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
