use crate::article::Article;
use crate::error::Result;
use crate::node::{self, ParsedNode};
use crate::word::Word;
use log::{debug, warn};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static CANONICAL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel="canonical"]"#).unwrap());
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());
static RESULTS: Lazy<Selector> = Lazy::new(|| Selector::parse("div#resultados").unwrap());
static SYNONYMS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"section[id^="sinonimos"]"#).unwrap());
static ANTONYMS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"section[id^="antonimos"]"#).unwrap());
static RELATED_WORDS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ul.c-related-words").unwrap());
static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href], mark[data-id]").unwrap());

/// A whole dictionary results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    html: String,
    title: String,
    canonical: String,
    meta_description: String,
    articles: Vec<Article>,
    related_entries: BTreeMap<String, Vec<Word>>,
    synonyms: Vec<String>,
    antonyms: Vec<String>,
    strict: bool,
}

impl SearchResult {
    /// Parses a results page. Any article or conjugation that fails to
    /// parse fails the whole page.
    pub fn from_html(html: &str) -> Result<Self> {
        Self::parse(html, true)
    }

    /// Parses a results page, skipping the articles and conjugations that
    /// fail instead of giving up on the page.
    pub fn from_html_lossy(html: &str) -> Result<Self> {
        Self::parse(html, false)
    }

    pub fn try_from_html(html: &str) -> Option<Self> {
        Self::from_html(html).ok()
    }

    fn parse(html: &str, strict: bool) -> Result<Self> {
        let dom = node::document(html)?;

        let title = first_match(&dom, &TITLE)
            .map(|t| node::text_of(t).trim().to_string())
            .unwrap_or_default();
        let canonical = first_attr(&dom, &CANONICAL, "href");
        let meta_description = first_attr(&dom, &META_DESCRIPTION, "content");

        let mut articles = Vec::new();
        let mut related_entries = BTreeMap::new();
        if let Some(results) = first_match(&dom, &RESULTS) {
            for element in article_elements(results) {
                let article = if strict {
                    Article::from_element(element)
                } else {
                    Article::from_element_lossy(element)
                };
                match article {
                    Ok(article) => articles.push(article),
                    Err(e) if strict => return Err(e),
                    Err(e) => warn!("Skipping unparseable article: {}", e),
                }
            }
            if articles.is_empty() {
                related_entries = collect_related_entries(results);
            }
        } else {
            debug!("Page has no results container");
        }

        let synonyms = related_words(&dom, &SYNONYMS);
        let antonyms = related_words(&dom, &ANTONYMS);

        Ok(SearchResult {
            html: html.to_string(),
            title,
            canonical,
            meta_description,
            articles,
            related_entries,
            synonyms,
            antonyms,
            strict,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Canonical URL of the page.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn meta_description(&self) -> &str {
        &self.meta_description
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Suggestions offered when the term has no article, keyed by the
    /// label the page shows above them.
    pub fn related_entries(&self) -> &BTreeMap<String, Vec<Word>> {
        &self.related_entries
    }

    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    pub fn antonyms(&self) -> &[String] {
        &self.antonyms
    }
}

fn first_match<'a>(dom: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
    dom.select(selector).next()
}

fn first_attr(dom: &Html, selector: &Selector, attribute: &str) -> String {
    first_match(dom, selector)
        .and_then(|e| e.value().attr(attribute))
        .unwrap_or_default()
        .to_string()
}

/// Articles directly under the results container or, when there are none,
/// anywhere below it.
fn article_elements(results: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let direct: Vec<_> = node::element_children(results)
        .filter(|e| e.value().name() == "article")
        .collect();
    if !direct.is_empty() {
        return direct;
    }
    node::elements_within(results)
        .filter(|e| e.value().name() == "article")
        .collect()
}

/// Each `<p>` label owns the links of the `<div>`s that follow it.
fn collect_related_entries(results: ElementRef<'_>) -> BTreeMap<String, Vec<Word>> {
    let mut related: BTreeMap<String, Vec<Word>> = BTreeMap::new();
    let mut label: Option<String> = None;
    for child in node::element_children(results) {
        match child.value().name() {
            "p" => {
                let text = node::text_of(child);
                let text = text.trim();
                label = Some(text.strip_suffix(':').unwrap_or(text).trim().to_string());
            }
            "div" => {
                let Some(label) = &label else {
                    continue;
                };
                let words = child
                    .select(&LINKS)
                    .filter_map(|link| Word::classify(link, ""));
                related.entry(label.clone()).or_default().extend(words);
            }
            _ => {}
        }
    }
    related.retain(|_, words| !words.is_empty());
    related
}

fn related_words(dom: &Html, section: &Selector) -> Vec<String> {
    let Some(section) = first_match(dom, section) else {
        return Vec::new();
    };
    let list = section.select(&RELATED_WORDS).next().unwrap_or(section);
    node::leaf_tokens(list)
}

impl ParsedNode for SearchResult {
    fn html(&self) -> &str {
        &self.html
    }

    fn set_html(&mut self, html: &str) -> Result<()> {
        *self = Self::parse(html, self.strict)?;
        Ok(())
    }

    fn to_dict(&self, extended: bool) -> Value {
        let mut dict = node::base_dict(&self.html, extended);
        dict.insert("title".to_string(), Value::from(self.title.as_str()));
        if extended {
            dict.insert("canonical".to_string(), Value::from(self.canonical.as_str()));
            dict.insert(
                "meta_description".to_string(),
                Value::from(self.meta_description.as_str()),
            );
        }
        if !self.articles.is_empty() {
            dict.insert(
                "articles".to_string(),
                Value::Array(self.articles.iter().map(|a| a.to_dict(extended)).collect()),
            );
        } else if !self.related_entries.is_empty() {
            let related: Map<String, Value> = self
                .related_entries
                .iter()
                .map(|(label, words)| {
                    (
                        label.clone(),
                        Value::Array(words.iter().map(|w| w.to_dict(extended)).collect()),
                    )
                })
                .collect();
            dict.insert("related_entries".to_string(), Value::Object(related));
        }
        dict.insert("synonyms".to_string(), Value::from(self.synonyms.clone()));
        dict.insert("antonyms".to_string(), Value::from(self.antonyms.clone()));
        Value::Object(dict)
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.meta_description)
    }
}
