use crate::conjugation::Conjugation;
use crate::definition::Definition;
use crate::entry::Entry;
use crate::error::{Result, StructuralError};
use crate::lema::{ArticleLema, EntryLema};
use crate::node::{self, ParsedNode};
use crate::sentence::Sentence;
use crate::word::Word;
use log::{debug, warn};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use serde_json::{Value, json};
use std::fmt;

const TITLE_CLASS: &str = "c-page-header__title";

static CONJUGATION_SECTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"section[id^="conjugacion"]"#).unwrap());
static CONJUGATION_ANY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[id^="conjugacion"]"#).unwrap());

/// Classes of the nodes an article is assembled from. Everything else is
/// layout.
const GROUPING_CLASSES: [&str; 14] = [
    "j", "j1", "j2", "k5", "k6", "l", "l2", "l3", "m", "n1", "n2", "n3", "n4", "n5",
];
const DEFINITION_CLASSES: [&str; 4] = ["j", "j1", "j2", "m"];
const NOTE_CLASSES: [&str; 5] = ["n1", "n2", "n3", "n4", "n5"];
const COMPLEX_FORM_CLASSES: [&str; 2] = ["k5", "k6"];
const CROSS_REFERENCE_CLASSES: [&str; 3] = ["l", "l2", "l3"];

/// Everything a page says about one headword: its own entry, the complex
/// forms built on it, links to related entries and, for verbs, the
/// conjugation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    html: String,
    id: String,
    entry: Entry<ArticleLema>,
    complex_forms: Vec<Entry>,
    other_entries: Vec<Word>,
    conjugation: Option<Conjugation>,
    raw_text: String,
    strict: bool,
}

fn group_html(members: &[ElementRef<'_>]) -> String {
    let mut html = String::from("<div>");
    for member in members {
        html.push_str(&member.html());
    }
    html.push_str("</div>");
    html
}

impl Article {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::parse_html(html, true)
    }

    /// Like [`Article::from_html`], but a conjugation section that fails to
    /// parse is dropped with a warning.
    pub fn from_html_lossy(html: &str) -> Result<Self> {
        Self::parse_html(html, false)
    }

    fn parse_html(html: &str, strict: bool) -> Result<Self> {
        let dom = node::fragment(html)?;
        let mut article = Self::parse(node::first_element(&dom)?, strict)?;
        article.html = html.to_string();
        Ok(article)
    }

    pub fn try_from_html(html: &str) -> Option<Self> {
        Self::from_html(html).ok()
    }

    /// Reads the first `<article>` at or below `root`. It must carry a
    /// `<header>` and the page title heading. A conjugation section inside
    /// the article is attached, and must parse.
    pub fn from_element(root: ElementRef<'_>) -> Result<Self> {
        Self::parse(root, true)
    }

    pub fn from_element_lossy(root: ElementRef<'_>) -> Result<Self> {
        Self::parse(root, false)
    }

    fn parse(root: ElementRef<'_>, strict: bool) -> Result<Self> {
        let article = node::find_first(root, "article").ok_or(StructuralError::NotAnArticle)?;
        node::find_first(article, "header").ok_or(StructuralError::NotAnArticle)?;
        let title = node::elements_within(article)
            .find(|e| e.value().name() == "h1" && node::has_class(e, TITLE_CLASS))
            .ok_or(StructuralError::NotAnArticle)?;
        let id = article.value().id().unwrap_or_default().to_string();

        let mut lema_group = vec![title];
        let mut complex_groups: Vec<Vec<ElementRef<'_>>> = Vec::new();
        let mut other_entries = Vec::new();

        for el in node::elements_within(article).filter(|e| node::has_any_class(e, &GROUPING_CLASSES)) {
            let name = el.value().name();
            let attaches = (name == "div" && node::has_any_class(&el, &NOTE_CLASSES))
                || (name == "li" && node::has_any_class(&el, &DEFINITION_CLASSES));
            if attaches {
                match complex_groups.last_mut() {
                    Some(group) => group.push(el),
                    None => lema_group.push(el),
                }
            } else if name == "h3" && node::has_any_class(&el, &COMPLEX_FORM_CLASSES) {
                complex_groups.push(vec![el]);
            } else if name == "h3" && node::has_any_class(&el, &CROSS_REFERENCE_CLASSES) {
                match Word::classify(el, &id) {
                    Some(word) => other_entries.push(word),
                    None => debug!("Skipping unlinked cross-reference {:?}", node::text_of(el)),
                }
            }
        }

        let entry: Entry<ArticleLema> =
            Entry::from_elements(lema_group.iter().copied(), group_html(&lema_group))?;
        let complex_forms = complex_groups
            .iter()
            .map(|group| Entry::<EntryLema>::from_elements(group.iter().copied(), group_html(group)))
            .collect::<Result<Vec<_>>>()?;

        let conjugation = match conjugation_section(article) {
            Some(section) => match Conjugation::from_element(section) {
                Ok(conjugation) => Some(conjugation),
                Err(e) if strict => return Err(e),
                Err(e) => {
                    warn!("Dropping conjugation of {:?}: {}", id, e);
                    None
                }
            },
            None => None,
        };

        debug!(
            "Article {:?}: {} definitions, {} complex forms, {} other entries",
            entry.lema().to_string(),
            entry.definitions().len(),
            complex_forms.len(),
            other_entries.len()
        );

        Ok(Article {
            html: article.html(),
            id,
            entry,
            complex_forms,
            other_entries,
            conjugation,
            raw_text: node::text_of(article),
            strict,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lema(&self) -> &ArticleLema {
        self.entry.lema()
    }

    /// The article's own entry, without its complex forms.
    pub fn entry(&self) -> &Entry<ArticleLema> {
        &self.entry
    }

    pub fn definitions(&self) -> &[Definition] {
        self.entry.definitions()
    }

    pub fn supplementary_info(&self) -> &[Sentence] {
        self.entry.supplementary_info()
    }

    pub fn complex_forms(&self) -> &[Entry] {
        &self.complex_forms
    }

    /// Links to related headwords, resolvable with another search.
    pub fn other_entries(&self) -> &[Word] {
        &self.other_entries
    }

    pub fn conjugation(&self) -> Option<&Conjugation> {
        self.conjugation.as_ref()
    }

    /// Replaces the conjugation read from the markup. A later reparse reads
    /// it from the markup again.
    pub fn set_conjugation(&mut self, conjugation: Option<Conjugation>) {
        self.conjugation = conjugation;
    }

    pub fn is_verb(&self) -> bool {
        self.conjugation.is_some() || self.definitions().iter().any(Definition::is_verb)
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }
}

fn conjugation_section<'a>(article: ElementRef<'a>) -> Option<ElementRef<'a>> {
    article
        .select(&CONJUGATION_SECTION)
        .next()
        .or_else(|| article.select(&CONJUGATION_ANY).next())
}

impl ParsedNode for Article {
    fn html(&self) -> &str {
        &self.html
    }

    fn set_html(&mut self, html: &str) -> Result<()> {
        *self = Self::parse_html(html, self.strict)?;
        Ok(())
    }

    fn to_dict(&self, extended: bool) -> Value {
        let mut dict = node::base_dict(&self.html, extended);
        dict.insert("id".to_string(), Value::from(self.id.as_str()));
        for (key, value) in self.entry.dict_fields(extended) {
            dict.insert(key.to_string(), value);
        }
        dict.insert("is".to_string(), json!({ "verb": self.is_verb() }));
        dict.insert(
            "complex_forms".to_string(),
            Value::Array(
                self.complex_forms
                    .iter()
                    .map(|e| e.to_dict(extended))
                    .collect(),
            ),
        );
        dict.insert(
            "other_entries".to_string(),
            Value::Array(
                self.other_entries
                    .iter()
                    .map(|w| w.to_dict(extended))
                    .collect(),
            ),
        );
        if let Some(conjugation) = &self.conjugation {
            dict.insert("conjugations".to_string(), conjugation.to_dict(extended));
        }
        if extended {
            dict.insert("raw_text".to_string(), Value::from(self.raw_text.as_str()));
        }
        Value::Object(dict)
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DleError;

    fn definition(index: u32, abbr: &str, title: &str, text: &str) -> String {
        format!(
            r#"<li class="j"><div class="c-definitions__item"><div><span class="n_acep">{index}.</span> <abbr class="d" title="{title}">{abbr}</abbr> {text}</div></div></li>"#
        )
    }

    fn abajo() -> String {
        format!(
            r#"<article id="0TmAVB3"><header class="f"><h1 class="c-page-header__title">abajo</h1></header><ol class="c-definitions">{}{}</ol><div class="n2">U. t. c. s.</div><h3 class="k5" id="Xy1">venirse abajo</h3><ol class="c-definitions">{}{}</ol><h3 class="l"><a data-acc="cuesta abajo" href="/?id=BQ3Ij3p">cuesta abajo</a></h3></article>"#,
            definition(1, "adv.", "adverbio", "Hacia lugar o parte inferior."),
            definition(2, "adv.", "adverbio", "En lugar posterior."),
            definition(1, "prnl.", "verbo pronominal", "Caer, arruinarse."),
            definition(2, "prnl.", "verbo pronominal", "Frustrarse, decaer."),
        )
    }

    #[test]
    fn test_complex_form_collects_following_definitions() {
        let article = Article::from_html(&abajo()).unwrap();
        assert_eq!(article.id(), "0TmAVB3");
        assert_eq!(article.lema().to_string(), "abajo");
        assert_eq!(article.definitions().len(), 2);
        assert_eq!(article.supplementary_info().len(), 1);

        assert_eq!(article.complex_forms().len(), 1);
        let venirse = &article.complex_forms()[0];
        assert_eq!(venirse.lema().to_string(), "venirse abajo");
        assert_eq!(venirse.definitions().len(), 2);
        assert_eq!(venirse.definitions()[1].text(), "Frustrarse, decaer.");

        assert_eq!(article.other_entries().len(), 1);
        assert_eq!(article.other_entries()[0].text(), "cuesta abajo");
        assert_eq!(
            article.other_entries()[0].link(),
            "https://dle.rae.es/?id=BQ3Ij3p"
        );
    }

    #[test]
    fn test_cross_reference_keeps_complex_form_open() {
        let html = format!(
            r#"<article id="0TmAVB3"><header><h1 class="c-page-header__title">abajo</h1></header><ol>{}</ol><h3 class="k5" id="Xy1">venirse abajo</h3><ol>{}</ol><h3 class="l"><a href="/?id=BQ3Ij3p">cuesta abajo</a></h3><ol>{}</ol><div class="n1">U. t. c. intr.</div></article>"#,
            definition(1, "adv.", "adverbio", "Hacia lugar o parte inferior."),
            definition(1, "prnl.", "verbo pronominal", "Caer, arruinarse."),
            definition(2, "prnl.", "verbo pronominal", "Frustrarse, decaer."),
        );
        let article = Article::from_html(&html).unwrap();
        assert_eq!(article.definitions().len(), 1);
        assert!(article.supplementary_info().is_empty());
        assert_eq!(article.other_entries().len(), 1);
        assert_eq!(article.complex_forms().len(), 1);
        let venirse = &article.complex_forms()[0];
        assert_eq!(venirse.definitions().len(), 2);
        assert_eq!(venirse.supplementary_info().len(), 1);
    }

    #[test]
    fn test_conjugation_inside_article_survives_reparse() {
        let html = format!(
            r#"<article id="KxBdLdv"><header><h1 class="c-page-header__title">hablar</h1></header><ol>{}</ol><section id="conjugacionKxBdLdv"><header><h2>Conjugación de «hablar»</h2></header><table><tr><th>Infinitivo</th></tr><tr><td>hablar</td></tr></table></section></article>"#,
            definition(1, "adv.", "adverbio", "De palabra.")
        );
        let mut article = Article::from_html(&html).unwrap();
        assert_eq!(article.conjugation().unwrap().verb(), "hablar");
        assert!(article.is_verb());

        let before = article.clone();
        article.reparse().unwrap();
        assert_eq!(article, before);
        assert!(article.is_verb());
    }

    #[test]
    fn test_broken_conjugation_anchor() {
        let html = r#"<article id="a"><header><h1 class="c-page-header__title">hablar</h1></header><div id="conjugacionA"></div></article>"#;
        assert!(matches!(
            Article::from_html(html),
            Err(DleError::Structural(StructuralError::NotAConjugationSection))
        ));

        let mut article = Article::from_html_lossy(html).unwrap();
        assert!(article.conjugation().is_none());
        article.reparse().unwrap();
        assert!(article.conjugation().is_none());
    }

    #[test]
    fn test_verb_flag_from_definitions_or_conjugation() {
        let mut article = Article::from_html(&abajo()).unwrap();
        // Complex-form verbs do not make the headword a verb.
        assert!(!article.is_verb());

        let conjugation =
            Conjugation::from_html(r#"<section id="conjugacionX"><table></table></section>"#)
                .unwrap();
        article.set_conjugation(Some(conjugation));
        assert!(article.is_verb());
        let dict = article.to_dict(false);
        assert_eq!(dict["is"]["verb"], true);
        assert!(dict.get("conjugations").is_some());

        let hablar = format!(
            r#"<article id="a"><header><h1 class="c-page-header__title">hablar</h1></header><ol>{}</ol></article>"#,
            definition(1, "intr.", "verbo intransitivo", "Articular palabras.")
        );
        assert!(Article::from_html(&hablar).unwrap().is_verb());
    }

    #[test]
    fn test_dict_layout() {
        let article = Article::from_html(&abajo()).unwrap();
        let dict = article.to_dict(false);
        assert_eq!(dict["id"], "0TmAVB3");
        assert_eq!(dict["lema"]["lema"], "abajo");
        assert_eq!(dict["lema"]["index"], 0);
        assert_eq!(dict["is"]["verb"], false);
        assert_eq!(dict["definitions"].as_array().unwrap().len(), 2);
        assert_eq!(dict["complex_forms"][0]["lema"]["lema"], "venirse abajo");
        assert_eq!(dict["other_entries"][0]["text"], "cuesta abajo");
        assert!(dict.get("conjugations").is_none());
        assert!(dict.get("raw_text").is_none());
        assert!(article.to_dict(true)["raw_text"].as_str().unwrap().contains("venirse abajo"));
    }

    #[test]
    fn test_not_an_article() {
        for html in [
            "<div><p>nada</p></div>",
            "<article><p>sin cabecera</p></article>",
            "<article><header><h1>sin clase</h1></header></article>",
        ] {
            let err = Article::from_html(html).unwrap_err();
            assert!(matches!(
                err,
                DleError::Structural(StructuralError::NotAnArticle)
            ));
        }
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let mut article = Article::from_html(&abajo()).unwrap();
        let before = article.clone();
        article.reparse().unwrap();
        assert_eq!(article, before);
    }
}
