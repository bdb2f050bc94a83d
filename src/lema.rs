use crate::error::{Result, StructuralError};
use crate::node::{self, ParsedNode};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use serde_json::Value;
use std::fmt;

static HEADWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<lema>[^\d,]+?)\s*(?P<index>\d+)?(?:,\s*(?P<female_suffix>[^,\d]+))?$")
        .unwrap()
});

/// A headword header, as found at the top of an entry.
pub trait LemaHeader: ParsedNode + Clone + fmt::Debug + PartialEq + Eq {
    fn from_element(el: ElementRef<'_>) -> Result<Self>;

    fn id(&self) -> &str;

    /// The headword itself.
    fn lema(&self) -> &str;

    fn classify(el: ElementRef<'_>) -> Option<Self> {
        Self::from_element(el).ok()
    }
}

/// Headword of a plain entry or complex form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLema {
    html: String,
    id: String,
    lema: String,
    is_foreign: bool,
}

impl EntryLema {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = node::fragment(html)?;
        let mut lema = <Self as LemaHeader>::from_element(node::first_element(&dom)?)?;
        lema.html = html.to_string();
        Ok(lema)
    }

    pub fn try_from_html(html: &str) -> Option<Self> {
        Self::from_html(html).ok()
    }

    pub fn is_foreign(&self) -> bool {
        self.is_foreign
    }
}

impl LemaHeader for EntryLema {
    /// Uses the first `<h1>`, falling back to the first `<h3>`.
    fn from_element(el: ElementRef<'_>) -> Result<Self> {
        let header = node::find_first(el, "h1")
            .or_else(|| node::find_first(el, "h3"))
            .ok_or(StructuralError::MissingLemaHeader)?;
        Ok(EntryLema {
            html: el.html(),
            id: header.value().id().unwrap_or_default().to_string(),
            lema: node::text_of(header).trim().to_string(),
            is_foreign: false,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn lema(&self) -> &str {
        &self.lema
    }
}

impl ParsedNode for EntryLema {
    fn html(&self) -> &str {
        &self.html
    }

    fn set_html(&mut self, html: &str) -> Result<()> {
        *self = Self::from_html(html)?;
        Ok(())
    }

    fn to_dict(&self, extended: bool) -> Value {
        let mut dict = node::base_dict(&self.html, extended);
        dict.insert("lema".to_string(), Value::from(self.lema.as_str()));
        if extended {
            dict.insert("id".to_string(), Value::from(self.id.as_str()));
            dict.insert("is_foreign".to_string(), Value::from(self.is_foreign));
        }
        Value::Object(dict)
    }
}

impl fmt::Display for EntryLema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lema)
    }
}

/// Headword of a full article: the plain header plus the homograph number
/// and feminine ending packed into the title (`bueno, na`, `banco1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleLema {
    header: EntryLema,
    index: u32,
    female_suffix: String,
}

impl ArticleLema {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = node::fragment(html)?;
        let mut lema = <Self as LemaHeader>::from_element(node::first_element(&dom)?)?;
        lema.header.html = html.to_string();
        Ok(lema)
    }

    pub fn try_from_html(html: &str) -> Option<Self> {
        Self::from_html(html).ok()
    }

    /// Homograph number, 0 when the headword has none.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn female_suffix(&self) -> &str {
        &self.female_suffix
    }

    pub fn is_foreign(&self) -> bool {
        self.header.is_foreign
    }

    pub fn is_acronym(&self) -> bool {
        let lema = &self.header.lema;
        lema.chars().any(char::is_uppercase) && !lema.chars().any(char::is_lowercase)
    }

    pub fn is_prefix(&self) -> bool {
        self.header.lema.starts_with('-')
    }

    pub fn is_suffix(&self) -> bool {
        self.header.lema.ends_with('-')
    }
}

impl LemaHeader for ArticleLema {
    fn from_element(el: ElementRef<'_>) -> Result<Self> {
        let mut header = <EntryLema as LemaHeader>::from_element(el)?;
        let mut index = 0;
        let mut female_suffix = String::new();
        if let Some(caps) = HEADWORD_RE.captures(&header.lema) {
            let lema = caps["lema"].trim().to_string();
            if let Some(m) = caps.name("index") {
                index = m.as_str().parse().unwrap_or(0);
            }
            if let Some(m) = caps.name("female_suffix") {
                female_suffix = m.as_str().trim().to_string();
            }
            header.lema = lema;
        }
        Ok(ArticleLema {
            header,
            index,
            female_suffix,
        })
    }

    fn id(&self) -> &str {
        &self.header.id
    }

    fn lema(&self) -> &str {
        &self.header.lema
    }
}

impl ParsedNode for ArticleLema {
    fn html(&self) -> &str {
        &self.header.html
    }

    fn set_html(&mut self, html: &str) -> Result<()> {
        *self = Self::from_html(html)?;
        Ok(())
    }

    fn to_dict(&self, extended: bool) -> Value {
        let mut dict = match self.header.to_dict(extended) {
            Value::Object(dict) => dict,
            _ => node::base_dict(&self.header.html, extended),
        };
        dict.insert("lema".to_string(), Value::from(self.header.lema.as_str()));
        dict.insert("index".to_string(), Value::from(self.index));
        dict.insert(
            "female_suffix".to_string(),
            Value::from(self.female_suffix.as_str()),
        );
        if extended {
            dict.insert("is_acronym".to_string(), Value::from(self.is_acronym()));
            dict.insert("is_prefix".to_string(), Value::from(self.is_prefix()));
            dict.insert("is_suffix".to_string(), Value::from(self.is_suffix()));
        }
        Value::Object(dict)
    }
}

impl fmt::Display for ArticleLema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header.lema)
    }
}
