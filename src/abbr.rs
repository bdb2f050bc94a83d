use crate::error::{Result, StructuralError};
use crate::node::{self, ParsedNode};
use scraper::ElementRef;
use serde_json::Value;
use std::fmt;

/// An abbreviation such as `adj.` together with its expanded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abbr {
    html: String,
    abbr: String,
    class: Option<String>,
    text: String,
}

impl Abbr {
    /// Parses an `<abbr>` fragment.
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = node::fragment(html)?;
        let mut abbr = Self::from_element(node::first_element(&dom)?)?;
        abbr.html = html.to_string();
        Ok(abbr)
    }

    /// Same as [`Abbr::from_html`], discarding the reason on failure.
    pub fn try_from_html(html: &str) -> Option<Self> {
        Self::from_html(html).ok()
    }

    /// Builds an abbreviation from an element that must itself be `<abbr>`.
    pub fn from_element(el: ElementRef<'_>) -> Result<Self> {
        if el.value().name() != "abbr" {
            return Err(StructuralError::MissingAbbrElement.into());
        }
        let text = el
            .value()
            .attr("title")
            .ok_or(StructuralError::MissingExpansion)?;
        Ok(Abbr {
            html: el.html(),
            abbr: node::text_of(el),
            class: node::first_class(&el).map(str::to_string),
            text: text.to_string(),
        })
    }

    /// Classifier form used while walking mixed content.
    pub(crate) fn classify(el: ElementRef<'_>) -> Option<Self> {
        Self::from_element(el).ok()
    }

    /// The abbreviated text as displayed.
    pub fn abbr(&self) -> &str {
        &self.abbr
    }

    /// First CSS class of the element, if any.
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// The expanded text from the `title` attribute.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl ParsedNode for Abbr {
    fn html(&self) -> &str {
        &self.html
    }

    fn set_html(&mut self, html: &str) -> Result<()> {
        *self = Self::from_html(html)?;
        Ok(())
    }

    fn to_dict(&self, extended: bool) -> Value {
        let mut dict = node::base_dict(&self.html, extended);
        dict.insert("abbr".to_string(), Value::from(self.abbr.as_str()));
        if extended {
            dict.insert(
                "class".to_string(),
                Value::from(self.class.clone().unwrap_or_default()),
            );
        }
        dict.insert("text".to_string(), Value::from(self.text.as_str()));
        Value::Object(dict)
    }
}

impl fmt::Display for Abbr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.abbr, self.text)
    }
}
