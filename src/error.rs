use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, DleError>;

/// Enum representing all possible errors in the dle_rs library.
#[derive(Error, Debug)]
pub enum DleError {
    #[error("Empty or invalid HTML: {0}")]
    EmptyInput(String),

    #[error("Unexpected markup structure: {0}")]
    Structural(#[from] StructuralError),

    #[error("Ambiguous markup: {0}")]
    AmbiguousMarkup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Data directory not found or could not be determined")]
    DataDirNotFound,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String), // For unexpected situations
}

/// A required element or attribute is missing from a fragment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("expected an <abbr> element")]
    MissingAbbrElement,

    #[error("<abbr> has no title attribute with the expanded text")]
    MissingExpansion,

    #[error("<{element}> has no {attribute} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("definition item container not found")]
    MissingDefinitionRoot,

    #[error("definition has no category abbreviation")]
    MissingCategory,

    #[error("no <h1> or <h3> lema header found")]
    MissingLemaHeader,

    #[error("could not find a lema among the entry children")]
    MissingLema,

    #[error("no <article> with a <header> found")]
    NotAnArticle,

    #[error("expected a <section> whose id starts with \"conjugacion\"")]
    NotAConjugationSection,
}

impl DleError {
    /// Shorthand for the word classifier's "none of my shapes" failure.
    pub(crate) fn unrecognized_word(html: &str) -> Self {
        DleError::AmbiguousMarkup(format!("cannot parse a word from {}", html))
    }
}
