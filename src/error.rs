use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("empty meeting identifier")]
    MissingIdentifier,

    #[error("unparseable date/time `{value}`")]
    UnparseableDateTime { value: String },

    #[error("missing required element {element} on {page}")]
    MissingRequiredElement { element: &'static str, page: String },

    #[error("malformed row {row}: expected at least {expected} cells, found {found}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("HTML parse error: {0}")]
    Html(String),

    #[error("invalid URL `{url}`: {reason}")]
    Url { url: String, reason: String },

    #[error("record store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
