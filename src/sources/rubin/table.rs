//! Generic table extraction. Cells are either visible text or a form whose
//! hidden inputs encode a followable link; the portal renders most links
//! that way.

use crate::error::ScrapeError;
use crate::sources::common::{attr, descendants, is_tag, shallow_descendants, text_of};
use reqwest::Url;
use tl::{HTMLTag, Parser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormLink {
    pub action: String,
    /// Hidden inputs in document order.
    pub fields: Vec<(String, String)>,
}

impl FormLink {
    pub fn from_form(form: &HTMLTag, parser: &Parser) -> Self {
        let fields = descendants(form, parser, "input")
            .into_iter()
            .filter(|input| {
                attr(input, "type")
                    .map(|kind| kind.eq_ignore_ascii_case("hidden"))
                    .unwrap_or(false)
            })
            .filter_map(|input| {
                let name = attr(input, "name")?;
                Some((name, attr(input, "value").unwrap_or_default()))
            })
            .collect();

        Self {
            action: attr(form, "action").unwrap_or_default(),
            fields,
        }
    }

    /// `action?name=value&name=value`, values passed through verbatim.
    pub fn relative_url(&self) -> String {
        let query = self
            .fields
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.action, query)
    }

    pub fn resolve(&self, base: &Url) -> Result<String, ScrapeError> {
        let relative = self.relative_url();
        base.join(&relative)
            .map(|url| url.to_string())
            .map_err(|e| ScrapeError::Url {
                url: relative,
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Form(FormLink),
}

impl Cell {
    pub fn from_td(td: &HTMLTag, parser: &Parser) -> Self {
        match descendants(td, parser, "form").first() {
            Some(form) => Cell::Form(FormLink::from_form(form, parser)),
            None => Cell::Text(text_of(td, parser)),
        }
    }

    pub fn resolve(&self, base: &Url) -> Result<String, ScrapeError> {
        match self {
            Cell::Text(text) => Ok(text.clone()),
            Cell::Form(form) => form.resolve(base),
        }
    }
}

/// Rows of `table` (not of tables nested inside it), each an ordered list
/// of its `td` cells.
pub fn parse_table(table: &HTMLTag, parser: &Parser) -> Vec<Vec<Cell>> {
    shallow_descendants(table, parser, "tr", "table")
        .into_iter()
        .map(|tr| {
            shallow_descendants(tr, parser, "td", "table")
                .into_iter()
                .filter(|td| is_tag(td, "td"))
                .map(|td| Cell::from_td(td, parser))
                .collect()
        })
        .collect()
}

pub fn resolve_row(row: &[Cell], base: &Url) -> Result<Vec<String>, ScrapeError> {
    row.iter().map(|cell| cell.resolve(base)).collect()
}

pub fn resolve_rows(rows: &[Vec<Cell>], base: &Url) -> Result<Vec<Vec<String>>, ScrapeError> {
    rows.iter().map(|row| resolve_row(row, base)).collect()
}
