use crate::error::ScrapeError;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Portal session token (`sid`). Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MeetingId(String);

impl MeetingId {
    pub fn new(raw: impl Into<String>) -> Result<Self, ScrapeError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScrapeError::MissingIdentifier);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MeetingId {
    type Error = ScrapeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MeetingId::new(value)
    }
}

impl From<MeetingId> for String {
    fn from(value: MeetingId) -> Self {
        value.0
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Meeting {
    #[serde(rename = "sid")]
    pub id: MeetingId,
    pub title: String,
    pub body: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "begin")]
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    #[serde(rename = "duration")]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillReference {
    pub year: String,
    pub bill_number: String,
    pub bill_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaItem {
    pub meeting_id: MeetingId,
    pub position: usize,
    pub status: String,
    pub top_number: String,
    pub category: String,
    pub details_link: String,
    pub title_full: String,
    pub document_link: String,
    pub attachment_link: String,
    pub decision_link: String,
    pub column_9: String,
    pub column_10: String,
    pub bill: Option<BillReference>,
}

impl AgendaItem {
    /// Key used to tie attachments back to this item: the bill id when one was
    /// decoded, otherwise `<sid>/<position>`.
    pub fn key(&self) -> String {
        match &self.bill {
            Some(bill) => bill.bill_id.clone(),
            None => format!("{}/{}", self.meeting_id, self.position),
        }
    }

    pub fn has_attachment_listing(&self) -> bool {
        let link = self.attachment_link.trim_start();
        link.starts_with("http://") || link.starts_with("https://")
    }
}

// Flat row layout: an absent bill reference is written as three empty strings.
impl Serialize for AgendaItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (year, bill_number, bill_id) = match &self.bill {
            Some(bill) => (
                bill.year.as_str(),
                bill.bill_number.as_str(),
                bill.bill_id.as_str(),
            ),
            None => ("", "", ""),
        };

        let mut row = serializer.serialize_struct("AgendaItem", 15)?;
        row.serialize_field("sid", &self.meeting_id)?;
        row.serialize_field("position", &self.position)?;
        row.serialize_field("status", &self.status)?;
        row.serialize_field("topnumber", &self.top_number)?;
        row.serialize_field("column3", &self.category)?;
        row.serialize_field("details_link", &self.details_link)?;
        row.serialize_field("title_full", &self.title_full)?;
        row.serialize_field("document_link", &self.document_link)?;
        row.serialize_field("attachment_link", &self.attachment_link)?;
        row.serialize_field("decision_link", &self.decision_link)?;
        row.serialize_field("column9", &self.column_9)?;
        row.serialize_field("column10", &self.column_10)?;
        row.serialize_field("year", year)?;
        row.serialize_field("billnumber", bill_number)?;
        row.serialize_field("billid", bill_id)?;
        row.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    #[serde(rename = "sid")]
    pub meeting_id: MeetingId,
    #[serde(rename = "agenda_item_id")]
    pub agenda_item_key: String,
    #[serde(rename = "attachment_title")]
    pub title: String,
    #[serde(rename = "attachment_file_url")]
    pub file_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentUnavailable {
    #[serde(rename = "agenda_item_id")]
    pub agenda_item_key: String,
    #[serde(rename = "attachmentsPageURL")]
    pub listing_url: String,
}

/// Result of classifying one attachment-listing page. Never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentOutcome {
    Unavailable(AttachmentUnavailable),
    Resolved(Vec<Attachment>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeMarker {
    pub scraped_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Meeting(Meeting),
    AgendaItem(AgendaItem),
    Attachment(Attachment),
    AttachmentUnavailable(AttachmentUnavailable),
    ScrapeMarker(ScrapeMarker),
}

impl Record {
    pub fn table(&self) -> &'static str {
        match self {
            Record::Meeting(_) => "sessions",
            Record::AgendaItem(_) => "agenda",
            Record::Attachment(_) => "attachments",
            Record::AttachmentUnavailable(_) => "404attachments",
            Record::ScrapeMarker(_) => "updates",
        }
    }

    /// Row columns that identify a record across runs; the store upserts on
    /// them so re-scraping a period does not duplicate rows. Scrape markers
    /// are a log and always append.
    pub fn conflict_columns(&self) -> &'static [&'static str] {
        match self {
            Record::Meeting(_) => &["sid"],
            Record::AgendaItem(_) => &["sid", "position"],
            Record::Attachment(_) => &["agenda_item_id", "attachment_file_url"],
            Record::AttachmentUnavailable(_) => &["agenda_item_id", "attachmentsPageURL"],
            Record::ScrapeMarker(_) => &[],
        }
    }

    pub fn to_row(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Record::Meeting(meeting) => serde_json::to_value(meeting),
            Record::AgendaItem(item) => serde_json::to_value(item),
            Record::Attachment(attachment) => serde_json::to_value(attachment),
            Record::AttachmentUnavailable(missing) => serde_json::to_value(missing),
            Record::ScrapeMarker(marker) => serde_json::to_value(marker),
        }
    }
}

/// Date range for discovery. Accepts `{ "year": 2006 }` or
/// `{ "from": "01.01.2006", "to": "31.12.2006" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Period {
    Year {
        year: i32,
    },
    Range {
        #[serde(with = "portal_date")]
        from: NaiveDate,
        #[serde(with = "portal_date")]
        to: NaiveDate,
    },
}

impl Period {
    pub fn bounds(&self) -> Result<(NaiveDate, NaiveDate), ScrapeError> {
        match *self {
            Period::Year { year } => {
                let from = NaiveDate::from_ymd_opt(year, 1, 1);
                let to = NaiveDate::from_ymd_opt(year, 12, 31);
                match (from, to) {
                    (Some(from), Some(to)) => Ok((from, to)),
                    _ => Err(ScrapeError::UnparseableDateTime {
                        value: year.to_string(),
                    }),
                }
            }
            Period::Range { from, to } => Ok((from, to)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Period::Year { year } => year.to_string(),
            Period::Range { from, to } => format!(
                "{}..{}",
                portal_date::format(from),
                portal_date::format(to)
            ),
        }
    }

    pub fn current_year() -> Self {
        Period::Year {
            year: chrono::Local::now().year(),
        }
    }
}

/// `DD.MM.YYYY`, the portal's date notation.
pub mod portal_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%d.%m.%Y";

    pub fn format(date: &NaiveDate) -> String {
        date.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(raw.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeConfig {
    /// Portal base URL, or a bare portal key such as `darmstadt`.
    pub portal: String,
    #[serde(default = "Period::current_year")]
    pub period: Period,
    pub callback_base: String,
    pub callback_token: String,
    #[serde(default)]
    pub force: bool,
}

impl ScrapeConfig {
    /// Strips trailing slashes from the callback base so endpoint paths can
    /// be appended directly.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.callback_base.trim().trim_end_matches('/');
        self.callback_base = trimmed.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Scraped,
    /// The portal reported no change since the last scrape.
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeSummary {
    pub status: RunStatus,
    pub changed: bool,
    pub meetings: usize,
    pub agenda_items: usize,
    pub attachments: usize,
    pub unavailable_attachments: usize,
    pub failed_meetings: usize,
}
