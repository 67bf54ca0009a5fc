use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Layouts seen in the wild that are neither RFC 2822 nor RFC 3339.
/// Interpreted as UTC when they carry no offset.
const LOOSE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A timestamp taken from a `pubDate` or `published` element.
///
/// Unparsable text is kept as [`FeedDate::Invalid`] instead of failing the
/// parse, so one bad date never costs the rest of the article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedDate {
    Valid(DateTime<FixedOffset>),
    /// The raw (trimmed) element text that could not be interpreted.
    Invalid(String),
}

impl FeedDate {
    /// Interprets feed date text.
    ///
    /// RSS uses RFC 2822 (`Mon, 02 Jan 2006 15:04:05 GMT`), Atom uses
    /// RFC 3339 (`2006-01-02T15:04:05Z`). Either format is accepted in either
    /// element because producers mix them freely.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
            return FeedDate::Valid(dt);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return FeedDate::Valid(dt);
        }
        for format in LOOSE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return FeedDate::Valid(naive.and_utc().fixed_offset());
            }
        }
        if let Some(naive) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return FeedDate::Valid(naive.and_utc().fixed_offset());
        }

        FeedDate::Invalid(text.to_owned())
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, FeedDate::Valid(_))
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            FeedDate::Valid(dt) => Some(dt),
            FeedDate::Invalid(_) => None,
        }
    }
}

/// Valid dates serialize as RFC 3339 strings, invalid ones as `null`.
impl Serialize for FeedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeedDate::Valid(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            FeedDate::Invalid(_) => serializer.serialize_none(),
        }
    }
}

/// One value stored on an [`Article`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text taken from an element body or an `href` attribute.
    Text(String),
    Date(FeedDate),
    /// Caller-supplied metadata copied from [`FeedOptions`](super::FeedOptions).
    Meta(serde_json::Value),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&FeedDate> {
        match self {
            FieldValue::Date(d) => Some(d),
            _ => None,
        }
    }
}

/// A single normalized feed entry (`<item>` or `<entry>`).
///
/// Fields are only present when the feed supplied them. Keys are the
/// lowercased element names from the field table (`title`, `link`,
/// `description`, `summary`, `content`, `pubdate`, `published`) plus any
/// extra fields the caller attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Article {
    fields: BTreeMap<String, FieldValue>,
}

impl Article {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(FieldValue::as_text)
    }

    pub fn date(&self, key: &str) -> Option<&FeedDate> {
        self.fields.get(key).and_then(FieldValue::as_date)
    }

    pub fn title(&self) -> Option<&str> {
        self.text("title")
    }

    pub fn link(&self) -> Option<&str> {
        self.text("link")
    }

    /// RSS `description`, falling back to Atom `summary`.
    pub fn summary(&self) -> Option<&str> {
        self.text("description").or_else(|| self.text("summary"))
    }

    pub fn content(&self) -> Option<&str> {
        self.text("content")
    }

    /// RSS `pubDate`, falling back to Atom `published`. Invalid dates yield `None`.
    pub fn published_at(&self) -> Option<&DateTime<FixedOffset>> {
        self.date("pubdate")
            .and_then(FeedDate::as_datetime)
            .or_else(|| self.date("published").and_then(FeedDate::as_datetime))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Writes a field, replacing any previous value under the same key.
    pub(crate) fn set(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }
}
