use crate::date::to_iso8601;
use crate::tags::TechnicalInfo;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Where `recorded_on` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedOnSource {
    #[default]
    None,
    Tag,
    FilesystemFallback,
}

impl RecordedOnSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordedOnSource::None => "none",
            RecordedOnSource::Tag => "tag",
            RecordedOnSource::FilesystemFallback => "filesystem_fallback",
        }
    }
}

impl fmt::Display for RecordedOnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about one media file.
///
/// Serializes to a flat mapping. Timestamps render as ISO 8601 with a
/// `+00:00` offset; the technical fields are omitted when the reader could
/// not open the file, and `error` is omitted when it could.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub filepath: String,
    pub filename: String,
    pub file_size_bytes: u64,
    #[serde(serialize_with = "iso8601")]
    pub file_modified_on: DateTime<Utc>,
    #[serde(serialize_with = "iso8601_opt")]
    pub recorded_on: Option<DateTime<Utc>>,
    pub recorded_on_source: RecordedOnSource,
    #[serde(flatten)]
    pub technical: Option<TechnicalInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetadataRecord {
    pub fn recorded_on_iso(&self) -> Option<String> {
        self.recorded_on.as_ref().map(to_iso8601)
    }

    pub fn file_modified_on_iso(&self) -> String {
        to_iso8601(&self.file_modified_on)
    }

    /// The record as a field-name to value mapping.
    pub fn to_map(&self) -> serde_json::Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}

fn iso8601<S: Serializer>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_iso8601(instant))
}

fn iso8601_opt<S: Serializer>(
    instant: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match instant {
        Some(instant) => iso8601(instant, serializer),
        None => serializer.serialize_none(),
    }
}
