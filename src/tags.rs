use lofty::error::LoftyError;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemValue, Tag, TagType};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;

/// A raw tag value: one item, or every item stored under the same key in
/// file order.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Scalar(String),
    Sequence(Vec<String>),
}

impl TagValue {
    /// The value itself, or the first element of a sequence.
    pub fn first(&self) -> Option<&str> {
        match self {
            TagValue::Scalar(s) => Some(s),
            TagValue::Sequence(items) => items.first().map(String::as_str),
        }
    }
}

/// Tag items keyed by their on-disk identifier (`TDRC`, `©day`, `DATE`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSet {
    items: BTreeMap<String, TagValue>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.items.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: TagValue) {
        self.items.insert(key.into(), value);
    }

    /// Append one item; a second item under the same key turns the value
    /// into a sequence.
    pub fn push(&mut self, key: impl Into<String>, text: impl Into<String>) {
        let text = text.into();
        match self.items.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(TagValue::Scalar(text));
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                TagValue::Sequence(items) => items.push(text),
                TagValue::Scalar(existing) => {
                    let first = std::mem::take(existing);
                    slot.insert(TagValue::Sequence(vec![first, text]));
                }
            },
        }
    }

    /// Fold in another tag block. Keys already present keep their value.
    pub fn merge_missing(&mut self, other: TagSet) {
        for (key, value) in other.items {
            self.items.entry(key).or_insert(value);
        }
    }
}

impl<K: Into<String>> FromIterator<(K, TagValue)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, TagValue)>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

/// Container-level properties reported by the reader.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalInfo {
    pub duration_seconds: f64,
    pub sample_rate_hz: Option<u32>,
    pub channels: Option<u8>,
    pub bitrate_bps: u32,
    pub format: String,
}

/// A successfully opened media file.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedMedia {
    pub info: TechnicalInfo,
    pub tags: TagSet,
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Could not process file with lofty: {0}")]
    Format(#[from] LoftyError),

    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// Opens a media file and exposes its properties and raw tags.
pub trait TagReader {
    fn read(&self, path: &Path) -> Result<TaggedMedia, ReadError>;
}

/// [`TagReader`] backed by lofty.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyReader;

impl TagReader for LoftyReader {
    fn read(&self, path: &Path) -> Result<TaggedMedia, ReadError> {
        // The decoder runs on arbitrary input; a panic in it is a failed read.
        match panic::catch_unwind(AssertUnwindSafe(|| read_tagged(path))) {
            Ok(result) => result,
            Err(payload) => Err(ReadError::Unexpected(panic_message(payload.as_ref()))),
        }
    }
}

fn read_tagged(path: &Path) -> Result<TaggedMedia, ReadError> {
    // The probe owns the file handle; it is closed when `read` returns.
    let tagged_file = Probe::open(path)?.guess_file_type()?.read()?;

    let properties = tagged_file.properties();
    let info = TechnicalInfo {
        duration_seconds: properties.duration().as_secs_f64(),
        sample_rate_hz: properties.sample_rate(),
        channels: properties.channels(),
        bitrate_bps: properties
            .audio_bitrate()
            .map(|kbps| kbps.saturating_mul(1000))
            .unwrap_or(0),
        format: format!("{:?}", tagged_file.file_type()),
    };

    let primary = tagged_file.primary_tag_type();
    let mut blocks: Vec<&Tag> = tagged_file.tags().iter().collect();
    blocks.sort_by_key(|tag| tag.tag_type() != primary);

    let mut tags = TagSet::new();
    for block in blocks {
        tags.merge_missing(raw_tag_set(block));
    }

    Ok(TaggedMedia { info, tags })
}

/// Collect a tag block under the identifiers its format stores on disk.
///
/// APE and Vorbis keys are case-insensitive and are upper-cased, so
/// `Year`, `year` and `YEAR` all land on `YEAR`.
pub(crate) fn raw_tag_set(tag: &Tag) -> TagSet {
    let tag_type = tag.tag_type();
    let fold_case = matches!(tag_type, TagType::Ape | TagType::VorbisComments);
    let mut set = TagSet::new();

    for item in tag.items() {
        let Some(key) = item.key().map_key(tag_type, true) else {
            continue;
        };
        let key = if fold_case {
            key.to_ascii_uppercase()
        } else {
            key.to_string()
        };
        let text = match item.value() {
            ItemValue::Text(s) | ItemValue::Locator(s) => s.clone(),
            ItemValue::Binary(_) => continue,
        };
        set.push(key, text);
    }

    set
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tag reader panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scalar_first_is_itself() {
        let value = TagValue::Scalar("2023".to_string());
        assert_eq!(value.first(), Some("2023"));
    }

    #[test]
    fn sequence_first_is_first_element() {
        let value = TagValue::Sequence(vec!["2021".to_string(), "2019".to_string()]);
        assert_eq!(value.first(), Some("2021"));
    }

    #[test]
    fn empty_sequence_has_no_first() {
        assert_eq!(TagValue::Sequence(Vec::new()).first(), None);
    }

    #[test]
    fn push_promotes_repeated_keys_to_sequence() {
        let mut set = TagSet::new();
        set.push("DATE", "2020");
        assert_eq!(set.get("DATE"), Some(&TagValue::Scalar("2020".to_string())));

        set.push("DATE", "2021");
        set.push("DATE", "2022");
        assert_eq!(
            set.get("DATE"),
            Some(&TagValue::Sequence(vec![
                "2020".to_string(),
                "2021".to_string(),
                "2022".to_string()
            ]))
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn merge_missing_keeps_existing_values() {
        let mut primary: TagSet = [("TDRC", TagValue::Scalar("2023".to_string()))]
            .into_iter()
            .collect();
        let secondary: TagSet = [
            ("TDRC", TagValue::Scalar("1999".to_string())),
            ("YEAR", TagValue::Scalar("1998".to_string())),
        ]
        .into_iter()
        .collect();

        primary.merge_missing(secondary);

        assert_eq!(primary.get("TDRC").and_then(TagValue::first), Some("2023"));
        assert_eq!(primary.get("YEAR").and_then(TagValue::first), Some("1998"));
    }

    #[test]
    fn keys_are_case_sensitive() {
        let set: TagSet = [("\u{a9}day", TagValue::Scalar("2010".to_string()))]
            .into_iter()
            .collect();
        assert!(set.contains_key("\u{a9}day"));
        assert!(!set.contains_key("\u{a9}DAY"));
    }

    #[test]
    fn ape_keys_are_upper_cased() {
        let mut tag = Tag::new(TagType::Ape);
        assert!(tag.insert_text(ItemKey::Year, "1998".to_string()));

        let set = raw_tag_set(&tag);
        assert_eq!(set.get("YEAR").and_then(TagValue::first), Some("1998"));
        assert!(!set.contains_key("Year"));
    }

    #[test]
    fn id3v2_keys_are_frame_ids() {
        let mut tag = Tag::new(TagType::Id3v2);
        assert!(tag.insert_text(ItemKey::RecordingDate, "2023-05-10T14:22:00".to_string()));

        let set = raw_tag_set(&tag);
        assert_eq!(
            set.get("TDRC").and_then(TagValue::first),
            Some("2023-05-10T14:22:00")
        );
    }

    #[test]
    fn lofty_reader_rejects_empty_wav() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty.wav");
        fs::write(&path, b"").unwrap();

        assert!(LoftyReader.read(&path).is_err());
    }

    #[test]
    fn lofty_reader_rejects_text_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("notes.txt");
        fs::write(&path, "recorded on tuesday").unwrap();

        let err = LoftyReader.read(&path).unwrap_err();
        assert!(matches!(err, ReadError::Format(_)));
        assert!(err.to_string().starts_with("Could not process file with lofty"));
    }

    #[test]
    fn panic_message_extracts_text() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("bad frame");
        assert_eq!(panic_message(payload.as_ref()), "bad frame");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bad atom"));
        assert_eq!(panic_message(payload.as_ref()), "bad atom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "tag reader panicked");
    }
}
