use crate::date::parse_tag_date;
use crate::error::{Error, Result};
use crate::record::{MetadataRecord, RecordedOnSource};
use crate::tags::{LoftyReader, TagReader, TagSet};
use chrono::{DateTime, Utc};
use std::fs::{self, Metadata};
use std::io::ErrorKind;
use std::path::{self, Path, PathBuf};
use tracing::{debug, warn};

/// Tag keys that may carry the recording date, most authoritative first.
///
/// ID3v2 recording time, MP4 `©day`, ID3v2 original release and release
/// time, Vorbis/APE `DATE`, ID3v2.3 year and day-month, Vorbis/APE `YEAR`.
/// Vorbis and APE keys arrive upper-cased from the reader.
pub const DATE_TAGS: &[&str] = &[
    "TDRC", "\u{a9}day", "TDOR", "TDRL", "DATE", "TYER", "TDAT", "YEAR",
];

/// Which filesystem timestamp the fallback date was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampKind {
    Created,
    Modified,
}

/// Extract metadata from `path` using lofty.
pub fn extract_metadata(path: impl AsRef<Path>) -> Result<MetadataRecord> {
    extract_metadata_with(path, &LoftyReader)
}

/// Extract metadata from `path` using `reader` to open the media container.
///
/// Only a missing file is an error. A reader failure is recorded in
/// [`MetadataRecord::error`] and the recording date falls back to the
/// filesystem.
pub fn extract_metadata_with<R>(path: impl AsRef<Path>, reader: &R) -> Result<MetadataRecord>
where
    R: TagReader + ?Sized,
{
    let path = path.as_ref();

    let attrs = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let filepath = absolute_path(path);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let modified = attrs.modified().map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut record = MetadataRecord {
        filepath: filepath.to_string_lossy().to_string(),
        filename,
        file_size_bytes: attrs.len(),
        file_modified_on: DateTime::<Utc>::from(modified),
        recorded_on: None,
        recorded_on_source: RecordedOnSource::None,
        technical: None,
        error: None,
    };

    match reader.read(path) {
        Ok(media) => {
            record.technical = Some(media.info);
            if let Some((key, instant)) = recorded_on_from_tags(&media.tags) {
                debug!(path = %path.display(), key, "recording date taken from tag");
                record.recorded_on = Some(instant);
                record.recorded_on_source = RecordedOnSource::Tag;
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "tag reader failed");
            record.error = Some(e.to_string());
        }
    }

    if record.recorded_on.is_none() {
        let (instant, kind) = filesystem_timestamp(&attrs, modified);
        debug!(path = %path.display(), ?kind, "recording date taken from filesystem");
        record.recorded_on = Some(instant);
        record.recorded_on_source = RecordedOnSource::FilesystemFallback;
    }

    Ok(record)
}

/// Canonical path when it resolves, otherwise the path made absolute
/// against the working directory.
fn absolute_path(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Search [`DATE_TAGS`] in order and return the first key whose value parses
/// as a date.
pub fn recorded_on_from_tags(tags: &TagSet) -> Option<(&'static str, DateTime<Utc>)> {
    DATE_TAGS
        .iter()
        .find_map(|&key| try_date_tag(tags, key).map(|instant| (key, instant)))
}

fn try_date_tag(tags: &TagSet, key: &str) -> Option<DateTime<Utc>> {
    let raw = tags.get(key)?.first()?.trim();
    let parsed = parse_tag_date(raw);
    if parsed.is_none() {
        debug!(key, value = raw, "tag value is not a recognizable date");
    }
    parsed
}

/// Creation time when the platform records one, otherwise `modified`.
pub fn filesystem_timestamp(
    attrs: &Metadata,
    modified: std::time::SystemTime,
) -> (DateTime<Utc>, TimestampKind) {
    match attrs.created() {
        Ok(created) => (DateTime::<Utc>::from(created), TimestampKind::Created),
        Err(_) => (DateTime::<Utc>::from(modified), TimestampKind::Modified),
    }
}
