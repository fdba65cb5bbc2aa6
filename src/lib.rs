//! Technical metadata and a normalized recording date for a single media file.
//!
//! ```no_run
//! let record = media_meta::extract_metadata("take1.flac")?;
//! println!("{} recorded {:?}", record.filename, record.recorded_on_iso());
//! # Ok::<(), media_meta::Error>(())
//! ```

pub mod date;
pub mod error;
pub mod extract;
pub mod record;
pub mod tags;

pub use date::{normalize_tag_date, parse_tag_date};
pub use error::{Error, Result};
pub use extract::{extract_metadata, extract_metadata_with, DATE_TAGS};
pub use record::{MetadataRecord, RecordedOnSource};
pub use tags::{LoftyReader, ReadError, TagReader, TagSet, TagValue, TaggedMedia, TechnicalInfo};
