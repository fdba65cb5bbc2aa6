use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures that cross the extraction boundary.
///
/// Everything the tag reader does wrong is captured into the record instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Media file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Cannot read file attributes for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
