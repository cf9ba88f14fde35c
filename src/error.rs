use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration problems. A scan must not start with an invalid
/// configuration, so these are reported before any traversal begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("similarity threshold {0} is out of range (expected 0..=10)")]
    SimilarityThreshold(u32),

    #[error("histogram threshold {0} is out of range (expected 0.0..=1.0)")]
    HistThreshold(f64),

    #[error("no supported file extensions configured")]
    NoExtensions,
}

/// A file exists but could not be read or decoded as an image.
///
/// Recovered locally: the file is excluded from all groups and the scan
/// continues with the remaining files.
#[derive(Debug, Error)]
#[error("{}: {source}", path.display())]
pub struct DecodeError {
    pub path: PathBuf,
    #[source]
    pub source: DecodeFailure,
}

#[derive(Debug, Error)]
pub enum DecodeFailure {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors that abort a scan before it produces any groups.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scan root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("scan cancelled")]
    Cancelled,
}

/// Non-fatal per-file problems surfaced to the caller after a scan.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanWarning {
    /// File matched the extension filter but could not be decoded.
    Decode { path: PathBuf, message: String },
    /// A directory entry could not be read during traversal.
    Traversal {
        path: Option<PathBuf>,
        message: String,
    },
}

impl ScanWarning {
    pub fn message(&self) -> &str {
        match self {
            ScanWarning::Decode { message, .. } => message,
            ScanWarning::Traversal { message, .. } => message,
        }
    }
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanWarning::Decode { path, message } => {
                write!(f, "skipped {}: {}", path.display(), message)
            }
            ScanWarning::Traversal {
                path: Some(path),
                message,
            } => write!(f, "could not read {}: {}", path.display(), message),
            ScanWarning::Traversal {
                path: None,
                message,
            } => write!(f, "traversal error: {}", message),
        }
    }
}
