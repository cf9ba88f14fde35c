use crate::error::ConfigError;
use std::path::Path;

/// Hamming-distance thresholds above this are rejected; a 64-bit hash rarely
/// stays meaningful past ten differing bits.
pub const SIMILARITY_THRESHOLD_MAX: u32 = 10;

pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 5;
pub const DEFAULT_HIST_THRESHOLD: f64 = 0.9;

pub const DEFAULT_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff"];

/// Scan parameters. Set once before a scan; changing thresholds mid-scan is
/// not possible because a running scan holds an immutable reference.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Maximum Hamming distance between a fingerprint and a group
    /// representative's fingerprint for the candidate stage to pass.
    pub similarity_threshold: u32,
    /// Minimum histogram correlation against the representative for the
    /// confirmation stage to pass.
    pub hist_threshold: f64,
    /// Lowercase file extensions considered during traversal. Everything
    /// else is silently skipped.
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            hist_threshold: DEFAULT_HIST_THRESHOLD,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.similarity_threshold > SIMILARITY_THRESHOLD_MAX {
            return Err(ConfigError::SimilarityThreshold(self.similarity_threshold));
        }
        if !(0.0..=1.0).contains(&self.hist_threshold) || self.hist_threshold.is_nan() {
            return Err(ConfigError::HistThreshold(self.hist_threshold));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        Ok(())
    }

    /// Case-insensitive extension filter used by the directory walk.
    pub fn matches_extension(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            }
            None => false,
        }
    }
}
