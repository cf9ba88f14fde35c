//! Directory traversal and the full scan pipeline.
//!
//! One scan is a single deterministic pass: walk the tree collecting
//! qualifying paths in traversal order, decode and fingerprint them in
//! parallel, then feed the records to the grouping session strictly in
//! traversal order. Rayon's ordered collect re-serializes worker output, so
//! parallel extraction cannot perturb group membership.

use crate::config::ScanConfig;
use crate::error::{DecodeError, ScanError, ScanWarning};
use crate::fingerprint::FingerprintExtractor;
use crate::grouping::{Group, ImageRecord, ScanSession};
use crate::histogram::HueSatHistogram;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Result of one scan: duplicate groups in creation order, plus the per-file
/// problems that were skipped over along the way.
#[derive(Debug)]
pub struct ScanOutcome {
    pub groups: Vec<Group>,
    pub warnings: Vec<ScanWarning>,
}

/// Scan `root` for near-duplicate images.
///
/// Configuration errors are fatal and reported before any traversal. Decode
/// and traversal failures never abort the scan; they surface as warnings and
/// the group list reflects the successfully processed subset. `cancel` is
/// checked before each file for best-effort abort.
pub fn scan(
    root: &Path,
    config: &ScanConfig,
    cancel: &AtomicBool,
) -> Result<ScanOutcome, ScanError> {
    let mut session = ScanSession::new(config)?;
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut warnings = Vec::new();
    let paths = collect_image_paths(root, config, cancel, &mut warnings)?;
    debug!(count = paths.len(), "traversal complete");

    let extractor = FingerprintExtractor::new();
    let extracted: Vec<Option<Result<ImageRecord, DecodeError>>> = paths
        .par_iter()
        .map(|path| {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            Some(extract_record(&extractor, path))
        })
        .collect();

    if cancel.load(Ordering::Relaxed) {
        return Err(ScanError::Cancelled);
    }

    for result in extracted.into_iter().flatten() {
        match result {
            Ok(record) => session.insert(record),
            Err(err) => {
                warn!(path = %err.path.display(), "decode failed: {}", err.source);
                warnings.push(ScanWarning::Decode {
                    path: err.path,
                    message: err.source.to_string(),
                });
            }
        }
    }

    let groups = session.finish();
    debug!(groups = groups.len(), warnings = warnings.len(), "scan complete");
    Ok(ScanOutcome { groups, warnings })
}

/// Walk `root` recursively and return qualifying image paths in traversal
/// order. Unreadable entries become warnings; non-matching extensions are
/// silently skipped.
fn collect_image_paths(
    root: &Path,
    config: &ScanConfig,
    cancel: &AtomicBool,
    warnings: &mut Vec<ScanWarning>,
) -> Result<Vec<PathBuf>, ScanError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root) {
        if cancel.load(Ordering::Relaxed) {
            return Err(ScanError::Cancelled);
        }
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_file() && config.matches_extension(path) {
                    paths.push(path.to_path_buf());
                }
            }
            Err(err) => {
                warn!("traversal error: {err}");
                warnings.push(ScanWarning::Traversal {
                    path: err.path().map(Path::to_path_buf),
                    message: err.to_string(),
                });
            }
        }
    }
    Ok(paths)
}

fn extract_record(
    extractor: &FingerprintExtractor,
    path: &Path,
) -> Result<ImageRecord, DecodeError> {
    let (image, fingerprint) = extractor.fingerprint_file(path)?;
    let histogram = HueSatHistogram::of_image(&image);
    Ok(ImageRecord {
        path: path.to_path_buf(),
        fingerprint,
        histogram,
    })
}
