//! Append-only JSONL record of destructive actions, kept next to the photos
//! so `history restore` can undo a move.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const HISTORY_FILE: &str = ".bestkept-history.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Moved,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub kept: String,
    pub removed: Vec<String>,
    pub action: HistoryAction,
    /// Where moved files went; absent for deletions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<String>,
}

impl HistoryRecord {
    pub fn moved(kept: &Path, removed: &[PathBuf], backup_dir: &Path) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kept: kept.to_string_lossy().into_owned(),
            removed: lossy(removed),
            action: HistoryAction::Moved,
            backup_dir: Some(backup_dir.to_string_lossy().into_owned()),
        }
    }

    pub fn deleted(kept: &Path, removed: &[PathBuf]) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kept: kept.to_string_lossy().into_owned(),
            removed: lossy(removed),
            action: HistoryAction::Deleted,
            backup_dir: None,
        }
    }
}

fn lossy(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect()
}

pub fn history_path(root: &Path) -> PathBuf {
    root.join(HISTORY_FILE)
}

pub fn append(root: &Path, record: &HistoryRecord) -> Result<()> {
    let path = history_path(root);
    let mut out = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open history file {:?}", path))?;
    writeln!(out, "{}", serde_json::to_string(record)?)?;
    Ok(())
}

/// Load all well-formed records; malformed lines are skipped with a note on
/// stderr, matching how the file is written (one JSON object per line).
pub fn load(root: &Path) -> Result<Vec<HistoryRecord>> {
    let path = history_path(root);
    let file =
        File::open(&path).with_context(|| format!("could not open history file {:?}", path))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        match serde_json::from_str::<HistoryRecord>(&line) {
            Ok(record) => records.push(record),
            Err(err) => eprintln!("skipping malformed history entry {}: {}", i, err),
        }
    }
    Ok(records)
}

/// Move the files of a `moved` record back to their original locations.
/// Returns the number of files actually restored; missing backups are
/// reported and skipped.
pub fn restore_record(record: &HistoryRecord) -> Result<usize> {
    let backup_dir = match &record.backup_dir {
        Some(dir) => PathBuf::from(dir),
        None => anyhow::bail!("record has no backup directory; only moves can be restored"),
    };

    let mut restored = 0;
    for original in &record.removed {
        let dest = Path::new(original);
        let file_name = dest.file_name().unwrap_or_default();
        let src = backup_dir.join(file_name);

        if !src.exists() {
            eprintln!("backup file {:?} does not exist; skipping", src);
            continue;
        }
        if src == dest {
            eprintln!("source and destination are the same; skipping {:?}", src);
            continue;
        }
        fs::rename(&src, dest)
            .with_context(|| format!("failed to restore {:?} -> {:?}", src, dest))?;
        restored += 1;
    }
    Ok(restored)
}

/// Rewrite the history file keeping only the records at `keep` indices
/// (indices into the `moved`-only view used by restore).
pub fn rewrite(root: &Path, records: &[HistoryRecord]) -> Result<()> {
    let path = history_path(root);
    let mut lines = Vec::with_capacity(records.len());
    for record in records {
        lines.push(serde_json::to_string(record)?);
    }
    let content = if lines.is_empty() {
        String::new()
    } else {
        lines.join("\n") + "\n"
    };
    fs::write(&path, content).with_context(|| format!("failed to update history file {:?}", path))
}
