//! Group resolution: the filesystem mutations applied once a user (or a
//! non-interactive command) has decided what to do with a duplicate group.
//! The detection engine never touches files; these collaborators consume its
//! output.

use crate::grouping::Group;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Delete every member except the representative. Returns the deleted paths.
pub fn delete_rest(group: &Group) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    for path in &group.members()[1..] {
        fs::remove_file(path).with_context(|| format!("failed to delete {}", path.display()))?;
        deleted.push(path.clone());
    }
    Ok(deleted)
}

/// Delete the members at `indices` (stable positions within the group).
/// Any index may be selected, including the representative's. Out-of-range
/// indices are an error; nothing is deleted in that case.
pub fn delete_selected(group: &Group, indices: &[usize]) -> Result<Vec<PathBuf>> {
    for &i in indices {
        if i >= group.len() {
            anyhow::bail!(
                "selection index {} is out of range for a group of {}",
                i,
                group.len()
            );
        }
    }
    let mut deleted = Vec::new();
    for &i in indices {
        let path = &group.members()[i];
        fs::remove_file(path).with_context(|| format!("failed to delete {}", path.display()))?;
        deleted.push(path.clone());
    }
    Ok(deleted)
}

/// Move every member except the representative into `backup_dir`, creating
/// it if needed. Returns the original paths of the moved files.
pub fn move_rest_to_backup(group: &Group, backup_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(backup_dir)
        .with_context(|| format!("failed to create backup directory {:?}", backup_dir))?;

    let mut moved = Vec::new();
    for path in &group.members()[1..] {
        let file_name = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?;
        let dest = backup_dir.join(file_name);
        fs::rename(path, &dest)
            .with_context(|| format!("failed to move {:?} -> {:?}", path, dest))?;
        moved.push(path.clone());
    }
    Ok(moved)
}
