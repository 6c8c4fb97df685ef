use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use lazy_static::lazy_static;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::PersistenceError;

/// A previous snapshot kept next to the current one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub path: PathBuf,
    /// Epoch milliseconds taken from the file name
    pub stamp: i64,
    pub modified: SystemTime,
}

/// `members.csv` -> `members`
fn stem(snapshot: &Path) -> String {
    snapshot
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The directory holding the snapshot and its backups
pub(super) fn directory(snapshot: &Path) -> PathBuf {
    match snapshot.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

lazy_static! {
    static ref BACKUP_NAME: Regex = Regex::new(r"^(.+)\.backup\.(\d+)\.csv$").unwrap();
}

/// The stamp of `file_name` if it is a backup of a snapshot with this stem
fn backup_stamp(file_name: &str, stem: &str) -> Option<i64> {
    let captures = BACKUP_NAME.captures(file_name)?;
    if &captures[1] != stem {
        return None;
    }
    captures[2].parse().ok()
}

/// `<dir>/<stem>.backup.<stamp>.csv`
pub fn backup_path(snapshot: &Path, stamp: i64) -> PathBuf {
    directory(snapshot).join(format!("{}.backup.{stamp}.csv", stem(snapshot)))
}

/// All backups of `snapshot` in its directory, in no particular order
pub fn list_backups(snapshot: &Path) -> Result<Vec<BackupFile>, PersistenceError> {
    let dir = directory(snapshot);
    let stem = stem(snapshot);
    let mut backups = Vec::new();

    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| PersistenceError::List {
            path: dir.clone(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let Some(stamp) = backup_stamp(&name, &stem) else {
            continue;
        };

        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        backups.push(BackupFile {
            path: entry.into_path(),
            stamp,
            modified,
        });
    }

    Ok(backups)
}

/// Stamp for a new backup: the current time, bumped past the newest
/// existing backup so names stay unique and increasing.
pub fn next_stamp(now_ms: i64, existing: &[BackupFile]) -> i64 {
    existing
        .iter()
        .map(|b| b.stamp + 1)
        .fold(now_ms, i64::max)
}

/// The backups to delete so that only the `keep` newest remain.
/// Newest means the highest stamp, then the latest modification time.
pub fn expired_backups(mut backups: Vec<BackupFile>, keep: usize) -> Vec<BackupFile> {
    backups.sort_by(|a, b| {
        b.stamp
            .cmp(&a.stamp)
            .then_with(|| b.modified.cmp(&a.modified))
    });
    backups.into_iter().skip(keep).collect()
}
