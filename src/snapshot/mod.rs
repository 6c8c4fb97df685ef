mod backup;
mod csv;

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use colored::Colorize;
use tempfile::NamedTempFile;

use crate::{error::PersistenceError, members::Member};

pub use self::backup::{expired_backups, list_backups, next_stamp, BackupFile};
pub use self::csv::{is_member, member_ids, read_snapshot, SnapshotRecord, HEADER};

/// How many backups survive a successful write
pub const DEFAULT_KEEP_BACKUPS: usize = 3;

/// The current snapshot file and its rotating backups
pub struct SnapshotStore {
    path: PathBuf,
    keep_backups: usize,
    /// Set once the current snapshot has been backed up during this run
    backup: Option<PathBuf>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, keep_backups: usize) -> Self {
        Self {
            path: path.into(),
            keep_backups,
            backup: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn last_backup(&self) -> Option<&Path> {
        self.backup.as_deref()
    }

    /// Copy the current snapshot to a new timestamped backup.
    /// Returns `None` when there is nothing to back up.
    pub fn backup(&mut self) -> Result<Option<PathBuf>, PersistenceError> {
        if !self.exists() {
            return Ok(None);
        }

        let existing = list_backups(&self.path)?;
        let stamp = next_stamp(Utc::now().timestamp_millis(), &existing);
        let backup_path = backup::backup_path(&self.path, stamp);

        fs::copy(&self.path, &backup_path).map_err(|source| PersistenceError::Backup {
            path: self.path.clone(),
            source,
        })?;
        println!(
            "{} {}",
            "I backed up the existing snapshot to".green(),
            backup_path.display().to_string().white()
        );

        self.backup = Some(backup_path.clone());
        Ok(Some(backup_path))
    }

    /// Write `members` as the new snapshot, then prune old backups.
    ///
    /// An existing snapshot that wasn't backed up yet during this run is
    /// backed up first. The rows go to a temporary file in the same
    /// directory that is renamed over the snapshot, so a failed write leaves
    /// the old one intact and no temporary file behind. Once the rename went
    /// through, a failed prune is only a warning.
    pub fn commit(&mut self, members: &[Member]) -> Result<(), PersistenceError> {
        if self.backup.is_none() {
            self.backup()?;
        }

        let write_err = |source: std::io::Error| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = backup::directory(&self.path);
        fs::create_dir_all(&dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        csv::write_members(tmp.as_file_mut(), members).map_err(|source| {
            PersistenceError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;
        if let Ok(metadata) = fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(metadata.permissions())
                .map_err(write_err)?;
        }
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        println!(
            "{} {}: {} {} {}",
            "Successfully written file".green(),
            self.path.display().to_string().white(),
            "There were".green(),
            members.len().to_string().white(),
            "members".green()
        );

        self.tidy_backups();
        Ok(())
    }

    /// Prune old backups, reporting a failure instead of returning it
    pub fn tidy_backups(&self) {
        if let Err(e) = self.prune() {
            println!(
                "{}: {e}",
                "Warning! I couldn't clean up old backups, I am ignoring this and proceeding".yellow()
            );
        }
    }

    /// Delete all but the newest backups. Returns the number of deleted files.
    pub fn prune(&self) -> Result<usize, PersistenceError> {
        let expired = expired_backups(list_backups(&self.path)?, self.keep_backups);
        for backup in &expired {
            fs::remove_file(&backup.path).map_err(|source| PersistenceError::Prune {
                path: backup.path.clone(),
                source,
            })?;
            println!(
                "{} {}",
                "I removed an old backup:".yellow(),
                backup.path.display().to_string().white()
            );
        }
        Ok(expired.len())
    }

    /// Parse the current snapshot
    pub fn read(&self) -> Result<Vec<SnapshotRecord>, PersistenceError> {
        read_snapshot(&self.path)
    }
}
