//! Error types for the member snapshot job.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures of a single request chain against the GitHub API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("GitHub API rate limit exhausted, it resets at {}", describe_reset(.reset_at))]
    RateLimitExceeded { reset_at: Option<DateTime<Utc>> },

    #[error("Request to {url} failed after {attempts} attempts: {last_error}")]
    RequestFailed {
        url: String,
        attempts: u8,
        last_error: String,
    },

    #[error("Could not build the HTTP client: {0}")]
    Client(String),
}

fn describe_reset(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => at.to_rfc3339(),
        None => "an unknown time".to_string(),
    }
}

/// Filesystem failures around the snapshot and its backups.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Could not back up {path}: {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not serialize snapshot {path}: {source}")]
    Serialize { path: PathBuf, source: csv::Error },

    #[error("Could not remove old backup {path}: {source}")]
    Prune {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not list backups in {path}: {source}")]
    List {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("Could not read snapshot {path}: {source}")]
    Read { path: PathBuf, source: csv::Error },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read rules file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse rules file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Batch level failures, caught once by the orchestrator.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("None of the {0} enumerated members could be processed")]
    NoMembersProcessed(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_message_names_the_reset_time() {
        let reset_at = DateTime::from_timestamp(1_700_000_000, 0);
        let err = ApiError::RateLimitExceeded { reset_at };
        assert!(err.to_string().contains("2023-11-14T22:13:20"));

        let err = ApiError::RateLimitExceeded { reset_at: None };
        assert!(err.to_string().contains("an unknown time"));
    }
}
