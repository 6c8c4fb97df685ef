use std::{collections::HashSet, io::Write, path::Path};

use colored::Colorize;

use crate::{error::PersistenceError, members::Member};

pub const HEADER: &str = "id,name,github,domain";

/// Separator between domain labels inside the `domain` column
pub const DOMAIN_SEPARATOR: &str = ";";

/// A row of a snapshot, as read back by consumers
#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub id: String,
    pub name: String,
    pub github: String,
    pub domain: String,
}

impl SnapshotRecord {
    pub fn domains(&self) -> Vec<&str> {
        self.domain
            .split(DOMAIN_SEPARATOR)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect()
    }
}

/// Write the header and one row per member. Every row field is quoted,
/// embedded quotes are doubled by the writer.
pub(crate) fn write_members(mut writer: impl Write, members: &[Member]) -> Result<(), csv::Error> {
    writeln!(writer, "{HEADER}")?;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);

    for member in members {
        let domains = member
            .domains
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(DOMAIN_SEPARATOR);
        wtr.write_record([
            member.id.as_str(),
            member.name.as_str(),
            member.github.as_str(),
            domains.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Parse a snapshot file. Rows that don't fit the header are reported and skipped.
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Vec<SnapshotRecord>, PersistenceError> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(reader
        .deserialize()
        .filter_map(|row: Result<SnapshotRecord, _>| match row {
            Ok(record) => Some(record),
            Err(e) => {
                println!("{}: {e}", "Couldn't parse a snapshot row".red());
                None
            }
        })
        .collect())
}

/// The set of member logins in a snapshot
pub fn member_ids(records: &[SnapshotRecord]) -> HashSet<String> {
    records
        .iter()
        .map(|r| r.id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_member(login: &str, ids: &HashSet<String>) -> bool {
    !login.is_empty() && ids.contains(login)
}
