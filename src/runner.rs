use std::{path::PathBuf, time::Duration};

use colored::Colorize;

use crate::{
    client::GitHubClient,
    domains::DomainRules,
    error::RunError,
    members::{self, Member, MemberStats, OrgMember, DEFAULT_MAX_REPOS},
    snapshot::SnapshotStore,
};

/// Members processed per run unless configured otherwise
pub const DEFAULT_MAX_MEMBERS: usize = 50;

/// Pause between two members with and without a token
pub const THROTTLE_WITH_TOKEN: Duration = Duration::from_millis(50);
pub const THROTTLE_WITHOUT_TOKEN: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub org: String,
    pub max_members: usize,
    pub max_repos: u8,
}

impl RunSettings {
    pub fn new(org: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            max_members: DEFAULT_MAX_MEMBERS,
            max_repos: DEFAULT_MAX_REPOS,
        }
    }
}

/// What happened to the members of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    /// Enumerated records that couldn't be turned into a member
    pub skipped: usize,
    /// Members written without their profile
    pub degraded: usize,
}

#[derive(Debug)]
pub enum Outcome {
    /// A new snapshot was written
    Success {
        summary: RunSummary,
        backup: Option<PathBuf>,
    },
    /// GitHub returned no members, the existing snapshot stays
    KeepExisting,
    /// The run failed but the existing snapshot stays
    FallbackSuccess { error: RunError },
    /// The run failed and there is no snapshot to fall back on
    Fatal { error: Option<RunError> },
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Success { .. } | Outcome::KeepExisting | Outcome::FallbackSuccess { .. } => 0,
            Outcome::Fatal { .. } => 1,
        }
    }
}

enum State {
    CheckExisting,
    Backup,
    Fetch,
    ProcessEach(Vec<OrgMember>),
    Write(Vec<Member>, RunSummary),
}

pub struct Runner<'a> {
    client: &'a GitHubClient,
    rules: &'a DomainRules,
    snapshot: SnapshotStore,
    settings: RunSettings,
    has_existing: bool,
}

impl<'a> Runner<'a> {
    pub fn new(
        client: &'a GitHubClient,
        rules: &'a DomainRules,
        snapshot: SnapshotStore,
        settings: RunSettings,
    ) -> Self {
        Self {
            client,
            rules,
            snapshot,
            settings,
            has_existing: false,
        }
    }

    /// Run the job to completion. Errors never escape: they end up in the outcome.
    pub fn run(mut self) -> Outcome {
        let mut state = State::CheckExisting;
        loop {
            state = match state {
                State::CheckExisting => {
                    self.has_existing = self.snapshot.exists();
                    if self.has_existing {
                        State::Backup
                    } else {
                        println!(
                            "{}",
                            "I don't see an existing snapshot so I'm going to assume this is the first run."
                                .yellow()
                        );
                        State::Fetch
                    }
                }
                State::Backup => match self.snapshot.backup() {
                    Ok(_) => State::Fetch,
                    Err(e) => return self.fail(e.into()),
                },
                State::Fetch => match members::list_members(self.client, &self.settings.org) {
                    Ok(found) if found.is_empty() => return self.no_members(),
                    Ok(found) => State::ProcessEach(found),
                    Err(e) => return self.fail(e.into()),
                },
                State::ProcessEach(found) => {
                    let enumerated = found.len();
                    let (processed, summary) = self.process_each(found);
                    if processed.is_empty() {
                        return self.fail(RunError::NoMembersProcessed(enumerated));
                    }
                    State::Write(processed, summary)
                }
                State::Write(processed, summary) => match self.snapshot.commit(&processed) {
                    Ok(()) => {
                        print_summary(&summary);
                        return Outcome::Success {
                            summary,
                            backup: self.snapshot.last_backup().map(|p| p.to_path_buf()),
                        };
                    }
                    Err(e) => return self.fail(e.into()),
                },
            };
        }
    }

    fn process_each(&self, found: Vec<OrgMember>) -> (Vec<Member>, RunSummary) {
        let total = found.len().min(self.settings.max_members);
        let throttle = if self.client.has_token() {
            THROTTLE_WITH_TOKEN
        } else {
            THROTTLE_WITHOUT_TOKEN
        };

        let mut processed = Vec::with_capacity(total);
        let mut summary = RunSummary::default();

        for (i, org_member) in found.into_iter().take(total).enumerate() {
            if org_member.login.trim().is_empty() {
                println!(
                    "{} {}",
                    "Warning! Skipping a member record without a login at position".yellow(),
                    (i + 1).to_string().white()
                );
                summary.skipped += 1;
                continue;
            }

            println!(
                "{} {}/{}: {}",
                "Processing member".yellow(),
                (i + 1).to_string().white(),
                total.to_string().white(),
                org_member.login.white()
            );

            let profile = members::fetch_profile(self.client, &org_member.login);
            let repos = members::fetch_repos(self.client, &org_member.login, self.settings.max_repos);
            if profile.is_none() {
                summary.degraded += 1;
            }

            let bio = profile
                .as_ref()
                .and_then(|p| p.bio.as_deref())
                .unwrap_or_default();
            let domains = self.rules.infer_domains(&repos, bio);
            print_stats(&MemberStats::new(profile.as_ref(), &repos));
            processed.push(Member::new(&org_member, profile.as_ref(), domains));
            summary.processed += 1;

            self.client.pause(throttle);
        }

        (processed, summary)
    }

    fn no_members(&self) -> Outcome {
        println!("{}", "Warning! I didn't find any members".yellow());
        if self.has_existing {
            println!("{}", "I'm keeping the existing snapshot".green());
            self.snapshot.tidy_backups();
            self.report_existing();
            Outcome::KeepExisting
        } else {
            println!(
                "{}",
                "There is no existing snapshot and no new data. Giving up.".red()
            );
            Outcome::Fatal { error: None }
        }
    }

    fn fail(&self, error: RunError) -> Outcome {
        println!("{}: {error}", "The member snapshot failed".red());
        if self.has_existing {
            println!(
                "{}",
                "I'm going to keep using the existing snapshot".yellow()
            );
            if !self.client.has_token() {
                println!(
                    "{}",
                    "Hint: setting GITHUB_TOKEN avoids most rate limiting".yellow()
                );
            }
            self.snapshot.tidy_backups();
            self.report_existing();
            Outcome::FallbackSuccess { error }
        } else {
            println!(
                "{}",
                "There is no existing snapshot to fall back on. Giving up.".red()
            );
            Outcome::Fatal { error: Some(error) }
        }
    }

    fn report_existing(&self) {
        match self.snapshot.read() {
            Ok(records) => println!(
                "{} {} {}",
                "The existing snapshot holds".green(),
                records.len().to_string().white(),
                "members".green()
            ),
            Err(e) => println!("{}: {e}", "Warning! I couldn't read the existing snapshot".yellow()),
        }
    }
}

fn print_stats(stats: &MemberStats) {
    println!(
        "  {} {} {} {} {} {} {} {}",
        "public repos:".yellow(),
        stats.public_repos.to_string().white(),
        "stars:".yellow(),
        stats.total_stars.to_string().white(),
        "followers:".yellow(),
        stats.followers.to_string().white(),
        "following:".yellow(),
        stats.following.to_string().white()
    );
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} {} {} {} {} {} {}",
        "Done! I processed".green(),
        summary.processed.to_string().white(),
        "members, skipped".green(),
        summary.skipped.to_string().white(),
        "and wrote".green(),
        summary.degraded.to_string().white(),
        "without their profile".green()
    );
}
