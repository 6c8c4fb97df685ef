use std::collections::BTreeSet;

use colored::Colorize;
use urlencoding::encode;

use crate::{client::GitHubClient, error::ApiError};

/// GitHub returns at most this many members on a single page
pub const MEMBERS_PAGE_SIZE: u8 = 100;

/// Repositories inspected per member unless configured otherwise
pub const DEFAULT_MAX_REPOS: u8 = 10;

/// An entry of `/orgs/{org}/members`
#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
pub struct OrgMember {
    pub login: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl OrgMember {
    pub fn profile_url(&self) -> String {
        match &self.html_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("https://github.com/{}", self.login),
        }
    }
}

/// The parts of `/users/{login}` we care about
#[derive(Debug, Clone, Default, serde::Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub public_repos: u32,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
}

#[derive(Debug, Clone, Default, serde::Deserialize, PartialEq, Eq)]
pub struct RepoSummary {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub stargazers_count: u32,
}

/// Activity numbers reported alongside each processed member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberStats {
    pub public_repos: u32,
    pub followers: u32,
    pub following: u32,
    /// Stars summed over the inspected repositories only
    pub total_stars: u64,
}

impl MemberStats {
    /// Without a profile every counter is zero, stars included.
    pub fn new(profile: Option<&UserProfile>, repos: &[RepoSummary]) -> Self {
        let Some(profile) = profile else {
            return Self::default();
        };
        Self {
            public_repos: profile.public_repos,
            followers: profile.followers,
            following: profile.following,
            total_stars: repos.iter().map(|r| u64::from(r.stargazers_count)).sum(),
        }
    }
}

/// A fully processed organization member, as written to the snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub github: String,
    pub domains: BTreeSet<String>,
}

impl Member {
    /// Merge what the API told us about a member. The display name falls
    /// back to the login when the profile is missing or has no name.
    pub fn new(
        org_member: &OrgMember,
        profile: Option<&UserProfile>,
        domains: BTreeSet<String>,
    ) -> Self {
        let name = profile
            .and_then(|p| p.name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(org_member.login.as_str())
            .to_string();

        Self {
            id: org_member.login.clone(),
            name,
            github: org_member.profile_url(),
            domains,
        }
    }
}

/// List the organization members. Only the first page is requested.
pub fn list_members(client: &GitHubClient, org: &str) -> Result<Vec<OrgMember>, ApiError> {
    println!(
        "{} {}{}",
        "I'm going to fetch the members of".yellow(),
        org.white(),
        "...".yellow()
    );

    let members: Vec<OrgMember> = client.request(&client.url(&format!(
        "/orgs/{}/members?per_page={MEMBERS_PAGE_SIZE}",
        encode(org)
    )))?;

    println!(
        "{} {}",
        "Success! I found:".green(),
        members.len().to_string().white()
    );
    Ok(members)
}

/// Fetch a user's profile. Failures are logged and reported as `None`.
pub fn fetch_profile(client: &GitHubClient, login: &str) -> Option<UserProfile> {
    match client.request(&client.url(&format!("/users/{}", encode(login)))) {
        Ok(profile) => Some(profile),
        Err(e) => {
            println!(
                "{} {}: {e}",
                "Warning! I couldn't fetch the profile of".yellow(),
                login.white()
            );
            None
        }
    }
}

/// Fetch the `max` most recently updated repositories of a user.
/// Failures are logged and reported as an empty list.
pub fn fetch_repos(client: &GitHubClient, login: &str, max: u8) -> Vec<RepoSummary> {
    match client.request(&client.url(&format!(
        "/users/{}/repos?sort=updated&per_page={max}",
        encode(login)
    ))) {
        Ok(repos) => repos,
        Err(e) => {
            println!(
                "{} {}: {e}",
                "Warning! I couldn't fetch the repositories of".yellow(),
                login.white()
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org_member(login: &str, html_url: Option<&str>) -> OrgMember {
        OrgMember {
            login: login.to_string(),
            html_url: html_url.map(str::to_string),
        }
    }

    #[test]
    fn name_falls_back_to_login() {
        let m = org_member("octocat", Some("https://github.com/octocat"));

        let member = Member::new(&m, None, BTreeSet::new());
        assert_eq!(member.name, "octocat");

        let blank = UserProfile {
            login: "octocat".to_string(),
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(Member::new(&m, Some(&blank), BTreeSet::new()).name, "octocat");

        let named = UserProfile {
            name: Some("The Octocat".to_string()),
            ..blank
        };
        let member = Member::new(&m, Some(&named), BTreeSet::new());
        assert_eq!(member.name, "The Octocat");
        assert_eq!(member.id, "octocat");
        assert_eq!(member.github, "https://github.com/octocat");
    }

    #[test]
    fn profile_url_is_derived_when_missing() {
        assert_eq!(
            org_member("someone", None).profile_url(),
            "https://github.com/someone"
        );
    }

    #[test]
    fn deserializes_api_payloads() {
        let members: Vec<OrgMember> = serde_json::from_str(
            r#"[{"login":"a","id":1,"html_url":"https://github.com/a","site_admin":false}]"#,
        )
        .unwrap();
        assert_eq!(members[0].login, "a");

        let repo: RepoSummary =
            serde_json::from_str(r#"{"name":"r","description":null,"language":"Rust","fork":false}"#)
                .unwrap();
        assert_eq!(repo.description, None);
        assert_eq!(repo.language.as_deref(), Some("Rust"));
        assert!(repo.topics.is_empty());
        assert_eq!(repo.stargazers_count, 0);
    }

    #[test]
    fn stats_sum_stars_over_inspected_repos() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"login":"a","public_repos":12,"followers":30,"following":4}"#,
        )
        .unwrap();
        let repos: Vec<RepoSummary> = serde_json::from_str(
            r#"[{"name":"x","stargazers_count":5,"topics":["nlp"]},{"name":"y","stargazers_count":7}]"#,
        )
        .unwrap();
        assert_eq!(repos[0].topics, vec!["nlp"]);

        assert_eq!(
            MemberStats::new(Some(&profile), &repos),
            MemberStats {
                public_repos: 12,
                followers: 30,
                following: 4,
                total_stars: 12,
            }
        );
        assert_eq!(MemberStats::new(None, &repos), MemberStats::default());
    }
}
