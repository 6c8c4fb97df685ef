use colored::Colorize;

pub mod client;
pub mod domains;
pub mod error;
pub mod members;
pub mod runner;
pub mod snapshot;

use client::GitHubClient;
use error::ApiError;

pub const DEFAULT_ORG: &str = "datawhalechina";

/// Credentials and organization, read from the environment
pub struct Bootstrap {
    pub token: Option<String>,
    pub org: String,
}

impl Bootstrap {
    /// Read `GITHUB_TOKEN` and `GITHUB_ORG`, after loading a `.env` file if there is one
    pub fn new() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            println!(
                "{} {}",
                "I loaded environment variables from".green(),
                path.display().to_string().white()
            );
        }

        Self::from_vars(
            std::env::var("GITHUB_TOKEN").ok(),
            std::env::var("GITHUB_ORG").ok(),
        )
    }

    pub fn from_vars(token: Option<String>, org: Option<String>) -> Self {
        println!(
            "{}",
            "I'm checking there is a GitHub token in the GITHUB_TOKEN environment variable..."
                .yellow()
        );

        let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        match &token {
            Some(token) => {
                let prefix: String = token.chars().take(4).collect();
                println!("{} {}...", "I have token:".green(), prefix.white());
            }
            None => println!(
                "{}",
                "Warning! GITHUB_TOKEN is not set, I will probably hit GitHub's rate limit".yellow()
            ),
        }

        let org = org
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| DEFAULT_ORG.to_string());
        println!("{} {}", "I have organization:".green(), org.white());

        Self { token, org }
    }

    pub fn client(&self, api_base: &str) -> Result<GitHubClient, ApiError> {
        GitHubClient::new(self.token.clone(), api_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_fall_back() {
        let bootstrap = Bootstrap::from_vars(Some("  ".to_string()), Some(String::new()));
        assert_eq!(bootstrap.token, None);
        assert_eq!(bootstrap.org, DEFAULT_ORG);
    }

    #[test]
    fn values_are_trimmed() {
        let bootstrap =
            Bootstrap::from_vars(Some(" ghp_abc \n".to_string()), Some(" my-org ".to_string()));
        assert_eq!(bootstrap.token.as_deref(), Some("ghp_abc"));
        assert_eq!(bootstrap.org, "my-org");
    }
}
