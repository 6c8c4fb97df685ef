use std::{collections::BTreeSet, path::Path};

use serde::Deserialize;

use crate::{error::ConfigError, members::RepoSummary};

const DEFAULT_KEYWORDS: [(&str, &str); 7] = [
    ("machine-learning", "机器学习"),
    ("deep-learning", "深度学习"),
    ("nlp", "NLP"),
    ("cv", "CV"),
    ("data-mining", "数据挖掘"),
    ("recommendation", "推荐系统"),
    ("reinforcement-learning", "强化学习"),
];

const DEFAULT_LANGUAGES: [(&str, &str); 4] = [
    ("python", "机器学习"),
    ("jupyter notebook", "机器学习"),
    ("javascript", "前端开发"),
    ("typescript", "前端开发"),
];

const DEFAULT_FALLBACK: &str = "数据科学";

/// A keyword found in a bio, a repo's topics or its name/description implies `label`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct KeywordRule {
    pub keyword: String,
    pub label: String,
}

/// A repo whose primary language is `language` implies `label`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LanguageRule {
    pub language: String,
    pub label: String,
}

/// The rule table used to tag members with research domains.
///
/// Rules are matched case-insensitively. A keyword rule also fires when
/// its label itself appears in the text, so a bio saying "NLP" or
/// "机器学习" is recognised as well as one saying "nlp".
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DomainRules {
    #[serde(default)]
    pub keywords: Vec<KeywordRule>,
    #[serde(default)]
    pub languages: Vec<LanguageRule>,
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

fn default_fallback() -> String {
    DEFAULT_FALLBACK.to_string()
}

impl Default for DomainRules {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS
                .iter()
                .map(|(keyword, label)| KeywordRule {
                    keyword: keyword.to_string(),
                    label: label.to_string(),
                })
                .collect(),
            languages: DEFAULT_LANGUAGES
                .iter()
                .map(|(language, label)| LanguageRule {
                    language: language.to_string(),
                    label: label.to_string(),
                })
                .collect(),
            fallback: default_fallback(),
        }
    }
}

impl DomainRules {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    fn match_keywords(&self, text: &str, domains: &mut BTreeSet<String>) {
        for rule in &self.keywords {
            if text.contains(&rule.keyword.to_lowercase())
                || text.contains(&rule.label.to_lowercase())
            {
                domains.insert(rule.label.clone());
            }
        }
    }

    /// Infer the domains of a member from their bio and repositories
    /// (topics, name, description and primary language).
    /// Never returns an empty set: without any match the fallback label is used.
    pub fn infer_domains(&self, repos: &[RepoSummary], bio: &str) -> BTreeSet<String> {
        let mut domains = BTreeSet::new();

        self.match_keywords(&bio.to_lowercase(), &mut domains);

        for repo in repos {
            let text = format!(
                "{} {}",
                repo.name,
                repo.description.as_deref().unwrap_or_default()
            )
            .to_lowercase();
            self.match_keywords(&text, &mut domains);

            if !repo.topics.is_empty() {
                self.match_keywords(&repo.topics.join(" ").to_lowercase(), &mut domains);
            }

            if let Some(language) = &repo.language {
                let language = language.to_lowercase();
                domains.extend(
                    self.languages
                        .iter()
                        .filter(|rule| rule.language.to_lowercase() == language)
                        .map(|rule| rule.label.clone()),
                );
            }
        }

        if domains.is_empty() {
            domains.insert(self.fallback.clone());
        }
        domains
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str, description: &str, language: Option<&str>) -> RepoSummary {
        RepoSummary {
            name: name.to_string(),
            description: Some(description.to_string()),
            language: language.map(str::to_string),
            ..Default::default()
        }
    }

    fn set(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn keyword_and_language_both_apply() {
        let rules = DomainRules::default();
        let domains = rules.infer_domains(&[repo("nlp-toolkit", "", Some("Python"))], "");
        assert!(domains.contains("NLP"));
        assert!(domains.contains("机器学习"));
    }

    #[test]
    fn nothing_to_go_on_yields_fallback() {
        let rules = DomainRules::default();
        assert_eq!(rules.infer_domains(&[], ""), set(&["数据科学"]));
    }

    #[test]
    fn bio_matches_keywords_and_labels() {
        let rules = DomainRules::default();
        assert_eq!(
            rules.infer_domains(&[], "Working on Deep-Learning and 推荐系统"),
            set(&["深度学习", "推荐系统"])
        );
    }

    #[test]
    fn language_rules_are_case_insensitive() {
        let rules = DomainRules::default();
        let repos = [
            repo("site", "", Some("TypeScript")),
            repo("notes", "", Some("Jupyter Notebook")),
            repo("tool", "", Some("Rust")),
        ];
        assert_eq!(rules.infer_domains(&repos, ""), set(&["前端开发", "机器学习"]));
    }

    #[test]
    fn missing_description_is_not_a_problem() {
        let rules = DomainRules::default();
        let repos = [RepoSummary {
            name: "data-mining-course".to_string(),
            ..Default::default()
        }];
        assert_eq!(rules.infer_domains(&repos, ""), set(&["数据挖掘"]));
    }

    #[test]
    fn repo_topics_are_matched() {
        let rules = DomainRules::default();
        let repos = [RepoSummary {
            name: "homework".to_string(),
            topics: vec!["Recommendation".to_string(), "cv".to_string()],
            ..Default::default()
        }];
        assert_eq!(rules.infer_domains(&repos, ""), set(&["CV", "推荐系统"]));
    }

    #[test]
    fn result_does_not_depend_on_repo_order() {
        let rules = DomainRules::default();
        let mut repos = vec![
            repo("cv-models", "", None),
            repo("web", "A reinforcement-learning playground", Some("JavaScript")),
            repo("nlp", "", Some("Python")),
        ];
        let first = rules.infer_domains(&repos, "machine-learning");
        repos.reverse();
        assert_eq!(rules.infer_domains(&repos, "machine-learning"), first);
        assert_eq!(rules.infer_domains(&repos, "machine-learning"), first);
    }

    #[test]
    fn rules_load_from_toml() {
        let rules = DomainRules::from_toml(
            r#"
            fallback = "Other"

            [[keywords]]
            keyword = "llm"
            label = "LLM"

            [[languages]]
            language = "go"
            label = "后端开发"
            "#,
            Path::new("inline.toml"),
        )
        .unwrap();

        assert_eq!(rules.infer_domains(&[], "llm agents"), set(&["LLM"]));
        assert_eq!(
            rules.infer_domains(&[repo("svc", "", Some("Go"))], ""),
            set(&["后端开发"])
        );
        assert_eq!(rules.infer_domains(&[], ""), set(&["Other"]));
    }

    #[test]
    fn bundled_rules_file_parses() {
        let rules = DomainRules::from_toml(
            include_str!("../domain-rules.toml"),
            Path::new("domain-rules.toml"),
        )
        .unwrap();
        assert_eq!(rules.fallback, "数据科学");
        assert!(rules
            .infer_domains(&[repo("computer-vision-notes", "", None)], "")
            .contains("CV"));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = DomainRules::from_toml("keywords = 3", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
