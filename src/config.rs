use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "readme-pdf-generator";
/// GitHub refuses larger pages.
pub const MAX_PER_PAGE: u32 = 100;
pub const TOKEN_ENV_VAR: &str = "TOKEN_GITHUB";

/// Everything one export run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub account: String,
    pub output_dir: PathBuf,
    /// Number of repositories processed at once; 1 keeps the run sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// TrueType/OpenType file used for all text instead of the bundled fonts.
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default)]
    pub github: GithubConfig,
}

/// Connection settings for the GitHub REST API.
#[derive(Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Never read from a config file; injected from the environment.
    #[serde(skip)]
    pub token: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            per_page: default_per_page(),
            token: String::new(),
            request_timeout_secs: None,
        }
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("api_base", &self.api_base)
            .field("user_agent", &self.user_agent)
            .field("per_page", &self.per_page)
            .field("token_len", &self.token.len())
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_per_page() -> u32 {
    MAX_PER_PAGE
}

impl ExportConfig {
    pub fn trace_loaded(&self) {
        info!(
            account = %self.account,
            output_dir = %self.output_dir.display(),
            concurrency = self.concurrency,
            font = ?self.font,
            api_base = %self.github.api_base,
            "Loaded ExportConfig"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_token() {
        let github = GithubConfig {
            token: "ghp_secret".into(),
            ..GithubConfig::default()
        };
        let rendered = format!("{github:?}");
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("token_len: 10"));
    }

    #[test]
    fn yaml_defaults_fill_missing_github_section() {
        let cfg: ExportConfig =
            serde_yaml::from_str("account: octocat\noutput_dir: ./pdfs\n").unwrap();
        assert_eq!(cfg.concurrency, 1);
        assert!(cfg.font.is_none());
        assert_eq!(cfg.github.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.github.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(cfg.github.per_page, 100);
        assert!(cfg.github.token.is_empty());
    }
}
