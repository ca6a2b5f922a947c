//! GitHub REST client: repository listing, README lookup and raw content download.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::GithubConfig;
use crate::contract::{
    ContentFetcher, ReadmeFetcher, ReadmeRecord, RepositoryDescriptor, RepositoryLister,
};
use crate::error::{ExportError, RequestStage};

pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// README endpoint payload. Only `download_url` is interpreted.
#[derive(Debug, Deserialize)]
struct ReadmeResponse {
    #[serde(default)]
    download_url: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Holds the connection settings and the bearer token handed over by the config loader.
#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    config: GithubConfig,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Result<Self, ExportError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| {
            error!(error = ?e, "Failed to build HTTP client");
            ExportError::Config(format!("failed to build HTTP client: {e}"))
        })?;
        Ok(Self { http, config })
    }

    fn api_base(&self) -> &str {
        self.config.api_base.trim_end_matches('/') // avoid "//"
    }

    pub fn repos_url(&self, account: &str) -> String {
        format!(
            "{}/users/{}/repos?per_page={}",
            self.api_base(),
            account,
            self.config.per_page
        )
    }

    pub fn readme_url(&self, account: &str, repo_name: &str) -> String {
        format!("{}/repos/{}/{}/readme", self.api_base(), account, repo_name)
    }

    /// Authenticated request with the v3 media type.
    pub(crate) fn api_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .bearer_auth(&self.config.token)
    }
}

#[async_trait::async_trait]
impl RepositoryLister for GithubClient {
    async fn list_repositories(
        &self,
        account: &str,
    ) -> Result<Vec<RepositoryDescriptor>, ExportError> {
        let url = self.repos_url(account);
        info!(url = %url, account = account, "Fetching repository listing");

        let resp = self.api_request(&url).send().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to reach repository listing endpoint");
            ExportError::Http {
                stage: RequestStage::Listing,
                url: url.clone(),
                source: e,
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "Repository listing returned error status");
            return Err(ExportError::RemoteService {
                stage: RequestStage::Listing,
                status,
                url,
            });
        }

        let repos: Vec<RepositoryDescriptor> = resp.json().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to parse repository listing JSON");
            ExportError::Decode {
                stage: RequestStage::Listing,
                url: url.clone(),
                source: e,
            }
        })?;

        info!(account = account, count = repos.len(), "Listed repositories");
        Ok(repos)
    }
}

#[async_trait::async_trait]
impl ReadmeFetcher for GithubClient {
    async fn fetch_readme(
        &self,
        account: &str,
        repo: &RepositoryDescriptor,
    ) -> Result<ReadmeRecord, ExportError> {
        let url = self.readme_url(account, &repo.name);
        debug!(url = %url, repo_name = %repo.name, "Fetching README metadata");

        let resp = self.api_request(&url).send().await.map_err(|e| {
            error!(error = ?e, url = %url, repo_name = %repo.name, "Failed to reach README endpoint");
            ExportError::Http {
                stage: RequestStage::Readme,
                url: url.clone(),
                source: e,
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = %status, repo_name = %repo.name, "Failed to fetch README metadata");
            return Err(ExportError::ReadmeUnavailable {
                repo_name: repo.name.clone(),
                status,
            });
        }

        let body: ReadmeResponse = resp.json().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to parse README metadata JSON");
            ExportError::Decode {
                stage: RequestStage::Readme,
                url: url.clone(),
                source: e,
            }
        })?;

        let mut extra = body.extra;
        extra.remove("owner");
        extra.remove("repo_name");

        info!(repo_name = %repo.name, "Fetched README metadata");
        Ok(ReadmeRecord {
            owner: account.to_string(),
            repo_name: repo.name.clone(),
            download_url: body.download_url,
            extra,
        })
    }
}

#[async_trait::async_trait]
impl ContentFetcher for GithubClient {
    async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>, ExportError> {
        debug!(url = %url, "Downloading raw README content");
        let resp = self.http.get(url).send().await.map_err(|e| ExportError::Http {
            stage: RequestStage::Content,
            url: url.to_string(),
            source: e,
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExportError::RemoteService {
                stage: RequestStage::Content,
                status,
                url: url.to_string(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| ExportError::Decode {
            stage: RequestStage::Content,
            url: url.to_string(),
            source: e,
        })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{AUTHORIZATION, USER_AGENT};

    fn client(api_base: &str) -> GithubClient {
        GithubClient::new(GithubConfig {
            api_base: api_base.to_string(),
            token: "t0ken".to_string(),
            ..GithubConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn builds_listing_and_readme_urls() {
        let c = client("https://api.github.com/");
        assert_eq!(
            c.repos_url("octocat"),
            "https://api.github.com/users/octocat/repos?per_page=100"
        );
        assert_eq!(
            c.readme_url("octocat", "hello-world"),
            "https://api.github.com/repos/octocat/hello-world/readme"
        );
    }

    #[test]
    fn api_requests_carry_accept_and_bearer_headers() {
        let c = client("https://api.github.com");
        let req = c.api_request(&c.repos_url("octocat")).build().unwrap();
        let headers = req.headers();
        assert_eq!(headers.get(ACCEPT).unwrap(), GITHUB_ACCEPT);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer t0ken");
        // User-Agent is a client default and only shows up on the wire.
        assert!(headers.get(USER_AGENT).is_none());
    }

    #[test]
    fn readme_response_keeps_unknown_fields() {
        let body: ReadmeResponse = serde_json::from_str(
            r#"{"name":"README.md","path":"README.md","download_url":"https://raw.example/README.md","size":42}"#,
        )
        .unwrap();
        assert_eq!(
            body.download_url.as_deref(),
            Some("https://raw.example/README.md")
        );
        assert_eq!(body.extra.get("size").and_then(|v| v.as_u64()), Some(42));
        assert!(!body.extra.contains_key("download_url"));
    }

    #[test]
    fn readme_response_tolerates_null_download_url() {
        let body: ReadmeResponse =
            serde_json::from_str(r#"{"name":"README.md","download_url":null}"#).unwrap();
        assert!(body.download_url.is_none());
    }
}
