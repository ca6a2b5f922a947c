//! Error taxonomy for an export run.
//!
//! Only configuration errors and failures of the repository listing end a
//! run. Everything that goes wrong for a single repository is returned as a
//! value and recorded in the run report by [`crate::synchronise::export`].

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which GitHub call a transport or protocol error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    /// Repository listing of the account. Failures here end the run.
    Listing,
    /// README metadata of one repository.
    Readme,
    /// Raw README content of one repository.
    Content,
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestStage::Listing => "repository listing",
            RequestStage::Readme => "README metadata",
            RequestStage::Content => "README content",
        })
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("required environment variable {var} is not set")]
    MissingCredential { var: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{stage}: remote service returned {status} for {url}")]
    RemoteService {
        stage: RequestStage,
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("{stage}: request to {url} failed: {source}")]
    Http {
        stage: RequestStage,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage}: could not decode response from {url}: {source}")]
    Decode {
        stage: RequestStage,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("README for {repo_name} unavailable (status {status})")]
    ReadmeUnavailable {
        repo_name: String,
        status: reqwest::StatusCode,
    },

    #[error("could not fetch README content for {repo_name}: {reason}")]
    ContentFetch { repo_name: String, reason: String },

    #[error("PDF rendering failed for {repo_name}: {reason}")]
    Render { repo_name: String, reason: String },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// True for errors that end the whole run rather than one repository.
    pub fn is_fatal(&self) -> bool {
        match self {
            ExportError::MissingCredential { .. } | ExportError::Config(_) => true,
            ExportError::RemoteService { stage, .. }
            | ExportError::Http { stage, .. }
            | ExportError::Decode { stage, .. } => *stage == RequestStage::Listing,
            _ => false,
        }
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ExportError::RemoteService { status, .. }
            | ExportError::ReadmeUnavailable { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn readme_unavailable_names_repo_and_status() {
        let err = ExportError::ReadmeUnavailable {
            repo_name: "beta".into(),
            status: StatusCode::NOT_FOUND,
        };
        let msg = err.to_string();
        assert!(msg.contains("beta"));
        assert!(msg.contains("404"));
        assert!(!err.is_fatal());
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn listing_and_config_errors_are_fatal() {
        let remote = ExportError::RemoteService {
            stage: RequestStage::Listing,
            status: StatusCode::UNAUTHORIZED,
            url: "https://api.github.com/users/x/repos".into(),
        };
        assert!(remote.is_fatal());
        assert!(ExportError::MissingCredential { var: "TOKEN_GITHUB" }.is_fatal());
        assert!(!ExportError::Render {
            repo_name: "a".into(),
            reason: "boom".into()
        }
        .is_fatal());
    }

    #[test]
    fn remote_failures_are_fatal_only_for_the_listing() {
        let remote = |stage| ExportError::RemoteService {
            stage,
            status: StatusCode::BAD_GATEWAY,
            url: "https://api.github.com/x".into(),
        };
        assert!(remote(RequestStage::Listing).is_fatal());
        assert!(!remote(RequestStage::Readme).is_fatal());
        assert!(!remote(RequestStage::Content).is_fatal());
        assert!(remote(RequestStage::Content)
            .to_string()
            .starts_with("README content: remote service returned 502"));
    }
}
