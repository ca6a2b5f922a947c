#![allow(unused)]

//! # contract: seams between the stages of an export run
//!
//! The pipeline in [`crate::synchronise`] only talks to the traits defined
//! here, so listing, README lookup, raw content download and per-repository
//! processing can each be swapped for a real client or a mock.
//!
//! ## Data
//! - [`RepositoryDescriptor`] comes out of the listing call.
//! - [`ReadmeRecord`] comes out of the README call, augmented with owner and repo name.
//! - [`ExportedFile`] describes a PDF written to disk.
//!
//! Both API types keep every field the remote returned in `extra`, but the
//! crate only relies on `name` and `download_url`.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; the mocks are exported with the
//!   default `test-export-mocks` feature so integration tests can use them.

use std::path::PathBuf;

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// One repository as returned by the listing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub name: String,
    /// Remaining metadata of the listing response, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RepositoryDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// README metadata for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadmeRecord {
    pub owner: String,
    pub repo_name: String,
    /// Locator for the raw markdown. GitHub sends `null` for some files.
    pub download_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A PDF written for one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub repo_name: String,
    pub path: PathBuf,
    pub bytes: usize,
}

/// Lists the repositories owned by an account.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryLister: Send + Sync {
    /// A non-success status is an [`ExportError::RemoteService`].
    async fn list_repositories(
        &self,
        account: &str,
    ) -> Result<Vec<RepositoryDescriptor>, ExportError>;
}

/// Looks up README metadata for a single repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ReadmeFetcher: Send + Sync {
    /// A non-success status is an [`ExportError::ReadmeUnavailable`].
    async fn fetch_readme(
        &self,
        account: &str,
        repo: &RepositoryDescriptor,
    ) -> Result<ReadmeRecord, ExportError>;
}

/// Downloads raw bytes from a README `download_url`, without credentials.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>, ExportError>;
}

/// Turns one README record into a PDF on disk.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryProcessor: Send + Sync {
    async fn process(&self, record: ReadmeRecord) -> Result<ExportedFile, ExportError>;
}
