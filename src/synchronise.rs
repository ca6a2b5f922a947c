//! High-level pipeline: orchestrates listing → README lookup → PDF export for one account.
//!
//! A run lists every repository of the configured account, then handles each
//! repository as one unit: fetch README metadata, download the markdown,
//! render it and write `<output_dir>/<repo_name>.pdf`.
//!
//! # Error Handling
//! - A failed listing (bad credential, unknown account, transport error) ends the run
//!   with an error before any README is fetched.
//! - Everything that fails for one repository is logged, recorded as
//!   [`RepositoryOutcome::Failed`] and the run moves on.
//!
//! # Concurrency
//! `ExportConfig::concurrency` bounds how many repository units run at once.
//! With the default of 1 a repository is completely written before the next
//! one starts. Report order always follows the listing order.
//!
//! # Navigation
//! - Main entrypoint: [`export`]
//! - Supporting types: [`ExportReport`], [`RepositoryOutcome`].

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::config::ExportConfig;
use crate::contract::{
    ExportedFile, ReadmeFetcher, RepositoryDescriptor, RepositoryLister, RepositoryProcessor,
};
use crate::error::ExportError;

/// What happened to one repository.
#[derive(Debug)]
pub enum RepositoryOutcome {
    Exported(ExportedFile),
    Failed {
        repo_name: String,
        error: ExportError,
    },
}

impl RepositoryOutcome {
    pub fn repo_name(&self) -> &str {
        match self {
            RepositoryOutcome::Exported(file) => &file.repo_name,
            RepositoryOutcome::Failed { repo_name, .. } => repo_name,
        }
    }
}

/// Result of an export run, one outcome per listed repository.
#[derive(Debug)]
pub struct ExportReport {
    pub account: String,
    pub outcomes: Vec<RepositoryOutcome>,
}

impl ExportReport {
    pub fn exported(&self) -> impl Iterator<Item = &ExportedFile> {
        self.outcomes.iter().filter_map(|o| match o {
            RepositoryOutcome::Exported(file) => Some(file),
            RepositoryOutcome::Failed { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ExportError)> {
        self.outcomes.iter().filter_map(|o| match o {
            RepositoryOutcome::Failed { repo_name, error } => Some((repo_name.as_str(), error)),
            RepositoryOutcome::Exported(_) => None,
        })
    }

    pub fn exported_count(&self) -> usize {
        self.exported().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }
}

pub async fn export<L, F, P>(
    config: &ExportConfig,
    lister: &L,
    fetcher: &F,
    processor: &P,
) -> Result<ExportReport, ExportError>
where
    L: RepositoryLister,
    F: ReadmeFetcher,
    P: RepositoryProcessor,
{
    let account = config.account.as_str();
    info!(account = account, "[EXPORT] Starting export run");

    let repos = match lister.list_repositories(account).await {
        Ok(repos) => {
            info!(count = repos.len(), "[EXPORT] Repository listing succeeded");
            repos
        }
        Err(e) => {
            error!(account = account, error = %e, "[EXPORT][ERROR] Repository listing failed");
            return Err(e);
        }
    };

    let concurrency = config.concurrency.max(1);
    let outcomes: Vec<RepositoryOutcome> = stream::iter(repos.iter())
        .map(|repo| export_repository(account, repo, fetcher, processor))
        .buffered(concurrency)
        .collect()
        .await;

    let report = ExportReport {
        account: account.to_string(),
        outcomes,
    };
    info!(
        account = account,
        exported = report.exported_count(),
        failed = report.failed_count(),
        "[EXPORT] Export run finished"
    );
    Ok(report)
}

async fn export_repository<F, P>(
    account: &str,
    repo: &RepositoryDescriptor,
    fetcher: &F,
    processor: &P,
) -> RepositoryOutcome
where
    F: ReadmeFetcher,
    P: RepositoryProcessor,
{
    let record = match fetcher.fetch_readme(account, repo).await {
        Ok(record) => {
            info!(repo_name = %repo.name, "[EXPORT] Fetched README metadata");
            record
        }
        Err(e) => {
            match e.status() {
                Some(status) => warn!(
                    repo_name = %repo.name,
                    status = status.as_u16(),
                    "[EXPORT] No README fetched, skipping repository"
                ),
                None => warn!(repo_name = %repo.name, error = %e, "[EXPORT] README lookup failed, skipping repository"),
            }
            return RepositoryOutcome::Failed {
                repo_name: repo.name.clone(),
                error: e,
            };
        }
    };

    match processor.process(record).await {
        Ok(file) => {
            info!(repo_name = %repo.name, path = %file.path.display(), "[EXPORT] Repository exported");
            RepositoryOutcome::Exported(file)
        }
        Err(e) => {
            error!(repo_name = %repo.name, error = %e, "[EXPORT][ERROR] Repository export failed");
            RepositoryOutcome::Failed {
                repo_name: repo.name.clone(),
                error: e,
            }
        }
    }
}
