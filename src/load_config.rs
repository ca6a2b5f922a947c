/// `load_config` module: turns an optional YAML file, command-line overrides and the
/// process environment into a validated [`ExportConfig`].
///
/// # Responsibilities
/// - Parse the user-supplied YAML file (no secrets) into intermediate structs
/// - Apply command-line overrides on top of the file
/// - Inject the GitHub token from `TOKEN_GITHUB`; a missing token stops the run
///   before any network call is made
///
/// # Accepted YAML
/// ```yaml
/// account: octocat
/// output_dir: ./pdfs
/// concurrency: 1
/// font: ./fonts/NotoSans-Regular.ttf   # optional
/// github:
///   api_base: https://api.github.com
///   user_agent: readme-pdf-generator
///   per_page: 100
///   request_timeout_secs: 30
/// ```
use crate::config::{ExportConfig, GithubConfig, MAX_PER_PAGE, TOKEN_ENV_VAR};
use crate::error::ExportError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    account: Option<String>,
    output_dir: Option<PathBuf>,
    concurrency: Option<usize>,
    font: Option<PathBuf>,
    #[serde(default)]
    github: GithubConfig,
}

/// Values given on the command line. They win over the config file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub account: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub font: Option<PathBuf>,
}

/// Loads the optional YAML file, applies overrides and injects the token from the env.
pub fn load_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<ExportConfig, ExportError> {
    let raw = match path {
        Some(path_ref) => read_raw_config(path_ref)?,
        None => {
            info!("No config file given, using command-line values and defaults");
            RawConfig::default()
        }
    };

    let account = overrides
        .account
        .or(raw.account)
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            error!("No account configured");
            ExportError::Config("an account name is required".into())
        })?;

    let output_dir = overrides.output_dir.or(raw.output_dir).ok_or_else(|| {
        error!("No output directory configured");
        ExportError::Config("an output directory is required".into())
    })?;

    let concurrency = overrides.concurrency.or(raw.concurrency).unwrap_or(1);
    if concurrency == 0 {
        error!("concurrency must be at least 1");
        return Err(ExportError::Config("concurrency must be at least 1".into()));
    }

    let font = overrides.font.or(raw.font);

    let mut github = raw.github;
    if github.per_page == 0 {
        return Err(ExportError::Config("github.per_page must be at least 1".into()));
    }
    if github.per_page > MAX_PER_PAGE {
        warn!(
            per_page = github.per_page,
            max = MAX_PER_PAGE,
            "github.per_page above the API maximum, clamping"
        );
        github.per_page = MAX_PER_PAGE;
    }

    github.token = match std::env::var(TOKEN_ENV_VAR) {
        Ok(token) if !token.trim().is_empty() => {
            info!("{TOKEN_ENV_VAR} found in env");
            token.trim().to_string()
        }
        Ok(_) | Err(_) => {
            error!("{TOKEN_ENV_VAR} environment variable not set");
            return Err(ExportError::MissingCredential {
                var: TOKEN_ENV_VAR,
            });
        }
    };

    let config = ExportConfig {
        account,
        output_dir,
        concurrency,
        font,
        github,
    };
    config.trace_loaded();
    Ok(config)
}

fn read_raw_config(path_ref: &Path) -> Result<RawConfig, ExportError> {
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(ExportError::Io {
                path: path_ref.to_path_buf(),
                source: e,
            });
        }
    };

    match serde_yaml::from_str(&config_content) {
        Ok(raw) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(raw)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(ExportError::Config(format!("failed to parse config YAML: {e}")))
        }
    }
}
