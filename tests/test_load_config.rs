use std::env;
use std::fs::write;
use std::path::PathBuf;

use readme_pdf::error::ExportError;
use readme_pdf::load_config::{load_config, ConfigOverrides};
use serial_test::serial;
use tempfile::NamedTempFile;

fn yaml_file(contents: &str) -> NamedTempFile {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), contents).unwrap();
    config_file
}

/// A static config plus the token in the env yields a complete ExportConfig.
#[test]
#[serial]
fn file_values_and_env_token_are_merged() {
    let config_file = yaml_file(
        r#"
account: octocat
output_dir: ./tmp/pdfs
concurrency: 2
github:
  api_base: http://127.0.0.1:9999
  per_page: 50
  request_timeout_secs: 5
"#,
    );
    env::set_var("TOKEN_GITHUB", "ghp_test_token");

    let config = load_config(Some(config_file.path()), ConfigOverrides::default())
        .expect("config should load");

    assert_eq!(config.account, "octocat");
    assert_eq!(config.output_dir, PathBuf::from("./tmp/pdfs"));
    assert_eq!(config.concurrency, 2);
    assert_eq!(config.github.api_base, "http://127.0.0.1:9999");
    assert_eq!(config.github.user_agent, "readme-pdf-generator");
    assert_eq!(config.github.per_page, 50);
    assert_eq!(config.github.request_timeout_secs, Some(5));
    assert_eq!(config.github.token, "ghp_test_token");
}

#[test]
#[serial]
fn command_line_overrides_win_over_file() {
    let config_file = yaml_file("account: from-file\noutput_dir: ./file-dir\n");
    env::set_var("TOKEN_GITHUB", "ghp_test_token");

    let overrides = ConfigOverrides {
        account: Some("from-cli".into()),
        output_dir: Some(PathBuf::from("./cli-dir")),
        concurrency: None,
        ..ConfigOverrides::default()
    };
    let config = load_config(Some(config_file.path()), overrides).unwrap();

    assert_eq!(config.account, "from-cli");
    assert_eq!(config.output_dir, PathBuf::from("./cli-dir"));
    assert_eq!(config.concurrency, 1);
    assert_eq!(config.github.api_base, "https://api.github.com");
    assert_eq!(config.github.per_page, 100);
}

#[test]
#[serial]
fn works_without_a_config_file() {
    env::set_var("TOKEN_GITHUB", "ghp_test_token");
    let overrides = ConfigOverrides {
        account: Some("octocat".into()),
        output_dir: Some(PathBuf::from("out")),
        concurrency: Some(4),
        ..ConfigOverrides::default()
    };

    let config = load_config(None, overrides).unwrap();
    assert_eq!(config.concurrency, 4);
}

#[test]
#[serial]
fn missing_token_is_a_missing_credential() {
    let config_file = yaml_file("account: octocat\noutput_dir: ./tmp/pdfs\n");
    env::remove_var("TOKEN_GITHUB");

    let err = load_config(Some(config_file.path()), ConfigOverrides::default()).unwrap_err();

    assert!(matches!(err, ExportError::MissingCredential { var: "TOKEN_GITHUB" }));
    assert!(err.is_fatal());
    assert!(err.to_string().contains("TOKEN_GITHUB"));
}

#[test]
#[serial]
fn blank_token_counts_as_missing() {
    env::set_var("TOKEN_GITHUB", "   ");
    let overrides = ConfigOverrides {
        account: Some("octocat".into()),
        output_dir: Some(PathBuf::from("out")),
        concurrency: None,
        ..ConfigOverrides::default()
    };

    let err = load_config(None, overrides).unwrap_err();
    assert!(matches!(err, ExportError::MissingCredential { .. }));
}

#[test]
#[serial]
fn missing_account_is_a_config_error() {
    env::set_var("TOKEN_GITHUB", "ghp_test_token");
    let config_file = yaml_file("output_dir: ./tmp/pdfs\n");

    let err = load_config(Some(config_file.path()), ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, ExportError::Config(_)), "got {err:?}");
}

#[test]
#[serial]
fn zero_concurrency_is_rejected() {
    env::set_var("TOKEN_GITHUB", "ghp_test_token");
    let config_file = yaml_file("account: octocat\noutput_dir: out\nconcurrency: 0\n");

    let err = load_config(Some(config_file.path()), ConfigOverrides::default()).unwrap_err();
    assert!(err.to_string().contains("concurrency"));
}

#[test]
#[serial]
fn oversized_page_size_is_clamped() {
    env::set_var("TOKEN_GITHUB", "ghp_test_token");
    let config_file = yaml_file("account: octocat\noutput_dir: out\ngithub:\n  per_page: 500\n");

    let config = load_config(Some(config_file.path()), ConfigOverrides::default()).unwrap();
    assert_eq!(config.github.per_page, 100);
}

#[test]
#[serial]
fn invalid_yaml_is_reported() {
    env::set_var("TOKEN_GITHUB", "ghp_test_token");
    let config_file = yaml_file("account: [unterminated\n");

    let err = load_config(Some(config_file.path()), ConfigOverrides::default()).unwrap_err();
    assert!(err.to_string().contains("YAML"), "got {err}");
}

#[test]
#[serial]
fn unreadable_file_is_an_io_error() {
    env::set_var("TOKEN_GITHUB", "ghp_test_token");
    let err = load_config(
        Some(std::path::Path::new("/definitely/not/here.yaml")),
        ConfigOverrides::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ExportError::Io { .. }));
}

#[test]
#[serial]
fn font_path_comes_from_file_or_command_line() {
    env::set_var("TOKEN_GITHUB", "ghp_test_token");
    let config_file = yaml_file("account: octocat\noutput_dir: out\nfont: fonts/file.ttf\n");

    let from_file = load_config(Some(config_file.path()), ConfigOverrides::default()).unwrap();
    assert_eq!(from_file.font, Some(PathBuf::from("fonts/file.ttf")));

    let overrides = ConfigOverrides {
        font: Some(PathBuf::from("cli.ttf")),
        ..ConfigOverrides::default()
    };
    let from_cli = load_config(Some(config_file.path()), overrides).unwrap();
    assert_eq!(from_cli.font, Some(PathBuf::from("cli.ttf")));
}
