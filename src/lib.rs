#![doc = "readme-pdf: export the README of every repository of a GitHub account to PDF."]

//! Pipeline stages, leaf first:
//! [`markdown`] → [`stylist`] → [`layout`] / [`html_to_pdf`] for rendering,
//! [`download`] for the GitHub API, [`preprocess`] for one repository and
//! [`synchronise`] for a whole run.

pub mod cli;
pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod html_to_pdf;
pub mod layout;
pub mod load_config;
pub mod markdown;
pub mod preprocess;
pub mod stylist;
pub mod synchronise;

pub use cli::{run, Cli, Commands};
pub use error::ExportError;
