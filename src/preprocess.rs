//! Per-repository processing: README record → raw markdown → styled HTML → PDF on disk.

use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::contract::{ContentFetcher, ExportedFile, ReadmeRecord, RepositoryProcessor};
use crate::error::ExportError;
use crate::html_to_pdf::{render_pages, write_pdf, FontSet, HtmlToPdfError};
use crate::layout::{layout_html, Page};
use crate::markdown::render_markdown;
use crate::stylist::style_document;

/// A rendered README: the laid-out pages and the PDF drawn from them.
#[derive(Debug, Clone)]
pub struct RenderedReadme {
    pub pages: Vec<Page>,
    pub pdf: Vec<u8>,
}

/// Renders README markdown with `fonts`, keeping the layout the PDF was drawn from.
pub fn render_readme(
    title: &str,
    markdown: &str,
    fonts: &FontSet,
) -> Result<RenderedReadme, HtmlToPdfError> {
    let body = render_markdown(markdown);
    let styled = style_document(title, &body);
    debug!(title = title, html_len = styled.len(), "Rendered styled README HTML");
    let pages = layout_html(&styled);
    let pdf = render_pages(title, &pages, fonts)?;
    Ok(RenderedReadme { pages, pdf })
}

/// Renders README markdown into PDF bytes with the bundled fonts. Pure apart from logging.
pub fn readme_to_pdf(title: &str, markdown: &str) -> Result<Vec<u8>, HtmlToPdfError> {
    render_readme(title, markdown, &FontSet::standard()).map(|rendered| rendered.pdf)
}

/// Processor used by the export pipeline: implements [`RepositoryProcessor`].
pub struct ReadmeProcessor<C> {
    content: C,
    output_dir: PathBuf,
    fonts: FontSet,
}

impl<C: ContentFetcher> ReadmeProcessor<C> {
    pub fn new(content: C, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            content,
            output_dir: output_dir.into(),
            fonts: FontSet::standard(),
        }
    }

    pub fn with_fonts(mut self, fonts: FontSet) -> Self {
        self.fonts = fonts;
        self
    }

    async fn fetch_markdown(&self, record: &ReadmeRecord) -> Result<String, ExportError> {
        let repo_name = &record.repo_name;
        let Some(url) = record.download_url.as_deref() else {
            error!(repo_name = %repo_name, "README metadata has no download_url");
            return Err(ExportError::ContentFetch {
                repo_name: repo_name.clone(),
                reason: "README metadata has no download_url".into(),
            });
        };

        let raw = self.content.fetch_raw(url).await.map_err(|e| {
            error!(repo_name = %repo_name, url = %url, error = %e, "Failed to download README content");
            ExportError::ContentFetch {
                repo_name: repo_name.clone(),
                reason: e.to_string(),
            }
        })?;

        String::from_utf8(raw).map_err(|e| {
            error!(repo_name = %repo_name, error = %e, "README content is not valid UTF-8");
            ExportError::ContentFetch {
                repo_name: repo_name.clone(),
                reason: format!("README is not valid UTF-8: {e}"),
            }
        })
    }
}

#[async_trait::async_trait]
impl<C: ContentFetcher> RepositoryProcessor for ReadmeProcessor<C> {
    async fn process(&self, record: ReadmeRecord) -> Result<ExportedFile, ExportError> {
        let repo_name = record.repo_name.clone();
        info!(repo_name = %repo_name, owner = %record.owner, "Starting README to PDF conversion");

        let markdown = self.fetch_markdown(&record).await?;

        // Layout and PDF serialisation are CPU-bound; keep them off the async workers.
        let output_dir = self.output_dir.clone();
        let fonts = self.fonts.clone();
        let name = repo_name.clone();
        let written = tokio::task::spawn_blocking(move || {
            let rendered = render_readme(&name, &markdown, &fonts)?;
            let path = write_pdf(&output_dir, &name, &rendered.pdf)?;
            Ok::<_, HtmlToPdfError>((path, rendered.pdf.len()))
        })
        .await
        .map_err(|e| {
            error!(repo_name = %repo_name, error = %e, "PDF rendering task failed");
            ExportError::Render {
                repo_name: repo_name.clone(),
                reason: format!("rendering task failed: {e}"),
            }
        })?;

        let (path, size) = written.map_err(|e| {
            error!(repo_name = %repo_name, dir = %self.output_dir.display(), error = %e, "Error generating or saving PDF");
            match e {
                HtmlToPdfError::Io(source) => ExportError::Io {
                    path: self.output_dir.join(format!("{repo_name}.pdf")),
                    source,
                },
                other => ExportError::Render {
                    repo_name: repo_name.clone(),
                    reason: other.to_string(),
                },
            }
        })?;

        info!(repo_name = %repo_name, path = %path.display(), size = size, "Successfully saved PDF");
        Ok(ExportedFile {
            repo_name,
            path,
            bytes: size,
        })
    }
}
