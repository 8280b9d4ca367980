//! Render markdown files from disk through the queue.
//!
//! This is the edit/save side of the scheduler in miniature: each file is
//! submitted with a waiter, and the outcome is written next to the source or
//! into an output directory.

use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use tokio::{fs, sync::oneshot};
use tracing::{info, warn};

use crate::{
    application::{
        error::AppError,
        queue::{Job, QueueError, RenderQueue, RevisionId, Tier},
        render::RenderError,
    },
    infra::error::InfraError,
};

const FALLBACK_STEM: &str = "document";

/// A markdown file and the tier it should be rendered at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    pub path: PathBuf,
    pub tier: Tier,
}

impl DocumentSource {
    pub fn new(path: impl Into<PathBuf>, tier: Tier) -> Self {
        Self {
            path: path.into(),
            tier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub path: PathBuf,
    pub error: RenderError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// HTML files written, in submission order.
    pub written: Vec<PathBuf>,
    pub failed: Vec<FailedDocument>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}

/// Submit every source, then wait for and persist each outcome.
///
/// Render failures are collected in the report; I/O and queue failures abort
/// the batch.
pub async fn render_documents(
    queue: &RenderQueue,
    sources: &[DocumentSource],
    out_dir: Option<&Path>,
) -> Result<BatchReport, AppError> {
    if let Some(dir) = out_dir {
        fs::create_dir_all(dir).await.map_err(InfraError::Io)?;
    }

    let mut pending = Vec::with_capacity(sources.len());
    for source in sources {
        let markdown = fs::read_to_string(&source.path)
            .await
            .map_err(InfraError::Io)?;
        let revision = revision_for(&source.path).await;
        let job = Job::new(
            source.path.display().to_string(),
            revision,
            markdown,
            source.tier,
        );

        let (waiter, receiver) = oneshot::channel();
        queue.submit(job, Some(waiter))?;
        pending.push((source, receiver));
    }

    let mut report = BatchReport::default();
    for (source, receiver) in pending {
        let outcome = receiver.await.map_err(|_| QueueError::Abandoned)?;
        match outcome.result {
            Ok(html) => {
                let target = output_path(&source.path, out_dir);
                fs::write(&target, html).await.map_err(InfraError::Io)?;
                info!(
                    target = "application::batch",
                    source = %source.path.display(),
                    output = %target.display(),
                    revision = %outcome.revision,
                    tier = source.tier.as_str(),
                    "Rendered document"
                );
                report.written.push(target);
            }
            Err(error) => {
                warn!(
                    target = "application::batch",
                    source = %source.path.display(),
                    error = %error,
                    "Document failed to render"
                );
                report.failed.push(FailedDocument {
                    path: source.path.clone(),
                    error,
                });
            }
        }
    }

    Ok(report)
}

/// Modification time in unix seconds, or zero when unavailable.
async fn revision_for(path: &Path) -> RevisionId {
    let modified = fs::metadata(path)
        .await
        .and_then(|metadata| metadata.modified())
        .map(|time| OffsetDateTime::from(time).unix_timestamp())
        .unwrap_or(0);
    RevisionId::new(modified)
}

pub fn output_path(source: &Path, out_dir: Option<&Path>) -> PathBuf {
    match out_dir {
        Some(dir) => {
            let stem = source
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| FALLBACK_STEM.to_string());
            dir.join(format!("{stem}.html"))
        }
        None => source.with_extension("html"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_defaults_to_sibling() {
        assert_eq!(
            output_path(Path::new("posts/hello.md"), None),
            PathBuf::from("posts/hello.html")
        );
    }

    #[test]
    fn output_path_uses_out_dir() {
        assert_eq!(
            output_path(Path::new("posts/hello.md"), Some(Path::new("public"))),
            PathBuf::from("public/hello.html")
        );
        assert_eq!(
            output_path(Path::new(".."), Some(Path::new("public"))),
            PathBuf::from("public/document.html")
        );
    }
}
