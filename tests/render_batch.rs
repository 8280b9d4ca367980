use std::{fs, sync::Arc, time::Duration};

use soffio_render_queue::application::{
    batch::{DocumentSource, output_path, render_documents},
    error::AppError,
    queue::{QueueState, RenderQueue, Tier},
    render::{RenderError, Renderer, markdown_renderer},
};
use tempfile::tempdir;

const GRACE: Duration = Duration::from_secs(10);

#[tokio::test]
async fn batch_writes_sanitised_html_for_each_source() {
    let dir = tempdir().expect("temp dir");
    let draft = dir.path().join("draft.md");
    let archive = dir.path().join("archive.md");
    fs::write(&draft, "# Draft\n\nHello <script>alert(1)</script> **world**\n").expect("write");
    fs::write(&archive, "| a | b |\n|---|---|\n| 1 | 2 |\n").expect("write");

    let out_dir = dir.path().join("public");
    let renderer: Arc<dyn Renderer> = markdown_renderer();
    let queue = RenderQueue::new(2, renderer).expect("queue starts");
    let sources = [
        DocumentSource::new(&draft, Tier::Interactive),
        DocumentSource::new(&archive, Tier::Background),
    ];

    let report = render_documents(&queue, &sources, Some(&out_dir))
        .await
        .expect("batch renders");
    queue.shutdown(GRACE).await.expect("shutdown completes");

    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert_eq!(
        report.written,
        [
            output_path(&draft, Some(&out_dir)),
            output_path(&archive, Some(&out_dir)),
        ]
    );

    let draft_html = fs::read_to_string(out_dir.join("draft.html")).expect("draft html");
    assert!(draft_html.contains("<h1>"), "{draft_html}");
    assert!(draft_html.contains("<strong>world</strong>"), "{draft_html}");
    assert!(!draft_html.contains("<script>"), "{draft_html}");

    let archive_html = fs::read_to_string(out_dir.join("archive.html")).expect("archive html");
    assert!(archive_html.contains("<table>"), "{archive_html}");
}

#[tokio::test]
async fn batch_defaults_to_sibling_output() {
    let dir = tempdir().expect("temp dir");
    let source = dir.path().join("note.md");
    fs::write(&source, "plain text").expect("write");

    let renderer: Arc<dyn Renderer> = markdown_renderer();
    let queue = RenderQueue::new(1, renderer).expect("queue starts");

    let report = render_documents(&queue, &[DocumentSource::new(&source, Tier::Interactive)], None)
        .await
        .expect("batch renders");
    queue.shutdown(GRACE).await.expect("shutdown completes");

    assert_eq!(report.written, [dir.path().join("note.html")]);
    let html = fs::read_to_string(dir.path().join("note.html")).expect("html");
    assert_eq!(html.trim(), "<p>plain text</p>");
}

#[tokio::test]
async fn batch_collects_render_failures() {
    let dir = tempdir().expect("temp dir");
    let good = dir.path().join("good.md");
    let bad = dir.path().join("bad.md");
    fs::write(&good, "fine").expect("write");
    fs::write(&bad, "explode").expect("write");

    let renderer: Arc<dyn Renderer> = Arc::new(|payload: &str| -> Result<String, RenderError> {
        if payload == "explode" {
            panic!("cannot render");
        }
        Ok(format!("<p>{payload}</p>"))
    });
    let queue = RenderQueue::new(1, renderer).expect("queue starts");
    let sources = [
        DocumentSource::new(&good, Tier::Background),
        DocumentSource::new(&bad, Tier::Background),
    ];

    let report = render_documents(&queue, &sources, None)
        .await
        .expect("batch completes despite failures");

    assert_eq!(report.total(), 2);
    assert_eq!(report.written, [dir.path().join("good.html")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, bad);
    assert!(report.failed[0].error.is_panic());
    assert!(!dir.path().join("bad.html").exists());
}

#[tokio::test]
async fn batch_after_shutdown_fails_with_queue_error() {
    let dir = tempdir().expect("temp dir");
    let source = dir.path().join("late.md");
    fs::write(&source, "late").expect("write");

    let renderer: Arc<dyn Renderer> = markdown_renderer();
    let queue = RenderQueue::new(1, renderer).expect("queue starts");
    queue.shutdown(GRACE).await.expect("shutdown completes");
    assert_eq!(queue.state(), QueueState::Closed);

    let err = render_documents(&queue, &[DocumentSource::new(&source, Tier::Interactive)], None)
        .await
        .expect_err("closed queue rejects the batch");
    assert!(matches!(err, AppError::Queue(_)), "{err:?}");
}

#[tokio::test]
async fn batch_reports_missing_source_as_io_error() {
    let dir = tempdir().expect("temp dir");
    let renderer: Arc<dyn Renderer> = markdown_renderer();
    let queue = RenderQueue::new(1, renderer).expect("queue starts");

    let missing = DocumentSource::new(dir.path().join("missing.md"), Tier::Interactive);
    let err = render_documents(&queue, &[missing], None)
        .await
        .expect_err("missing file fails the batch");
    assert!(matches!(err, AppError::Infra(_)), "{err:?}");

    queue.shutdown(GRACE).await.expect("shutdown completes");
}
