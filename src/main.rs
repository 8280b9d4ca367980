use std::{process, sync::Arc};

use soffio_render_queue::{
    application::{
        batch::{DocumentSource, render_documents},
        error::AppError,
        queue::{RenderQueue, Tier},
        render::{Renderer, markdown_renderer},
    },
    config,
    infra::{error::InfraError, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, causes = ?error.messages(), "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) =
        config::load_with_cli().map_err(|err| InfraError::configuration(err.to_string()))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Render(args) => run_render(settings, args).await,
    }
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let sources: Vec<DocumentSource> = args
        .files
        .iter()
        .map(|path| DocumentSource::new(path, Tier::Interactive))
        .chain(
            args.background
                .iter()
                .map(|path| DocumentSource::new(path, Tier::Background)),
        )
        .collect();

    if sources.is_empty() {
        return Err(AppError::validation(
            "render requires at least one markdown file",
        ));
    }

    let renderer: Arc<dyn Renderer> = markdown_renderer();
    let queue = RenderQueue::from_settings(&settings.queue, renderer)?;

    info!(
        target = "soffio_render_queue::render",
        workers = queue.worker_count(),
        interactive = args.files.len(),
        background = args.background.len(),
        "Starting render"
    );

    let rendered = render_documents(&queue, &sources, args.out_dir.as_deref()).await;
    let shutdown = queue.shutdown(settings.queue.shutdown_grace).await;

    let report = rendered?;
    shutdown?;

    info!(
        target = "soffio_render_queue::render",
        written = report.written.len(),
        failed = report.failed.len(),
        "Render finished"
    );

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(AppError::unexpected(format!(
            "{} of {} documents failed to render",
            report.failed.len(),
            report.total()
        )))
    }
}
