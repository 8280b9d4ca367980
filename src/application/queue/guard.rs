use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use tokio::task;

use crate::application::render::{RenderError, Renderer};

/// Run `renderer` on the blocking pool, converting panics into errors so a
/// malformed document can never take a worker down with it.
pub(crate) async fn render_isolated(
    renderer: Arc<dyn Renderer>,
    payload: String,
) -> Result<String, RenderError> {
    match task::spawn_blocking(move || render_guarded(renderer.as_ref(), &payload)).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => Err(RenderError::panicked(panic_message(
            err.into_panic().as_ref(),
        ))),
        Err(err) => Err(RenderError::aborted(err.to_string())),
    }
}

pub(crate) fn render_guarded(renderer: &dyn Renderer, payload: &str) -> Result<String, RenderError> {
    catch_unwind(AssertUnwindSafe(|| renderer.render(payload)))
        .unwrap_or_else(|panic| Err(RenderError::panicked(panic_message(panic.as_ref()))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "render function panicked with a non-string payload".to_string()
    }
}
