use thiserror::Error;

/// Structured errors surfaced by a render function. Cloned into every waiter
/// of a failed job, so variants carry owned messages only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("render failed: {message}")]
    Failed { message: String },
    #[error("render panicked: {message}")]
    Panicked { message: String },
    #[error("render task aborted: {message}")]
    Aborted { message: String },
}

impl RenderError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self::Panicked {
            message: message.into(),
        }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted {
            message: message.into(),
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, RenderError::Panicked { .. })
    }
}

/// The single function the queue depends on: markdown in, HTML out.
///
/// Implementations may be called from several blocking threads at once and
/// are not trusted to avoid panicking.
pub trait Renderer: Send + Sync {
    fn render(&self, payload: &str) -> Result<String, RenderError>;
}

impl<F> Renderer for F
where
    F: Fn(&str) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, payload: &str) -> Result<String, RenderError> {
        self(payload)
    }
}
