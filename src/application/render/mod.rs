//! Render function contract and the default markdown implementation.
//!
//! Rendering is kept pure: it accepts markdown input, produces HTML output,
//! and surfaces structured errors. Scheduling, deduplication and delivery of
//! results live in [`crate::application::queue`].

mod markdown;
mod types;

pub use markdown::{MarkdownRenderer, markdown_renderer};
pub use types::{RenderError, Renderer};
