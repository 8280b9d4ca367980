use std::{collections::HashSet, sync::Arc};

use comrak::{Arena, format_html, options::Options, parse_document};
use once_cell::sync::Lazy;

use super::types::{RenderError, Renderer};

/// Comrak markdown rendering followed by Ammonia sanitisation.
///
/// This is the production render function handed to the queue; the queue
/// itself knows nothing about markdown.
pub struct MarkdownRenderer {
    options: Options<'static>,
    sanitizer: ammonia::Builder<'static>,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: build_sanitizer(),
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, payload: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, payload, &self.options);

        let mut html = String::new();
        format_html(root, &self.options, &mut html).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;

        Ok(self.sanitizer.clean(&html).to_string())
    }
}

static MARKDOWN_RENDERER: Lazy<Arc<MarkdownRenderer>> =
    Lazy::new(|| Arc::new(MarkdownRenderer::new()));

/// Shared renderer instance, initialised on first use.
pub fn markdown_renderer() -> Arc<MarkdownRenderer> {
    Arc::clone(&MARKDOWN_RENDERER)
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.superscript = true;
    ext.footnotes = true;
    ext.description_lists = true;
    ext.front_matter_delimiter = Some("---".to_string());

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.tasklist_classes = true;

    options
}

fn build_sanitizer() -> ammonia::Builder<'static> {
    let mut builder = ammonia::Builder::default();
    builder.add_tag_attributes("input", ["type", "checked", "disabled"]);
    builder.add_tags(["input"]);
    builder.add_allowed_classes("li", ["task-list-item"]);
    builder.add_allowed_classes("input", ["task-list-item-checkbox"]);
    builder.add_generic_attributes(HashSet::from(["id", "lang"]));
    builder
}
