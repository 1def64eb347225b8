//! Markdown conversion and page assembly.
//!
//! The incremental pipeline converts CommonMark to an HTML body with
//! [`markdown_to_html`] and wraps it into the self-contained lesson page
//! with [`wrap_page`]. The page template carries every client runtime the
//! rendered fragments rely on, so the returned document needs no further
//! server round-trips to display.

use minijinja::{context, Environment};
use pulldown_cmark::{html, Options, Parser};

use crate::error::RenderError;

const PAGE_TEMPLATE: &str = include_str!("../templates/page.html");

/// Converts a markdown body to an HTML fragment.
///
/// Tables, footnotes, definition lists, strikethrough and task lists are
/// enabled on top of CommonMark. Raw HTML lines pass through untouched,
/// which the pipeline relies on for its block markers.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_DEFINITION_LIST);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Wraps a rendered HTML body into the full lesson page.
pub fn wrap_page(body_html: &str) -> Result<String, RenderError> {
    let mut env = Environment::new();
    env.add_template("page.html", PAGE_TEMPLATE)?;
    let template = env.get_template("page.html")?;
    let page = template.render(context! { content => body_html })?;
    Ok(page)
}
