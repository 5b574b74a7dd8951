//! Markdown operations.
//!
//! - A2 formats `format.md` in place with prettier.
//! - B6 renders a markdown file to HTML.

use crate::core::classifier::contains_all;
use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::external_action::ExternalCapability;
use crate::core::params::{self, ExtractionError, ParameterSet, ResolvedParams};
use crate::core::registry::{Capability, OperationDescriptor, Outcome, no_params};
use pulldown_cmark::{Options, Parser, html};

const FORMAT_INPUT: &str = "format.md";

pub const FORMAT_DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "A2",
    summary: "Format format.md in place with prettier",
    matches: matches_format,
    extract: no_params,
    handler: format_handler,
    capabilities: &[Capability::Read, Capability::Subprocess],
};

pub const HTML_DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "B6",
    summary: "Convert a markdown file to HTML",
    matches: matches_html,
    extract: extract_html,
    handler: html_handler,
    capabilities: &[Capability::Read, Capability::Write],
};

fn matches_format(text: &str) -> bool {
    contains_all(text, &["format", FORMAT_INPUT])
}

fn format_handler(ctx: &ExecutionContext<'_>, _params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let input = ctx.path(FORMAT_INPUT)?;
    ctx.require_file(&input)?;
    let tools = &ctx.config().tools;
    let target = input.as_path().to_string_lossy().to_string();
    ctx.run_external(
        ExternalCapability::Formatter,
        &tools.npx,
        &["--yes", tools.prettier.as_str(), "--write", target.as_str()],
        ctx.sandbox().root(),
    )?;
    Ok(Outcome::new(format!("Formatted {} using {}", input, tools.prettier)))
}

fn matches_html(text: &str) -> bool {
    contains_all(text, &["markdown", "html"])
}

fn extract_html(text: &str) -> Result<ParameterSet, ExtractionError> {
    let source = params::first_file_token(text, &["md", "markdown"])
        .ok_or_else(|| ExtractionError::new("no markdown source file named in task"))?;
    let output = params::target_file(text)
        .filter(|t| t.to_ascii_lowercase().ends_with(".html") || t.to_ascii_lowercase().ends_with(".htm"))
        .or_else(|| params::first_file_token(text, &["html", "htm"]))
        .ok_or_else(|| ExtractionError::new("no .html output file named in task"))?;
    Ok(ParameterSet::new()
        .with_path("source", source)
        .with_path("output", output))
}

/// CommonMark with tables, strikethrough and task lists.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn html_handler(ctx: &ExecutionContext<'_>, params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let source = params.path("source")?;
    let output = params.path("output")?;
    let markdown = ctx.read_to_string(source)?;
    let published = ctx.write_output(output, render_html(&markdown).as_bytes())?;
    Ok(Outcome::new(format!("Converted {} to {}", source, output)).with_output(published))
}
