//! B7: resize or re-encode an image.

use crate::core::classifier::contains_any;
use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::params::{self, ExtractionError, ParameterSet, ResolvedParams};
use crate::core::registry::{Capability, OperationDescriptor, Outcome};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use regex::Regex;
use std::io::Cursor;
use std::sync::LazyLock;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];
/// Largest width or height a resize may produce.
pub const MAX_DIMENSION: u32 = 16_384;

static WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bwidth\s*(?:of|to|=|:)?\s*(\d+)|\b(\d+)\s*px\b").expect("static regex")
});

pub const DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "B7",
    summary: "Resize or compress an image",
    matches,
    extract,
    handler,
    capabilities: &[Capability::Read, Capability::Write],
};

fn matches(text: &str) -> bool {
    contains_any(text, &["resize", "compress"])
        && params::first_file_token(text, IMAGE_EXTENSIONS).is_some()
}

fn extract(text: &str) -> Result<ParameterSet, ExtractionError> {
    let tokens = params::file_tokens(text, IMAGE_EXTENSIONS);
    let source = *tokens
        .first()
        .ok_or_else(|| ExtractionError::new("no image file named in task"))?;
    let output = params::target_file(text)
        .filter(|t| *t != source)
        .or_else(|| tokens.get(1).copied())
        .unwrap_or(source);
    let mut set = ParameterSet::new()
        .with_path("source", source)
        .with_path("output", output);
    if let Some(width) = requested_width(text) {
        if width > i64::from(MAX_DIMENSION) {
            return Err(ExtractionError::new(format!(
                "width {} exceeds the {} px limit",
                width, MAX_DIMENSION
            )));
        }
        set = set.with_integer("width", width);
    }
    Ok(set)
}

/// Width in pixels from "width 320" or "320 px". Digit runs too long for `i64`
/// saturate so the ceiling check still sees them.
pub fn requested_width(text: &str) -> Option<i64> {
    WIDTH
        .captures(text)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().parse().unwrap_or(i64::MAX))
        .filter(|w: &i64| *w > 0)
}

/// Scale to `width`, preserving aspect ratio; height never drops below one pixel.
/// Neither side of the result may exceed `MAX_DIMENSION`.
pub fn resize_to_width(img: &DynamicImage, width: u32) -> Result<DynamicImage, TaskError> {
    if width == img.width() {
        return Ok(img.clone());
    }
    let height = ((img.height() as u64 * width as u64) / img.width().max(1) as u64).max(1);
    if width > MAX_DIMENSION || height > u64::from(MAX_DIMENSION) {
        return Err(TaskError::ValidationError(format!(
            "resizing to {}x{} exceeds the {} px limit",
            width, height, MAX_DIMENSION
        )));
    }
    Ok(img.resize_exact(width, height as u32, FilterType::Lanczos3))
}

fn handler(ctx: &ExecutionContext<'_>, params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let source = params.path("source")?;
    let output = params.path("output")?;
    let format = ImageFormat::from_path(output.as_path())?;

    let bytes = ctx.read_bytes(source)?;
    let img = image::load_from_memory(&bytes)?;
    let img = match params.integer("width") {
        Some(width) => {
            let width = u32::try_from(width)
                .map_err(|_| TaskError::ValidationError(format!("width {} out of range", width)))?;
            resize_to_width(&img, width)?
        }
        None => img,
    };
    // JPEG has no alpha channel.
    let img = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    };

    let mut encoded = Cursor::new(Vec::new());
    img.write_to(&mut encoded, format)?;
    let published = ctx.write_output(output, encoded.get_ref())?;
    Ok(Outcome::new(format!(
        "Wrote {}x{} image to {}",
        img.width(),
        img.height(),
        output
    ))
    .with_output(published))
}
