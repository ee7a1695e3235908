//! Plain-text rendering: every line becomes a monospaced `<text>` row in an
//! SVG canvas, which is then rasterized and encoded like any other image.

use super::image::save_image;
use super::{svg, ConvertEngine, TargetFormat};
use crate::category::Category;
use crate::error::{AppError, Result};
use crate::workspace::Workspace;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CANVAS_WIDTH: u32 = 1200;
pub const LINE_HEIGHT: u32 = 24;
pub const LEFT_MARGIN: u32 = 20;
pub const FIRST_BASELINE: u32 = 40;
pub const VERTICAL_PADDING: u32 = 80;
pub const FONT_SIZE: u32 = 20;

/// Escape the characters that would break out of an XML text node or attribute.
pub fn escape_markup(line: &str) -> String {
    let mut escaped = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// The vector layout of a text file, before rasterization.
#[derive(Debug, Clone)]
pub struct TextLayout {
    pub width: u32,
    pub height: u32,
    pub line_count: usize,
    pub svg: String,
}

impl TextLayout {
    pub fn new(content: &str) -> Self {
        let lines: Vec<&str> = content.lines().collect();
        let height = lines.len() as u32 * LINE_HEIGHT + VERTICAL_PADDING;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg width="{CANVAS_WIDTH}" height="{height}" xmlns="http://www.w3.org/2000/svg">"#
        );
        let _ = writeln!(
            svg,
            r#"<g font-family="monospace" font-size="{FONT_SIZE}" fill="black" xml:space="preserve">"#
        );
        for (i, line) in lines.iter().enumerate() {
            let y = FIRST_BASELINE + i as u32 * LINE_HEIGHT;
            let _ = writeln!(
                svg,
                r#"<text x="{LEFT_MARGIN}" y="{y}">{}</text>"#,
                escape_markup(line)
            );
        }
        svg.push_str("</g>\n</svg>\n");

        Self {
            width: CANVAS_WIDTH,
            height,
            line_count: lines.len(),
            svg,
        }
    }
}

pub struct TextEngine;

impl TextEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConvertEngine for TextEngine {
    fn category(&self) -> Category {
        Category::Text
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn convert(
        &self,
        input_path: &Path,
        format: &TargetFormat,
        workspace: &Workspace,
    ) -> Result<Vec<PathBuf>> {
        let image_format = format.image_format()?;
        let content = tokio::fs::read_to_string(input_path).await?;
        let layout = TextLayout::new(&content);

        info!(
            "Rendering {} ({} lines, {}x{}) to {}",
            input_path.display(),
            layout.line_count,
            layout.width,
            layout.height,
            format.as_str()
        );

        let output_path = workspace.allocate(format.as_str()).await?;
        let output = output_path.clone();
        tokio::task::spawn_blocking(move || {
            let img = svg::rasterize(layout.svg.as_bytes(), Some(tiny_skia::Color::WHITE))?;
            save_image(img, image_format, &output)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Text render task panicked: {}", e)))?
        .map_err(|e| e.with_leftovers([output_path.clone()]))?;

        Ok(vec![output_path])
    }
}
