//! SVG rasterization through resvg, shared by the image and text engines.

use crate::error::{AppError, Result};
use ::image::{DynamicImage, RgbaImage};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::warn;
use usvg::fontdb;

/// Families tried, in order, as the `monospace` generic.
const MONOSPACE_CANDIDATES: &[&str] = &[
    "DejaVu Sans Mono",
    "Liberation Mono",
    "Noto Sans Mono",
    "Menlo",
    "Consolas",
    "Courier New",
];

static FONTS: Lazy<Arc<fontdb::Database>> = Lazy::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    if db.is_empty() {
        warn!("No system fonts found, text will not be drawn");
    }

    let installed = |family: &str| {
        db.faces()
            .any(|face| face.families.iter().any(|(name, _)| name == family))
    };
    if let Some(family) = MONOSPACE_CANDIDATES.iter().find(|f| installed(f)) {
        db.set_monospace_family(*family);
    }

    Arc::new(db)
});

/// Render an SVG document at its intrinsic size.
///
/// `background` fills the canvas first; `None` keeps it transparent.
pub(crate) fn rasterize(svg: &[u8], background: Option<tiny_skia::Color>) -> Result<DynamicImage> {
    let options = usvg::Options {
        fontdb: Arc::clone(&FONTS),
        ..usvg::Options::default()
    };

    let tree = usvg::Tree::from_data(svg, &options)
        .map_err(|e| AppError::conversion(format!("SVG parsing failed: {}", e)))?;

    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height()).ok_or_else(|| {
        AppError::conversion(format!(
            "Failed to create pixmap ({}x{})",
            size.width(),
            size.height()
        ))
    })?;

    if let Some(color) = background {
        pixmap.fill(color);
    }

    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; the image crate expects straight alpha
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    RgbaImage::from_raw(pixmap.width(), pixmap.height(), rgba)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| AppError::Internal("Pixmap buffer size mismatch".to_string()))
}
