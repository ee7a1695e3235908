use super::{svg, ConvertEngine, TargetFormat};
use crate::category::{extension_of, Category};
use crate::error::{AppError, Result};
use crate::workspace::Workspace;
use ::image::{DynamicImage, ImageFormat, ImageReader};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Re-encodes raster images (and rasterizes SVG) with the `image` crate.
pub struct ImageEngine;

impl ImageEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(input_path: &Path) -> Result<DynamicImage> {
    if extension_of(input_path) == "svg" {
        let data = std::fs::read(input_path)?;
        return svg::rasterize(&data, None);
    }

    let reader = ImageReader::open(input_path)?.with_guessed_format()?;
    match reader.format() {
        Some(format) if format.reading_enabled() => {}
        _ => {
            return Err(AppError::conversion(format!(
                "No decoder available for {} (.{} input)",
                input_path.display(),
                extension_of(input_path)
            )))
        }
    }

    reader
        .decode()
        .map_err(|e| {
            AppError::conversion(format!("Failed to decode {}: {}", input_path.display(), e))
        })
}

/// Encode `img` as `format`, dropping alpha for encoders that cannot store it.
pub(crate) fn save_image(img: DynamicImage, format: ImageFormat, output_path: &Path) -> Result<()> {
    let img = match format {
        ImageFormat::Png | ImageFormat::Tiff => img,
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => DynamicImage::ImageRgba8(img.to_rgba8()),
    };

    img.save_with_format(output_path, format).map_err(|e| {
        AppError::conversion(format!(
            "Failed to encode {}: {}",
            output_path.display(),
            e
        ))
    })
}

#[async_trait]
impl ConvertEngine for ImageEngine {
    fn category(&self) -> Category {
        Category::Image
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
        let output_path = workspace.allocate(format.as_str()).await?;

        info!(
            "Converting {} to {} using the image library",
            input_path.display(),
            format.as_str()
        );

        let input = input_path.to_path_buf();
        let output = output_path.clone();
        tokio::task::spawn_blocking(move || save_image(decode(&input)?, image_format, &output))
            .await
            .map_err(|e| AppError::Internal(format!("Image task panicked: {}", e)))?
            .map_err(|e| e.with_leftovers([output_path.clone()]))?;

        Ok(vec![output_path])
    }
}
