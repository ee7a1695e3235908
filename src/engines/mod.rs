mod image;
mod pdf;
mod svg;
mod text;
mod video;

pub use self::image::ImageEngine;
pub use pdf::PdfEngine;
pub use text::{escape_markup, TextEngine, TextLayout};
pub use video::VideoEngine;

use crate::category::Category;
use crate::error::{AppError, Result};
use crate::workspace::Workspace;
use async_trait::async_trait;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Requested output format, normalised to a bare lowercase extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFormat(String);

impl TargetFormat {
    /// Accepts `png`, `PNG` or `.png`. Anything that is not a plain
    /// alphanumeric extension is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().trim_start_matches('.').to_lowercase();
        if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::InvalidRequest(format!(
                "Invalid target format: {:?}",
                raw
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_gif(&self) -> bool {
        self.0 == "gif"
    }

    /// The image-library encoder for this format, if one is compiled in.
    pub fn image_format(&self) -> Result<::image::ImageFormat> {
        match ::image::ImageFormat::from_extension(&self.0) {
            Some(format) if format.writing_enabled() => Ok(format),
            _ => Err(AppError::conversion(format!(
                "Cannot encode images as '{}'",
                self.0
            ))),
        }
    }
}

/// Result of a conversion operation
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub category: Category,
    /// Normalized target format, e.g. `jpg` for a request of `.JPG`.
    pub format: String,
    /// Output files in page order.
    pub outputs: Vec<PathBuf>,
}

impl ConversionResult {
    pub fn content_types(&self) -> Vec<String> {
        self.outputs
            .iter()
            .map(|p| mime_guess::from_path(p).first_or_octet_stream().to_string())
            .collect()
    }
}

/// Trait that all conversion engines must implement
#[async_trait]
pub trait ConvertEngine: Send + Sync {
    /// The input category this engine handles
    fn category(&self) -> Category;

    /// Check if this engine can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool {
        Category::from_extension(ext) == self.category()
    }

    /// Get list of supported extensions
    fn supported_extensions(&self) -> Vec<&'static str> {
        self.category().extensions().to_vec()
    }

    /// Check if the engine is available (dependencies installed)
    async fn is_available(&self) -> bool;

    /// Convert the input file, writing every output into `workspace`.
    async fn convert(
        &self,
        input_path: &Path,
        format: &TargetFormat,
        workspace: &Workspace,
    ) -> Result<Vec<PathBuf>>;
}

/// Run an external tool to completion, mapping every failure to a
/// conversion error that carries the tool's stderr.
pub(crate) async fn run_tool(
    program: &str,
    args: &[OsString],
    timeout: Option<Duration>,
) -> Result<()> {
    debug!("Running {} {:?}", program, args);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, command.output())
            .await
            .map_err(|_| {
                AppError::conversion(format!(
                    "{} timed out after {}s",
                    program,
                    limit.as_secs()
                ))
            })?,
        None => command.output().await,
    }
    .map_err(|e| AppError::conversion(format!("{} could not be started: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::conversion(format!(
            "{} failed ({}): {}",
            program,
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

/// `true` when `program <arg>` runs and exits cleanly.
pub(crate) async fn probe_tool(program: &str, arg: &str) -> bool {
    Command::new(program)
        .arg(arg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_format_normalizes() {
        assert_eq!(TargetFormat::parse("PNG").unwrap().as_str(), "png");
        assert_eq!(TargetFormat::parse(".jpg").unwrap().as_str(), "jpg");
        assert!(TargetFormat::parse("gif").unwrap().is_gif());
    }

    #[test]
    fn test_target_format_rejects_garbage() {
        for raw in ["", ".", "../png", "png x", "p/ng"] {
            let err = TargetFormat::parse(raw).unwrap_err();
            assert_eq!(err.kind(), "invalid_request", "{raw:?}");
        }
    }

    #[test]
    fn test_image_format_lookup() {
        let jpeg = TargetFormat::parse("jpg").unwrap().image_format().unwrap();
        assert_eq!(jpeg, ::image::ImageFormat::Jpeg);
        let err = TargetFormat::parse("heic").unwrap().image_format().unwrap_err();
        assert_eq!(err.kind(), "conversion_failed");
    }

    #[test]
    fn test_content_types() {
        let result = ConversionResult {
            category: Category::Pdf,
            format: "png".to_string(),
            outputs: vec![PathBuf::from("/w/temp_a-1.png"), PathBuf::from("/w/temp_b.gif")],
        };
        assert_eq!(result.content_types(), vec!["image/png", "image/gif"]);
    }

    #[tokio::test]
    async fn test_run_tool_missing_program() {
        let err = run_tool("imgmill-no-such-tool", &[], None).await.unwrap_err();
        assert!(err.to_string().contains("could not be started"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool::install(dir.path(), "broken", "echo 'bad input' >&2\nexit 3");
        let err = run_tool(tool.to_str().unwrap(), &[], None).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bad input"), "{message}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool::install(dir.path(), "slow", "sleep 5");
        let err = run_tool(
            tool.to_str().unwrap(),
            &[],
            Some(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
