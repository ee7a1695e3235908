use super::{probe_tool, run_tool, ConvertEngine, TargetFormat};
use crate::category::Category;
use crate::error::{AppError, Result};
use crate::workspace::Workspace;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// 10 fps, 320 px wide, aspect-preserving lanczos scaling.
pub const GIF_FILTER: &str = "fps=10,scale=320:-1:flags=lanczos";

pub struct VideoEngine {
    /// Path to the ffmpeg executable
    ffmpeg_path: Option<String>,
    timeout: Option<Duration>,
}

impl VideoEngine {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: None,
            timeout: None,
        }
    }

    pub fn with_ffmpeg_path(mut self, path: String) -> Self {
        self.ffmpeg_path = Some(path);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn get_ffmpeg_path(&self) -> String {
        if let Some(path) = &self.ffmpeg_path {
            return path.clone();
        }

        if let Ok(path) = std::env::var("FFMPEG_PATH") {
            return path;
        }

        "ffmpeg".to_string()
    }

    fn gif_args(input_path: &Path, output_path: &Path) -> Vec<OsString> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            input_path.into(),
            "-vf".into(),
            GIF_FILTER.into(),
            "-f".into(),
            "gif".into(),
            output_path.into(),
        ]
    }

    /// Single frame at t=0; the muxer is picked from the output extension.
    fn frame_args(input_path: &Path, output_path: &Path) -> Vec<OsString> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-ss".into(),
            "0".into(),
            "-i".into(),
            input_path.into(),
            "-frames:v".into(),
            "1".into(),
            output_path.into(),
        ]
    }
}

impl Default for VideoEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConvertEngine for VideoEngine {
    fn category(&self) -> Category {
        Category::Video
    }

    async fn is_available(&self) -> bool {
        probe_tool(&self.get_ffmpeg_path(), "-version").await
    }

    async fn convert(
        &self,
        input_path: &Path,
        format: &TargetFormat,
        workspace: &Workspace,
    ) -> Result<Vec<PathBuf>> {
        let output_path = workspace.allocate(format.as_str()).await?;

        let args = if format.is_gif() {
            info!("Converting {} to animated GIF using ffmpeg", input_path.display());
            Self::gif_args(input_path, &output_path)
        } else {
            info!(
                "Extracting first frame of {} as {} using ffmpeg",
                input_path.display(),
                format.as_str()
            );
            Self::frame_args(input_path, &output_path)
        };

        run_tool(&self.get_ffmpeg_path(), &args, self.timeout)
            .await
            .map_err(|e| e.with_leftovers([output_path.clone()]))?;

        if !output_path.exists() {
            return Err(AppError::conversion(format!(
                "ffmpeg exited cleanly but wrote no {}",
                output_path.display()
            )));
        }

        Ok(vec![output_path])
    }
}
