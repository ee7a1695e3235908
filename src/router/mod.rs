use crate::category::{classify, extension_of, Category};
use crate::config::Config;
use crate::engines::{
    ConversionResult, ConvertEngine, ImageEngine, PdfEngine, TargetFormat, TextEngine,
    VideoEngine,
};
use crate::error::{AppError, Result};
use crate::workspace::Workspace;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Smart router that automatically selects the appropriate engine
/// based on file extension
pub struct SmartRouter {
    engines: Vec<Arc<dyn ConvertEngine>>,
    workspace: Workspace,
}

/// One engine's line in an availability report.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub category: Category,
    pub available: bool,
    pub extensions: Vec<&'static str>,
}

impl SmartRouter {
    pub fn new(config: &Config) -> Self {
        let mut video = VideoEngine::new().with_timeout(config.tool_timeout);
        if let Some(path) = &config.ffmpeg_path {
            video = video.with_ffmpeg_path(path.clone());
        }

        let mut pdf = PdfEngine::new().with_timeout(config.tool_timeout);
        if let Some(path) = &config.pdftoppm_path {
            pdf = pdf.with_pdftoppm_path(path.clone());
        }

        let engines: Vec<Arc<dyn ConvertEngine>> = vec![
            Arc::new(ImageEngine::new()),
            Arc::new(video),
            Arc::new(pdf),
            Arc::new(TextEngine::new()),
        ];

        Self::with_engines(Workspace::new(&config.workdir), engines)
    }

    pub fn with_engines(workspace: Workspace, engines: Vec<Arc<dyn ConvertEngine>>) -> Self {
        Self { engines, workspace }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Find the engine registered for a category
    pub fn find_engine(&self, category: Category) -> Option<Arc<dyn ConvertEngine>> {
        self.engines
            .iter()
            .find(|e| e.category() == category)
            .map(Arc::clone)
    }

    /// Find engine for a file path (extracts extension automatically)
    pub fn find_engine_for_file(&self, path: &Path) -> Result<Arc<dyn ConvertEngine>> {
        let ext = extension_of(path);
        if ext.is_empty() {
            return Err(AppError::UnsupportedFormat(format!(
                "{} has no extension",
                path.display()
            )));
        }

        self.find_engine(classify(path)).ok_or_else(|| {
            AppError::UnsupportedFormat(format!("No engine supports .{} files", ext))
        })
    }

    /// Convert `input_path` into `target` format.
    ///
    /// Unsupported inputs and malformed formats are rejected before anything
    /// touches the working directory.
    pub async fn convert(&self, input_path: &Path, target: &str) -> Result<ConversionResult> {
        let engine = self.find_engine_for_file(input_path)?;
        let format = TargetFormat::parse(target)?;
        let category = engine.category();

        info!(
            "Using {} engine for {} -> {}",
            category,
            input_path.display(),
            format.as_str()
        );

        let outputs = engine.convert(input_path, &format, &self.workspace).await?;
        Ok(ConversionResult {
            category,
            format: format.as_str().to_string(),
            outputs,
        })
    }

    /// Get a list of all supported extensions
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions = Vec::new();
        for engine in &self.engines {
            extensions.extend(
                engine
                    .supported_extensions()
                    .iter()
                    .map(|s| s.to_string()),
            );
        }
        extensions.sort();
        extensions.dedup();
        extensions
    }

    /// Probe every engine's external dependency.
    pub async fn availability(&self) -> Vec<EngineStatus> {
        let mut report = Vec::with_capacity(self.engines.len());
        for engine in &self.engines {
            let available = engine.is_available().await;
            let status = if available { "✓" } else { "✗" };
            info!(
                "{} {} engine - supports: {}",
                status,
                engine.category(),
                engine.supported_extensions().join(", ")
            );
            report.push(EngineStatus {
                category: engine.category(),
                available,
                extensions: engine.supported_extensions(),
            });
        }
        report
    }
}
