//! Command handlers behind the CLI. Each returns a JSON report.

use crate::category::{is_supported, Category};
use crate::error::{AppError, Result};
use crate::fetch::{is_url, Fetcher};
use crate::router::SmartRouter;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub struct AppState {
    pub router: SmartRouter,
    pub fetcher: Fetcher,
}

/// Last non-empty path segment of a URL, ignoring query and fragment.
fn name_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty())
        .unwrap_or_else(|| "download".to_string())
}

/// Convert a local path or URL. A URL whose name has an unsupported type is
/// rejected before anything is downloaded; a downloaded input is removed
/// afterwards, whether or not the conversion succeeded.
pub async fn convert_handler(
    state: &AppState,
    input: &str,
    original_name: Option<&str>,
    target: &str,
) -> Result<Value> {
    let (input_path, downloaded) = if is_url(input) {
        let name = original_name
            .map(str::to_string)
            .unwrap_or_else(|| name_from_url(input));
        if !is_supported(&name) {
            return Err(AppError::UnsupportedFormat(format!(
                "{} is not a supported file type",
                name
            )));
        }
        let path = state
            .fetcher
            .fetch(input, &name, state.router.workspace())
            .await?;
        (path, true)
    } else {
        (PathBuf::from(input), false)
    };

    let result = state.router.convert(&input_path, target).await;

    if downloaded {
        state.router.workspace().delete(&[&input_path]).await;
    }

    let result = result.map_err(|e| {
        error!("Conversion of {} failed: {}", input, e);
        e
    })?;

    info!("Produced {} output(s) from {}", result.outputs.len(), input);

    let outputs: Vec<Value> = result
        .outputs
        .iter()
        .zip(result.content_types())
        .map(|(path, content_type)| {
            json!({
                "path": path,
                "content_type": content_type,
            })
        })
        .collect();

    Ok(json!({
        "input": input,
        "category": result.category,
        "format": result.format,
        "outputs": outputs,
    }))
}

/// Information report - categories, extensions and engine availability
pub async fn info_handler(state: &AppState) -> Value {
    let engines = state.router.availability().await;
    let categories: serde_json::Map<String, Value> = Category::SUPPORTED
        .iter()
        .map(|c| (c.to_string(), json!(c.extensions())))
        .collect();

    json!({
        "service": "imgmill",
        "version": env!("CARGO_PKG_VERSION"),
        "workdir": state.router.workspace().dir(),
        "categories": categories,
        "supported_formats": state.router.supported_extensions(),
        "engines": engines,
    })
}

/// Delete previously produced artifacts.
pub async fn clean_handler<P: AsRef<Path>>(state: &AppState, paths: &[P]) -> Value {
    let removed = state.router.workspace().delete(paths).await;
    json!({
        "requested": paths.len(),
        "removed": removed,
    })
}
