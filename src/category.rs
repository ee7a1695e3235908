//! File classification by extension.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// What kind of input a file is, judged by its extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Video,
    Pdf,
    Text,
    Unsupported,
}

/// Recognised extensions per category. No extension appears twice.
const EXTENSION_TABLE: &[(Category, &[&str])] = &[
    (
        Category::Image,
        &[
            "png", "jpg", "jpeg", "webp", "gif", "bmp", "tiff", "tif", "avif", "heic", "ico",
            "svg", "eps", "psd",
        ],
    ),
    (
        Category::Video,
        &["mp4", "mov", "avi", "webm", "mkv", "flv", "ts", "mpeg", "3gp"],
    ),
    (Category::Pdf, &["pdf"]),
    (Category::Text, &["txt", "md"]),
];

static LOOKUP: Lazy<HashMap<&'static str, Category>> = Lazy::new(|| {
    EXTENSION_TABLE
        .iter()
        .flat_map(|(category, exts)| exts.iter().map(move |ext| (*ext, *category)))
        .collect()
});

impl Category {
    /// Categories that have an engine behind them.
    pub const SUPPORTED: [Category; 4] =
        [Category::Image, Category::Video, Category::Pdf, Category::Text];

    pub fn extensions(self) -> &'static [&'static str] {
        EXTENSION_TABLE
            .iter()
            .find(|(category, _)| *category == self)
            .map(|(_, exts)| *exts)
            .unwrap_or(&[])
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Video => "video",
            Category::Pdf => "pdf",
            Category::Text => "text",
            Category::Unsupported => "unsupported",
        }
    }

    /// Classify a bare extension (no leading dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Category {
        LOOKUP
            .get(ext.to_lowercase().as_str())
            .copied()
            .unwrap_or(Category::Unsupported)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase text after the last `.` of the file name, or `""` when there is none.
pub fn extension_of(filename: impl AsRef<Path>) -> String {
    filename
        .as_ref()
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

pub fn classify(filename: impl AsRef<Path>) -> Category {
    Category::from_extension(&extension_of(filename))
}

pub fn is_supported(filename: impl AsRef<Path>) -> bool {
    classify(filename) != Category::Unsupported
}
