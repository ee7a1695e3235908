//! Convert images, videos, PDFs and text files into images.
//!
//! The input's extension picks an engine ([`category::classify`]); engines
//! delegate the actual work to the `image` crate, `resvg`, `ffmpeg` or
//! `pdftoppm`. Every output is a temp artifact in the [`Workspace`] that the
//! caller deletes when done.

pub mod category;
pub mod config;
pub mod engines;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod router;
pub mod workspace;

pub use category::{classify, is_supported, Category};
pub use config::Config;
pub use engines::{ConversionResult, ConvertEngine, TargetFormat};
pub use error::{AppError, Result};
pub use fetch::Fetcher;
pub use router::SmartRouter;
pub use workspace::Workspace;
