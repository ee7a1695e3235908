//! Runtime settings.
//!
//! Each value resolves as: explicit setter, then environment variable, then
//! built-in default. Tool paths follow the same rule inside the engines.

use std::path::PathBuf;
use std::time::Duration;

pub const WORKDIR_ENV: &str = "IMGMILL_WORKDIR";
pub const TOOL_TIMEOUT_ENV: &str = "IMGMILL_TOOL_TIMEOUT";
pub const FETCH_TIMEOUT_ENV: &str = "IMGMILL_FETCH_TIMEOUT";

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding every temp artifact.
    pub workdir: PathBuf,
    /// Override for the ffmpeg executable.
    pub ffmpeg_path: Option<String>,
    /// Override for the pdftoppm executable.
    pub pdftoppm_path: Option<String>,
    /// Upper bound for one external tool run. `None` waits forever.
    pub tool_timeout: Option<Duration>,
    /// Upper bound for a whole download.
    pub fetch_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            ffmpeg_path: None,
            pdftoppm_path: None,
            tool_timeout: None,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(WORKDIR_ENV) {
            if !dir.is_empty() {
                config.workdir = PathBuf::from(dir);
            }
        }
        if let Some(secs) = env_secs(TOOL_TIMEOUT_ENV) {
            config.tool_timeout = Some(secs);
        }
        if let Some(secs) = env_secs(FETCH_TIMEOUT_ENV) {
            config.fetch_timeout = secs;
        }
        config
    }

    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = dir.into();
        self
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    pub fn with_pdftoppm_path(mut self, path: impl Into<String>) -> Self {
        self.pdftoppm_path = Some(path.into());
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

fn default_workdir() -> PathBuf {
    std::env::temp_dir().join("imgmill")
}

fn env_secs(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            tracing::warn!("Ignoring {}={:?}: expected a positive number of seconds", key, raw);
            None
        }
    }
}
