use anyhow::Context;
use clap::{Parser, Subcommand};
use imgmill::handlers::{clean_handler, convert_handler, info_handler, AppState};
use imgmill::{AppError, Config, Fetcher, SmartRouter};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "imgmill",
    version,
    about = "Convert images, videos, PDFs and text files into images"
)]
struct Cli {
    /// Directory for downloaded inputs and converted outputs [env: IMGMILL_WORKDIR]
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    /// ffmpeg executable [env: FFMPEG_PATH]
    #[arg(long, global = true)]
    ffmpeg: Option<String>,

    /// pdftoppm executable [env: PDFTOPPM_PATH]
    #[arg(long, global = true)]
    pdftoppm: Option<String>,

    /// Kill external tools after this many seconds [env: IMGMILL_TOOL_TIMEOUT]
    #[arg(long, global = true, value_name = "SECS")]
    tool_timeout: Option<u64>,

    /// Give up on downloads after this many seconds [env: IMGMILL_FETCH_TIMEOUT]
    #[arg(long, global = true, value_name = "SECS")]
    fetch_timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a local file or an http(s) URL
    Convert {
        /// Path or URL of the input
        input: String,

        /// Output format, e.g. png, jpg, webp, gif
        #[arg(long, short = 't')]
        to: String,

        /// Original file name of a URL input; its extension picks the engine
        #[arg(long)]
        name: Option<String>,
    },
    /// Show supported inputs and which external tools are installed
    Info,
    /// Delete converted outputs
    Clean {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(dir) = &self.workdir {
            config = config.with_workdir(dir);
        }
        if let Some(path) = &self.ffmpeg {
            config = config.with_ffmpeg_path(path);
        }
        if let Some(path) = &self.pdftoppm {
            config = config.with_pdftoppm_path(path);
        }
        if let Some(secs) = self.tool_timeout {
            config = config.with_tool_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.fetch_timeout {
            config = config.with_fetch_timeout(Duration::from_secs(secs));
        }
        config
    }
}

async fn run(cli: Cli) -> anyhow::Result<Value> {
    let config = cli.config();
    let state = AppState {
        router: SmartRouter::new(&config),
        fetcher: Fetcher::new(config.fetch_timeout).context("Failed to set up HTTP client")?,
    };

    let report = match &cli.command {
        Command::Convert { input, to, name } => {
            convert_handler(&state, input, name.as_deref(), to).await?
        }
        Command::Info => info_handler(&state).await,
        Command::Clean { paths } => clean_handler(&state, paths.as_slice()).await,
    };
    Ok(report)
}

fn error_report(err: &anyhow::Error) -> Value {
    match err.downcast_ref::<AppError>() {
        Some(app) => json!({
            "error": app.to_string(),
            "kind": app.kind(),
            "leftovers": app.leftovers(),
        }),
        None => json!({
            "error": format!("{:#}", err),
            "kind": "internal",
        }),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgmill=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (report, code) = match run(cli).await {
        Ok(report) => (report, ExitCode::SUCCESS),
        Err(err) => (error_report(&err), ExitCode::FAILURE),
    };

    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to render report: {}", e),
    }
    code
}
