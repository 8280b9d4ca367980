use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the render queue binary.
#[derive(Debug, Parser)]
#[command(
    name = "soffio-render-queue",
    version,
    about = "Render markdown documents through the Soffio priority render queue"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SOFFIO_RENDER_QUEUE_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render markdown files to HTML, interactive files ahead of background ones.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct QueueOverrides {
    /// Override the number of render workers.
    #[arg(long = "workers", value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Override how long shutdown waits for workers to drain.
    #[arg(long = "shutdown-grace-seconds", value_name = "SECONDS")]
    pub shutdown_grace_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: QueueOverrides,

    /// Directory for rendered HTML; defaults to writing next to each source.
    #[arg(long = "out-dir", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub out_dir: Option<PathBuf>,

    /// Markdown file to render at background priority. May be repeated.
    #[arg(long = "background", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub background: Vec<PathBuf>,

    /// Markdown files to render at interactive priority.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub files: Vec<PathBuf>,
}
