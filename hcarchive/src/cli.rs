use std::{fmt, path::PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use crate::merger::SortOrder;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Log verbosity
    #[arg(short, long, global = true, value_name = "LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Archive your HipChat private messages
    #[command(alias = "d")]
    Dump(DumpArgs),

    /// Build a search index from an archive
    #[command(alias = "i")]
    Index(IndexArgs),

    /// Search archived messages
    #[command(alias = "s")]
    Search(SearchArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct DumpArgs {
    /// HipChat auth token with view_group, view_messages scope
    #[arg(short, long, env = "HIPCHAT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path where the archive will be written, `.json` skips the transcripts
    /// [default: ~/Documents/hipchat-archive.zip]
    #[arg(short, long, value_name = "PATH")]
    pub filename: Option<PathBuf>,

    /// Include conversations with deleted users. May need additional permissions.
    #[arg(short = 'd', long)]
    pub include_deleted_users: bool,

    /// HipChat API base URL [default: https://api.hipchat.com/v2]
    #[arg(long, env = "HIPCHAT_URL")]
    pub api_url: Option<String>,

    /// Order of the messages inside a conversation [default: ascending]
    #[arg(long, value_enum)]
    pub order: Option<SortOrder>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct IndexArgs {
    /// Archive to index [default: ~/Documents/hipchat-archive.zip]
    #[arg(short, long, value_name = "PATH")]
    pub archive: Option<PathBuf>,

    /// Directory of the new index [default: ~/Documents/hipchat-index]
    #[arg(short, long, value_name = "DIR")]
    pub index: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// Free-text query
    #[arg(value_name = "QUERY", required = true)]
    pub query: Vec<String>,

    /// Index directory [default: ~/Documents/hipchat-index]
    #[arg(short, long, value_name = "DIR")]
    pub index: Option<PathBuf>,

    /// Minimum relevance score of a hit [default: 0.5]
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Maximum number of hits [default: 100]
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Off => write!(f, "off"),
        }
    }
}
