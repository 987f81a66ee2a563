use std::{env, path::Path, path::PathBuf, time::Duration};

use anyhow::Context;
use config::{Config, File};
use log::debug;
use serde::Deserialize;

use crate::api::retry::{RetryPolicy, DEFAULT_RETRY_DELAY};
use crate::cli::{Args, Commands};
use crate::fetcher::DEFAULT_PAGE_SIZE;
use crate::merger::SortOrder;
use crate::search::{DEFAULT_SCORE_THRESHOLD, DEFAULT_SEARCH_LIMIT};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub archive_path: Option<PathBuf>,
    pub index_path: Option<PathBuf>,
    pub page_size: usize,
    pub retry_delay_secs: u64,
    pub max_retries: Option<u32>,
    pub score_threshold: f32,
    pub search_limit: usize,
    pub order: SortOrder,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            token: None,
            api_url: None,
            archive_path: None,
            index_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            retry_delay_secs: DEFAULT_RETRY_DELAY.as_secs(),
            max_retries: None,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            search_limit: DEFAULT_SEARCH_LIMIT,
            order: SortOrder::Ascending,
        }
    }
}

impl Settings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_secs(self.retry_delay_secs),
            max_retries: self.max_retries,
        }
    }
}

const CONFIG_FILE_NAME: &str = env!("CARGO_PKG_NAME");

// Function to get the XDG_CONFIG_HOME path
fn get_xdg_config_path() -> Option<PathBuf> {
    // First check XDG_CONFIG_HOME environment variable
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config));
    }

    // If XDG_CONFIG_HOME is not set, fall back to $HOME/.config
    get_home_path().map(|home| home.join(".config"))
}

fn get_home_path() -> Option<PathBuf> {
    env::var("HOME").ok().map(PathBuf::from)
}

pub fn default_archive_path() -> anyhow::Result<PathBuf> {
    get_home_path()
        .map(|home| home.join("Documents").join("hipchat-archive.zip"))
        .context("cannot determine the home directory, pass an explicit path")
}

pub fn default_index_path() -> anyhow::Result<PathBuf> {
    get_home_path()
        .map(|home| home.join("Documents").join("hipchat-index"))
        .context("cannot determine the home directory, pass an explicit path")
}

pub fn load_settings() -> anyhow::Result<Settings> {
    match get_xdg_config_path() {
        Some(xdg_config) => {
            load_settings_from(&xdg_config.join(CONFIG_FILE_NAME).join("config.toml"))
        }
        None => Ok(Settings::default()),
    }
}

pub fn load_settings_from(config_path: &Path) -> anyhow::Result<Settings> {
    if !config_path.exists() {
        return Ok(Settings::default());
    }

    Config::builder()
        .add_source(File::from(config_path.to_path_buf()).required(false))
        .build()?
        .try_deserialize()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to deserialize config file {}: {}",
                config_path.display(),
                e
            )
        })
}

/// Fills every option the command line left unset from the config file.
pub fn merge_settings_with_args(args: &Args, settings: &Settings) -> Args {
    let mut new_args = args.clone();

    macro_rules! apply_if_none {
        ($args:expr, $field:ident, $value:expr) => {
            if $args.$field.is_none() {
                $args.$field = $value;
            }
        };
    }

    match &mut new_args.command {
        Commands::Dump(dump) => {
            apply_if_none!(dump, token, settings.token.clone());
            apply_if_none!(dump, api_url, settings.api_url.clone());
            apply_if_none!(dump, filename, settings.archive_path.clone());
            apply_if_none!(dump, order, Some(settings.order));
        }
        Commands::Index(index) => {
            apply_if_none!(index, archive, settings.archive_path.clone());
            apply_if_none!(index, index, settings.index_path.clone());
        }
        Commands::Search(search) => {
            apply_if_none!(search, index, settings.index_path.clone());
            apply_if_none!(search, threshold, Some(settings.score_threshold));
            apply_if_none!(search, limit, Some(settings.search_limit));
        }
    }

    debug!(
        "merged config: page_size={}, retry_delay={}s, max_retries={:?}",
        settings.page_size, settings.retry_delay_secs, settings.max_retries
    );

    new_args
}
