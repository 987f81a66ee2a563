use crate::api::hipchat::{HipChatApi, HipChatClient, DEFAULT_API_URL};
use crate::archive::{read_archive, write_archive};
use crate::cli::{Args, Commands, DumpArgs, IndexArgs, SearchArgs};
use crate::error::ApiError;
use crate::fetcher::Fetcher;
use crate::index::build_index;
use crate::merger::{get_messages, SortOrder};
use crate::models::Archive;
use crate::search::{print_hits, search, DEFAULT_SCORE_THRESHOLD, DEFAULT_SEARCH_LIMIT};
use crate::settings::{self, Settings};

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

pub async fn run(args: Args) -> Result<()> {
    let settings = settings::load_settings().context("Failed to load settings")?;
    let args = settings::merge_settings_with_args(&args, &settings);

    match args.command {
        Commands::Dump(dump) => run_dump(dump, &settings).await,
        Commands::Index(index) => run_index(index).await,
        Commands::Search(query) => run_search(query),
    }
}

async fn run_dump(args: DumpArgs, settings: &Settings) -> Result<()> {
    let token = args.token.ok_or_else(|| {
        ApiError::Auth("missing token, pass --token or set HIPCHAT_TOKEN".to_string())
    })?;
    let api_url = args.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
    let filename = match args.filename {
        Some(filename) => filename,
        None => settings::default_archive_path()?,
    };

    let client = HipChatClient::new(api_url, &token, settings.retry_policy())?;

    println!("Fetching data from the HipChat API. This may take several minutes");
    let archive = dump_archive(
        &client,
        settings.page_size,
        args.include_deleted_users,
        args.order.unwrap_or_default(),
    )
    .await?;

    write_archive(&archive, &filename)
        .with_context(|| format!("Failed to write archive {}", filename.display()))?;
    println!("Archive was written at {}", filename.display());

    Ok(())
}

/// Fetches the user directory and, one partner after the other, every
/// conversation.
pub async fn dump_archive<A: HipChatApi + Sync>(
    api: &A,
    page_size: usize,
    include_deleted: bool,
    order: SortOrder,
) -> Result<Archive> {
    let fetcher = Fetcher::new(api, page_size);

    let users = fetcher
        .fetch_users(include_deleted)
        .await
        .context("Failed to list users")?;
    info!("found {} users", users.len());

    let mut archive = Archive::new(users);

    let progress = ProgressBar::new(archive.users.len() as u64);
    progress.set_style(ProgressStyle::with_template(
        "{spinner} [{bar:40}] {pos}/{len} {msg}",
    )?);

    for (partner_id, user) in &archive.users {
        progress.set_message(user.label().to_string());

        let messages = get_messages(&fetcher, user, order, Utc::now())
            .await
            .with_context(|| format!("Failed to fetch conversation with {}", user.label()))?;
        archive.conversations.insert(partner_id.clone(), messages);

        progress.inc(1);
    }

    progress.finish_and_clear();
    println!(
        "Fetched {} messages across {} conversations",
        archive.message_count(),
        archive.non_empty_conversations().count()
    );

    Ok(archive)
}

async fn run_index(args: IndexArgs) -> Result<()> {
    let archive_path = match args.archive {
        Some(path) => path,
        None => settings::default_archive_path()?,
    };
    let index_path = match args.index {
        Some(path) => path,
        None => settings::default_index_path()?,
    };

    let archive = read_archive(&archive_path)
        .with_context(|| format!("Failed to read archive {}", archive_path.display()))?;

    let count = build_index(&archive, &index_path)
        .await
        .with_context(|| format!("Failed to build index {}", index_path.display()))?;

    println!("Indexed {} messages into {}", count, index_path.display());
    Ok(())
}

fn run_search(args: SearchArgs) -> Result<()> {
    let index_path = match args.index {
        Some(path) => path,
        None => settings::default_index_path()?,
    };
    let query = args.query.join(" ");

    let hits = search(
        &index_path,
        &query,
        args.threshold.unwrap_or(DEFAULT_SCORE_THRESHOLD),
        args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
    )
    .with_context(|| format!("Failed to search index {}", index_path.display()))?;

    print_hits(&hits);
    Ok(())
}
