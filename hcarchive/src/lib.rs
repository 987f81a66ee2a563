//! Archive HipChat private messages and search them.
//!
//! The dump pipeline lists every user, then for each conversation partner
//! probes the most recent page of history, sweeps the full history when the
//! probe found anything and merges both passes into one deduplicated,
//! chronologically ordered conversation. The result is written as a JSON
//! archive, optionally packaged in a zip with readable transcripts, which can
//! later be indexed and searched.

pub mod api;
pub mod archive;
pub mod cli;
pub mod error;
pub mod fetcher;
pub mod index;
pub mod merger;
pub mod models;
pub mod search;
pub mod services;
pub mod settings;
pub mod transcript;

pub use archive::{read_archive, write_archive};
pub use index::build_index;
pub use merger::{get_messages, MessageSet, SortOrder};
pub use models::{Archive, Message, Sender, User};
