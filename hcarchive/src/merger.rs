use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::api::hipchat::{HipChatApi, HistoryWindow, PageRequest};
use crate::error::ApiError;
use crate::fetcher::Fetcher;
use crate::models::{Message, User};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest message first.
    #[default]
    #[value(alias = "asc")]
    Ascending,
    /// Newest message first.
    #[value(alias = "desc")]
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "ascending"),
            SortOrder::Descending => write!(f, "descending"),
        }
    }
}

/// Messages keyed by ID, remembering the order in which they were first seen.
#[derive(Debug, Clone, Default)]
pub struct MessageSet {
    messages: Vec<Message>,
    positions: HashMap<String, usize>,
}

impl MessageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `message` unless one with the same ID is already present.
    pub fn insert(&mut self, message: Message) -> bool {
        if self.positions.contains_key(&message.id) {
            return false;
        }
        self.positions.insert(message.id.clone(), self.messages.len());
        self.messages.push(message);
        true
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Flattens the set, ordered by timestamp. Messages with equal timestamps
    /// keep their insertion order; unparseable dates come before any other.
    pub fn into_sorted(self, order: SortOrder) -> Vec<Message> {
        let mut keyed: Vec<_> = self
            .messages
            .into_iter()
            .map(|message| (message.timestamp(), message))
            .collect();

        keyed.sort_by(|(a, _), (b, _)| match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => match order {
                SortOrder::Ascending => a.cmp(b),
                SortOrder::Descending => b.cmp(a),
            },
        });

        keyed.into_iter().map(|(_, message)| message).collect()
    }
}

impl Extend<Message> for MessageSet {
    fn extend<I: IntoIterator<Item = Message>>(&mut self, iter: I) {
        for message in iter {
            self.insert(message);
        }
    }
}

impl FromIterator<Message> for MessageSet {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        let mut set = MessageSet::new();
        set.extend(iter);
        set
    }
}

/// Anchor of the historical sweep, kept a minute behind the live edge so
/// messages arriving mid-sweep cannot shift page boundaries.
pub fn sweep_anchor(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::minutes(1)
}

/// Full, deduplicated conversation with `user`.
///
/// Probes the "recent" page first and only sweeps the whole history when the
/// probe found anything. A failing page ends the sweep with whatever was
/// gathered so far; only authentication failures are returned as errors.
pub async fn get_messages<A: HipChatApi + Sync>(
    fetcher: &Fetcher<'_, A>,
    user: &User,
    order: SortOrder,
    now: DateTime<Utc>,
) -> Result<Vec<Message>, ApiError> {
    let probe = fetcher
        .api()
        .user_history(
            user.id,
            HistoryWindow::Recent,
            PageRequest {
                start_index: 0,
                max_results: fetcher.page_size(),
            },
        )
        .await;

    let mut messages: MessageSet = match probe {
        Ok(page) => page.into_iter().collect(),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("conversation with {}: recent page failed: {}", user.label(), e);
            MessageSet::new()
        }
    };

    if messages.is_empty() {
        info!("conversation with {} - 0 messages", user.label());
        return Ok(Vec::new());
    }

    let window = HistoryWindow::Before(sweep_anchor(now));
    if let Err(e) = fetcher.fetch_all(user.id, window, &mut messages).await {
        if e.is_fatal() {
            return Err(e);
        }
        warn!(
            "conversation with {}: history incomplete after {} messages: {}",
            user.label(),
            messages.len(),
            e
        );
    }

    info!(
        "conversation with {} - {} messages",
        user.label(),
        messages.len()
    );
    Ok(messages.into_sorted(order))
}
