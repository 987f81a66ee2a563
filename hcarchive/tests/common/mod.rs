#![allow(dead_code)]

use async_trait::async_trait;
use hcarchive::api::hipchat::{HipChatApi, HistoryWindow, PageRequest};
use hcarchive::error::ApiError;
use hcarchive::models::{Archive, Message, Sender, SenderAccount, User};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Users(PageRequest),
    History {
        user_id: u64,
        window: HistoryWindow,
        page: PageRequest,
    },
}

/// Scripted HipChat API.
///
/// History is served by index over `history[user]`, so consecutive pages
/// requested with the one-item rewind overlap exactly like the real service.
/// The "recent" probe answers `recent[user]` as a single page.
#[derive(Default)]
pub struct MockApi {
    pub users: Vec<User>,
    pub recent: HashMap<u64, Vec<Message>>,
    pub history: HashMap<u64, Vec<Message>>,
    pub fail_history_from: HashMap<u64, usize>,
    pub fail_recent: HashSet<u64>,
    pub unauthorized: bool,
    pub calls: Mutex<Vec<Call>>,
}

impl MockApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn history_calls(&self, user_id: u64) -> Vec<(HistoryWindow, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::History {
                    user_id: id,
                    window,
                    page,
                } if id == user_id => Some((window, page.start_index)),
                _ => None,
            })
            .collect()
    }
}

fn slice<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    items
        .iter()
        .skip(page.start_index)
        .take(page.max_results)
        .cloned()
        .collect()
}

#[async_trait]
impl HipChatApi for MockApi {
    async fn list_users(
        &self,
        page: PageRequest,
        _include_deleted: bool,
    ) -> Result<Vec<User>, ApiError> {
        self.calls.lock().unwrap().push(Call::Users(page));
        if self.unauthorized {
            return Err(ApiError::Auth("401 Unauthorized".to_string()));
        }
        Ok(slice(&self.users, page))
    }

    async fn user_history(
        &self,
        user_id: u64,
        window: HistoryWindow,
        page: PageRequest,
    ) -> Result<Vec<Message>, ApiError> {
        self.calls.lock().unwrap().push(Call::History {
            user_id,
            window,
            page,
        });

        if self.unauthorized {
            return Err(ApiError::Auth("401 Unauthorized".to_string()));
        }

        match window {
            HistoryWindow::Recent => {
                if self.fail_recent.contains(&user_id) {
                    return Err(ApiError::Status {
                        status: 500,
                        body: "internal error".to_string(),
                    });
                }
                Ok(self
                    .recent
                    .get(&user_id)
                    .map(|messages| slice(messages, page))
                    .unwrap_or_default())
            }
            HistoryWindow::Before(_) => {
                if let Some(&fail_from) = self.fail_history_from.get(&user_id) {
                    if page.start_index >= fail_from {
                        return Err(ApiError::Status {
                            status: 503,
                            body: "service unavailable".to_string(),
                        });
                    }
                }
                Ok(self
                    .history
                    .get(&user_id)
                    .map(|messages| slice(messages, page))
                    .unwrap_or_default())
            }
        }
    }
}

pub fn alice() -> User {
    User::new(7, "Alice", "alice")
}

pub fn bob() -> User {
    User::new(8, "Bob", "bob")
}

pub fn record(name: &str, mention_name: &str) -> Sender {
    Sender::Account(SenderAccount {
        name: Some(name.to_string()),
        mention_name: Some(mention_name.to_string()),
        ..SenderAccount::default()
    })
}

pub fn message(id: &str, date: &str, from: Sender, body: &str) -> Message {
    Message::new(id, date, from, body)
}

/// Alice and Bob, with one conversation with Alice and none with Bob.
pub fn sample_archive() -> Archive {
    let mut users = BTreeMap::new();
    users.insert("7".to_string(), alice());
    users.insert("8".to_string(), bob());

    let mut archive = Archive::new(users);
    archive.conversations.insert(
        "7".to_string(),
        vec![
            message(
                "a",
                "2024-01-01T10:00:00.123456+00:00",
                record("Alice", "alice"),
                "lunch at noon?",
            ),
            message(
                "b",
                "2024-01-01T10:05:00.654321+00:00",
                record("Me", "me"),
                "sure\nsee you at the usual place",
            ),
            message(
                "c",
                "2024-01-02T09:00:00+00:00",
                Sender::Handle("GitHub".to_string()),
                "build passed",
            ),
        ],
    );
    archive.conversations.insert("8".to_string(), vec![]);
    archive
}
