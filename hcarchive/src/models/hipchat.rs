use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Envelope of every paged HipChat endpoint.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mention_name: String,
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl User {
    pub fn new(id: u64, name: &str, mention_name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            mention_name: mention_name.to_string(),
            extra: BTreeMap::new(),
        }
    }

    /// Display name, falling back to the mention name.
    pub fn label(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else {
            &self.mention_name
        }
    }

    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Sender of a message as reported by the history endpoint.
///
/// Messages from integrations carry a bare handle while people (including
/// deleted accounts missing from the user list) come as a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sender {
    Handle(String),
    Account(SenderAccount),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SenderAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_name: Option<String>,
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Sender {
    pub fn label(&self) -> &str {
        match self {
            Sender::Handle(handle) => handle,
            Sender::Account(account) => match (&account.name, &account.mention_name) {
                (Some(name), _) if !name.is_empty() => name,
                (_, Some(mention_name)) => mention_name,
                _ => "",
            },
        }
    }

    /// Every non-empty name this sender may be searched by.
    pub fn name_variants(&self) -> Vec<String> {
        match self {
            Sender::Handle(handle) => vec![handle.clone()],
            Sender::Account(account) => [&account.name, &account.mention_name]
                .into_iter()
                .flatten()
                .filter(|name| !name.is_empty())
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub date: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Sender>,
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Message {
    pub fn new(id: &str, date: &str, from: Sender, message: &str) -> Self {
        Self {
            id: id.to_string(),
            date: date.to_string(),
            message: message.to_string(),
            from: Some(from),
            extra: BTreeMap::new(),
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.date).ok()
    }

    pub fn sender_label(&self) -> &str {
        self.from.as_ref().map(Sender::label).unwrap_or("")
    }
}
