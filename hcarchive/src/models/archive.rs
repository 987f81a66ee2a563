use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::hipchat::{Message, User};

/// Everything a dump produces: the user directory and every conversation,
/// both keyed by the stringified user ID of the conversation partner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    #[serde(rename = "Users")]
    pub users: BTreeMap<String, User>,
    #[serde(rename = "Conversations")]
    pub conversations: BTreeMap<String, Vec<Message>>,
}

impl Archive {
    pub fn new(users: BTreeMap<String, User>) -> Self {
        Self {
            users,
            conversations: BTreeMap::new(),
        }
    }

    /// Label of a conversation partner, empty when the partner is unknown.
    pub fn partner_label(&self, partner_id: &str) -> &str {
        self.users.get(partner_id).map(User::label).unwrap_or("")
    }

    pub fn message_count(&self) -> usize {
        self.conversations.values().map(Vec::len).sum()
    }

    /// Conversations holding at least one message.
    pub fn non_empty_conversations(&self) -> impl Iterator<Item = (&String, &Vec<Message>)> {
        self.conversations
            .iter()
            .filter(|(_, messages)| !messages.is_empty())
    }
}
