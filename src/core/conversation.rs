//! Conversation records and the ordered collection they live in.
//!
//! A conversation is a titled, ordered transcript with a stable id. The
//! collection keeps insertion order (new chats are prepended) and is only
//! ever mutated through whole-conversation replacement, which keeps
//! concurrent partial reads safe.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::message::Message;

/// Characters of the first user message that become the title.
pub const TITLE_LEN: usize = 25;

pub const DEFAULT_TITLE: &str = "New Chat";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Fresh empty conversation with a random id.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a user turn, titling the conversation from its first message.
    pub fn push_user_message(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.messages.is_empty() {
            self.title = text.chars().take(TITLE_LEN).collect();
        }
        self.messages.push(Message::user(text));
    }

    pub fn push_assistant_message(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
    }

    /// Whether `index` names an assistant turn that can be regenerated.
    pub fn is_retry_target(&self, index: usize) -> bool {
        self.messages
            .get(index)
            .map(Message::is_assistant)
            .unwrap_or(false)
    }

    /// Drop the message at `index` and everything after it.
    pub fn truncate_from(&mut self, index: usize) {
        self.messages.truncate(index);
    }

    /// Index of the last assistant turn, if any.
    pub fn last_assistant_index(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_assistant)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// The ordered conversation collection plus the current-conversation cursor.
///
/// Invariant: when the collection is non-empty the cursor points at a
/// member; it never dangles.
#[derive(Debug, Clone)]
pub struct ConversationList {
    conversations: Vec<Conversation>,
    current_id: Option<String>,
}

impl ConversationList {
    pub fn new() -> Self {
        Self {
            conversations: Vec::new(),
            current_id: None,
        }
    }

    /// Adopt a persisted snapshot; the cursor lands on the first member.
    pub fn from_snapshot(conversations: Vec<Conversation>) -> Self {
        let current_id = conversations.first().map(|c| c.id.clone());
        Self {
            conversations,
            current_id,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn current(&self) -> Option<&Conversation> {
        let id = self.current_id.as_deref()?;
        self.find(id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn find(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// Prepend a fresh conversation and move the cursor to it.
    pub fn prepend_new(&mut self) -> &Conversation {
        let conversation = Conversation::new();
        self.current_id = Some(conversation.id.clone());
        self.conversations.insert(0, conversation);
        &self.conversations[0]
    }

    /// Move the cursor. Silent no-op when the id is unknown.
    pub fn select(&mut self, id: &str) -> bool {
        if self.find(id).is_some() {
            self.current_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Throw everything away and start over with one fresh conversation.
    pub fn reset(&mut self) {
        self.conversations.clear();
        self.prepend_new();
    }
}

impl Default for ConversationList {
    fn default() -> Self {
        Self::new()
    }
}
