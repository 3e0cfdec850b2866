// src/assistant.rs
use crate::db::{LocalStore, CHAT_HISTORY_KEY};
use crate::error::{ClientError, Result};
use crate::models::{ChatMessage, ChatRole};
use chrono::Utc;
use std::collections::VecDeque;

/// Conversation with the AI endpoint, oldest message first. Persisted in the
/// local store so it carries over between runs.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    messages: VecDeque<ChatMessage>,
    cap: usize,
}

impl ChatHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            cap,
        }
    }

    pub fn load(store: &LocalStore, cap: usize) -> Self {
        let mut chat = Self {
            messages: store.get_or_default(CHAT_HISTORY_KEY),
            cap,
        };
        chat.trim();
        chat
    }

    pub fn save(&self, store: &mut LocalStore) -> Result<()> {
        store.set(CHAT_HISTORY_KEY, &self.messages)
    }

    fn trim(&mut self) {
        while self.messages.len() > self.cap {
            self.messages.pop_front();
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, role: ChatRole, text: impl Into<String>) {
        self.messages.push_back(ChatMessage {
            role,
            text: text.into(),
            at: Utc::now(),
        });
        self.trim();
    }
}

/// Trims a query and rejects it when nothing is left.
pub fn validate_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ClientError::Validation("query must not be empty".into()));
    }
    Ok(query)
}
