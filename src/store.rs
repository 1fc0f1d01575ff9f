use std::collections::VecDeque;

use serde::Serialize;
use time::OffsetDateTime;

/// A posted message. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: u64,
    #[serde(rename = "msg")]
    pub body: String,
    #[serde(rename = "pseudo")]
    pub author: String,
    #[serde(rename = "date", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Bounded in-memory message list, kept in insertion order (oldest first).
///
/// Ids come from a monotonic counter and are never reused, so a deleted
/// message's id stays dead even after newer messages arrive.
#[derive(Debug)]
pub struct MessageStore {
    messages: VecDeque<Message>,
    next_id: u64,
    capacity: usize,
}

impl MessageStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(1024)),
            next_id: 0,
            capacity,
        }
    }

    /// All messages, newest first.
    pub fn list(&self) -> Vec<Message> {
        let mut messages: Vec<Message> = self.messages.iter().cloned().collect();
        messages.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        messages
    }

    pub fn insert(&mut self, body: String, author: String) -> Message {
        self.insert_at(body, author, OffsetDateTime::now_utc())
    }

    /// Stores a message, evicting the oldest entries until the store fits its capacity.
    pub fn insert_at(&mut self, body: String, author: String, created_at: OffsetDateTime) -> Message {
        let message = Message {
            id: self.next_id,
            body,
            author,
            created_at,
        };
        self.next_id += 1;

        self.messages.push_back(message.clone());
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }

        message
    }

    pub fn remove_by_id(&mut self, id: u64) -> bool {
        let Some(position) = self.messages.iter().position(|m| m.id == id) else {
            return false;
        };
        self.messages.remove(position).is_some()
    }

    /// Message at `position` in insertion order.
    pub fn get(&self, position: usize) -> Option<&Message> {
        self.messages.get(position)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
