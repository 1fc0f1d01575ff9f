use std::{net::IpAddr, time::Instant};

use time::OffsetDateTime;

use crate::{
    spam::{SpamConfig, SpamGuard, SpamRejection},
    store::{Message, MessageStore},
};

const WELCOME_MESSAGES: [(&str, &str); 3] = [
    ("Hello World", "System"),
    ("Welcome to the board!", "Admin"),
    ("CentraleSupelec Forever", "Étudiant"),
];

/// Message store and spam history, mutated together under one lock so an
/// accepted submission is always stored before the next one is judged.
#[derive(Debug)]
pub struct Board {
    pub store: MessageStore,
    spam: SpamGuard,
}

impl Board {
    pub fn new(capacity: usize, spam: SpamConfig) -> Self {
        Self {
            store: MessageStore::new(capacity),
            spam: SpamGuard::new(spam),
        }
    }

    /// Stores the welcome messages shown on a fresh board. They skip the spam
    /// history so users may still echo them.
    pub fn seed(&mut self) {
        for (body, author) in WELCOME_MESSAGES {
            self.store.insert(body.to_owned(), author.to_owned());
        }
    }

    /// Runs the spam checks and stores the message if they pass.
    pub fn submit(
        &mut self,
        submitter: IpAddr,
        body: String,
        author: String,
    ) -> Result<Message, SpamRejection> {
        self.submit_at(submitter, body, author, Instant::now(), OffsetDateTime::now_utc())
    }

    pub fn submit_at(
        &mut self,
        submitter: IpAddr,
        body: String,
        author: String,
        now: Instant,
        created_at: OffsetDateTime,
    ) -> Result<Message, SpamRejection> {
        self.spam.check_at(submitter, &body, now)?;
        Ok(self.store.insert_at(body, author, created_at))
    }
}
