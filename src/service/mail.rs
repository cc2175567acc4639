use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub snippet: String,
    /// Plain-text body, or the HTML body when no plain part exists.
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub subject: String,
    pub snippet: String,
    pub messages: Vec<Message>,
}

impl Thread {
    /// Whether someone other than `sender` has written in this thread.
    ///
    /// A single-message thread is never a reply. Addresses are compared case-insensitively
    /// against the raw `From` header, which usually carries a display name as well.
    pub fn has_reply_from_other(&self, sender: &str) -> bool {
        if self.messages.len() <= 1 {
            return false;
        }
        let sender = sender.to_lowercase();
        self.messages
            .iter()
            .any(|message| !message.from.to_lowercase().contains(&sender))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: String,
    pub thread_id: String,
}

#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Up to `limit` threads exchanged with `address`, newest first.
    async fn fetch_threads(&self, address: &str, limit: usize) -> Result<Vec<Thread>, ServiceError>;

    async fn fetch_thread(&self, thread_id: &str) -> Result<Thread, ServiceError>;

    async fn send_message(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<SentMessage, ServiceError>;

    /// Address of the authenticated mailbox.
    async fn sender_address(&self) -> Result<String, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(from: &str) -> Message {
        Message {
            from: from.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_message_is_not_a_reply() {
        let thread = Thread {
            messages: vec![message("Grace <grace@example.com>")],
            ..Default::default()
        };
        assert!(!thread.has_reply_from_other("me@example.com"));
    }

    #[test]
    fn test_reply_detection_ignores_own_messages() {
        let mut thread = Thread {
            messages: vec![
                message("Me <Me@Example.com>"),
                message("me@example.com"),
            ],
            ..Default::default()
        };
        assert!(!thread.has_reply_from_other("me@example.com"));

        thread.messages.push(message("Grace <grace@example.com>"));
        assert!(thread.has_reply_from_other("ME@example.com"));
    }
}
