//! Notification channel port
//!
//! The core never talks to the chat transport directly; it hands
//! [`OutboundMessage`]s to a [`Notifier`].

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};

use crate::error::TransportError;
use crate::value_objects::{ChatId, OutboundMessage};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message to its recipient
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError>;
}

/// Notifier that queues messages for a transport gateway task
#[derive(Debug, Clone)]
pub struct OutboundChannel {
    sender: mpsc::Sender<OutboundMessage>,
}

impl OutboundChannel {
    /// Create the channel and the receiving half for the gateway
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Notifier for OutboundChannel {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

/// Notifier that records everything it is asked to deliver
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    sent: Arc<RwLock<Vec<OutboundMessage>>>,
    unreachable: Arc<RwLock<HashSet<ChatId>>>,
}

impl MemoryNotifier {
    /// Create a notifier that reaches everyone
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deliveries to `chat_id` fail with [`TransportError::Rejected`]
    pub async fn make_unreachable(&self, chat_id: ChatId) {
        self.unreachable.write().await.insert(chat_id);
    }

    /// Every delivered message, oldest first
    pub async fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.read().await.clone()
    }

    /// Delivered messages addressed to `chat_id`
    pub async fn sent_to(&self, chat_id: &ChatId) -> Vec<OutboundMessage> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|m| &m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.write().await.clear();
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        if self.unreachable.read().await.contains(&message.chat_id) {
            return Err(TransportError::Rejected {
                chat_id: message.chat_id,
                reason: "recipient unreachable".to_string(),
            });
        }
        self.sent.write().await.push(message);
        Ok(())
    }
}
