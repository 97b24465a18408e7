//! Error taxonomy for the dispatch core

use thiserror::Error;

use crate::aggregate::DialogueStage;
use crate::value_objects::{ChatId, OrderId};

/// Failures reported by a domain store implementation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("domain store unavailable: {0}")]
    Unavailable(String),

    #[error("record already exists: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),
}

/// Failures reported by a notifier implementation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("outbound channel closed")]
    Closed,

    #[error("delivery to {chat_id} rejected: {reason}")]
    Rejected { chat_id: ChatId, reason: String },
}

/// Errors produced while driving dialogues and dispatching orders
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to deliver message: {0}")]
    TransportSendFailure(#[from] TransportError),

    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("chat {0} has no registered user")]
    NotRegistered(ChatId),

    #[error("unrecognised selection tag {0:?}")]
    MalformedSelection(String),

    #[error("cannot {action} while in stage {from:?}")]
    InvalidStateTransition {
        from: DialogueStage,
        action: &'static str,
    },
}

impl DispatchError {
    pub fn order_not_found(id: OrderId) -> Self {
        DispatchError::NotFound {
            entity: "order",
            id: id.to_string(),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
pub type StoreResult<T> = Result<T, StoreError>;
