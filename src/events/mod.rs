//! Dispatch domain events
//!
//! Returned by the engines for every handled inbound event so callers can
//! audit what happened without inspecting the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::DialogueStage;
use crate::value_objects::{ChatId, Order, OrderResponse, User};

/// Common surface of every domain event
pub trait DomainEvent {
    /// Versioned subject, e.g. `lenshub.user.registered.v1`
    fn subject(&self) -> String;

    /// Chat identity the event concerns
    fn chat_id(&self) -> &ChatId;

    fn event_type(&self) -> &'static str;
}

/// A registration dialogue was (re)started
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationStarted {
    pub chat_id: ChatId,
    pub started_at: DateTime<Utc>,
}

impl DomainEvent for RegistrationStarted {
    fn subject(&self) -> String {
        "lenshub.registration.started.v1".to_string()
    }

    fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    fn event_type(&self) -> &'static str {
        "RegistrationStarted"
    }
}

/// The dialogue moved to another stage without persisting anything
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageAdvanced {
    pub chat_id: ChatId,
    pub from: DialogueStage,
    pub to: DialogueStage,
    pub advanced_at: DateTime<Utc>,
}

impl DomainEvent for StageAdvanced {
    fn subject(&self) -> String {
        "lenshub.dialogue.advanced.v1".to_string()
    }

    fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    fn event_type(&self) -> &'static str {
        "StageAdvanced"
    }
}

/// An existing user asked for their profile card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileShown {
    pub chat_id: ChatId,
    pub user: User,
}

impl DomainEvent for ProfileShown {
    fn subject(&self) -> String {
        "lenshub.profile.shown.v1".to_string()
    }

    fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    fn event_type(&self) -> &'static str {
        "ProfileShown"
    }
}

/// Registration completed and the user was stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user: User,
    pub registered_at: DateTime<Utc>,
}

impl DomainEvent for UserRegistered {
    fn subject(&self) -> String {
        "lenshub.user.registered.v1".to_string()
    }

    fn chat_id(&self) -> &ChatId {
        &self.user.chat_id
    }

    fn event_type(&self) -> &'static str {
        "UserRegistered"
    }
}

/// An order was stored and fanned out to matching providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order: Order,
    /// Providers whose notification was delivered
    pub providers_notified: usize,
    /// Providers whose notification could not be delivered
    pub delivery_failures: usize,
}

impl DomainEvent for OrderPlaced {
    fn subject(&self) -> String {
        "lenshub.order.placed.v1".to_string()
    }

    fn chat_id(&self) -> &ChatId {
        &self.order.customer.chat_id
    }

    fn event_type(&self) -> &'static str {
        "OrderPlaced"
    }
}

/// A provider responded to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecorded {
    pub provider_chat_id: ChatId,
    pub response: OrderResponse,
    /// Whether the owning customer received the profile exchange
    pub customer_notified: bool,
}

impl DomainEvent for ResponseRecorded {
    fn subject(&self) -> String {
        "lenshub.response.recorded.v1".to_string()
    }

    fn chat_id(&self) -> &ChatId {
        &self.provider_chat_id
    }

    fn event_type(&self) -> &'static str {
        "ResponseRecorded"
    }
}

/// A terminal step failed; the dialogue stayed where it was
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionFailed {
    pub chat_id: ChatId,
    pub stage: DialogueStage,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

impl DomainEvent for TransitionFailed {
    fn subject(&self) -> String {
        "lenshub.dialogue.failed.v1".to_string()
    }

    fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    fn event_type(&self) -> &'static str {
        "TransitionFailed"
    }
}

/// Enum wrapper for all dispatch domain events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DispatchDomainEvent {
    RegistrationStarted(RegistrationStarted),
    StageAdvanced(StageAdvanced),
    ProfileShown(ProfileShown),
    UserRegistered(UserRegistered),
    OrderPlaced(OrderPlaced),
    ResponseRecorded(ResponseRecorded),
    TransitionFailed(TransitionFailed),
}

impl DispatchDomainEvent {
    fn inner(&self) -> &dyn DomainEvent {
        match self {
            DispatchDomainEvent::RegistrationStarted(e) => e,
            DispatchDomainEvent::StageAdvanced(e) => e,
            DispatchDomainEvent::ProfileShown(e) => e,
            DispatchDomainEvent::UserRegistered(e) => e,
            DispatchDomainEvent::OrderPlaced(e) => e,
            DispatchDomainEvent::ResponseRecorded(e) => e,
            DispatchDomainEvent::TransitionFailed(e) => e,
        }
    }
}

impl DomainEvent for DispatchDomainEvent {
    fn subject(&self) -> String {
        self.inner().subject()
    }

    fn chat_id(&self) -> &ChatId {
        self.inner().chat_id()
    }

    fn event_type(&self) -> &'static str {
        self.inner().event_type()
    }
}
