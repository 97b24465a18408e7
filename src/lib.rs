//! LensHub dispatch core
//!
//! Matches customers with photo and video providers over a chat transport.
//! This crate holds the part with real control flow:
//! - a per-user dialogue state machine for registration and order creation
//! - persistence of completed dialogues through a [`DomainStore`]
//! - fan-out of new orders to matching providers and routing of their
//!   responses back to the customer
//!
//! Transport and persistence sit behind the [`Notifier`] and [`DomainStore`]
//! traits. [`runtime::start`] wires a [`DialogueEngine`] to an inbound stream.

pub mod aggregate;
pub mod channel;
pub mod error;
pub mod events;
pub mod handlers;
pub mod repository;
pub mod runtime;
pub mod settings;
pub mod store;
pub mod telemetry;
pub mod value_objects;

// Re-export main types
pub use aggregate::{ConversationState, DialogueStage, Draft, OrderDraft, UserDraft};

pub use channel::{MemoryNotifier, Notifier, OutboundChannel};

pub use error::{DispatchError, DispatchResult, StoreError, StoreResult, TransportError};

pub use events::{
    DispatchDomainEvent, DomainEvent, OrderPlaced, ProfileShown, RegistrationStarted,
    ResponseRecorded, StageAdvanced, TransitionFailed, UserRegistered,
};

pub use handlers::{DialogueEngine, DispatchEngine};
pub use repository::{DomainStore, InMemoryDomainStore};
pub use runtime::{EventLoop, LoopReport};
pub use settings::{DispatchConfig, DispatchSettings, RuntimeConfig, TelemetryConfig};
pub use store::ConversationStateStore;

pub use value_objects::{
    Button, ButtonAction, ChatId, EventPayload, InboundEvent, NewOrder, NewUser, Order, OrderId,
    OrderResponse, OutboundMessage, ParseMode, ResponseId, Role, SelectionTag, SenderProfile,
    Specialization, User, UserId,
};
