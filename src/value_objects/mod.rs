//! Value objects for the dispatch domain
//!
//! Roles, specializations and selection tags are closed enumerations with
//! exhaustive translation tables. Records (`User`, `Order`, `OrderResponse`)
//! carry identifiers that only the domain store ever assigns.

pub mod messages;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DispatchError;

pub use messages::{
    Button, ButtonAction, EventPayload, InboundEvent, OutboundMessage, ParseMode, SenderProfile,
};

/// Stable opaque identity of an end user within the messaging transport
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChatId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Store-assigned user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Store-assigned order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(OrderId)
    }
}

/// Store-assigned response identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub i64);

/// The two mutually exclusive roles a registered user may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Provider,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Provider => "Provider",
        }
    }
}

/// Kind of service a provider offers or an order requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specialization {
    Videographer,
    Photographer,
}

impl Specialization {
    pub fn label(self) -> &'static str {
        match self {
            Specialization::Videographer => "Videographer",
            Specialization::Photographer => "Photographer",
        }
    }

    /// One-line explanation shown next to the choice buttons
    pub fn blurb(self) -> &'static str {
        match self {
            Specialization::Videographer => "video shooting and editing",
            Specialization::Photographer => "photo shooting and retouching",
        }
    }

    pub const ALL: [Specialization; 2] = [Specialization::Videographer, Specialization::Photographer];
}

/// Tag attached to an interactive selection button.
///
/// The wire form is a plain string (`role_customer`, `respond_to_order:42`, ...);
/// unknown strings fail to parse with [`DispatchError::MalformedSelection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SelectionTag {
    RoleCustomer,
    RoleExecutor,
    Specialization(Specialization),
    CreateOrder,
    OrderSpecialization(Specialization),
    RespondToOrder(OrderId),
}

const RESPOND_PREFIX: &str = "respond_to_order:";

impl SelectionTag {
    pub fn as_tag(&self) -> String {
        match self {
            SelectionTag::RoleCustomer => "role_customer".to_string(),
            SelectionTag::RoleExecutor => "role_executor".to_string(),
            SelectionTag::Specialization(Specialization::Videographer) => {
                "specialization_videographer".to_string()
            }
            SelectionTag::Specialization(Specialization::Photographer) => {
                "specialization_photographer".to_string()
            }
            SelectionTag::CreateOrder => "create_order".to_string(),
            SelectionTag::OrderSpecialization(Specialization::Videographer) => {
                "order_spec_videographer".to_string()
            }
            SelectionTag::OrderSpecialization(Specialization::Photographer) => {
                "order_spec_photographer".to_string()
            }
            SelectionTag::RespondToOrder(id) => format!("{RESPOND_PREFIX}{id}"),
        }
    }
}

impl fmt::Display for SelectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_tag())
    }
}

impl FromStr for SelectionTag {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = match s {
            "role_customer" => SelectionTag::RoleCustomer,
            "role_executor" => SelectionTag::RoleExecutor,
            "specialization_videographer" => {
                SelectionTag::Specialization(Specialization::Videographer)
            }
            "specialization_photographer" => {
                SelectionTag::Specialization(Specialization::Photographer)
            }
            "create_order" => SelectionTag::CreateOrder,
            "order_spec_videographer" => {
                SelectionTag::OrderSpecialization(Specialization::Videographer)
            }
            "order_spec_photographer" => {
                SelectionTag::OrderSpecialization(Specialization::Photographer)
            }
            other => {
                let id = other
                    .strip_prefix(RESPOND_PREFIX)
                    .and_then(|raw| raw.parse::<OrderId>().ok())
                    .ok_or_else(|| DispatchError::MalformedSelection(other.to_string()))?;
                SelectionTag::RespondToOrder(id)
            }
        };
        Ok(tag)
    }
}

impl TryFrom<String> for SelectionTag {
    type Error = DispatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SelectionTag> for String {
    fn from(tag: SelectionTag) -> Self {
        tag.as_tag()
    }
}

/// A registered user as returned by the domain store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub chat_id: ChatId,
    /// Display name
    pub name: String,
    /// Transport handle, without the leading `@`
    pub handle: String,
    pub role: Role,
    /// Portfolio URL, providers only
    pub portfolio: Option<String>,
    /// Offered specialization, providers only
    pub specialization: Option<Specialization>,
}

impl User {
    /// Providers are the only users who receive order notices
    pub fn is_provider(&self) -> bool {
        self.role == Role::Provider
    }
}

/// A user record ready to be persisted; the store assigns the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub chat_id: ChatId,
    pub name: String,
    pub handle: String,
    pub role: Role,
    pub portfolio: Option<String>,
    pub specialization: Option<Specialization>,
}

impl NewUser {
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            chat_id: self.chat_id,
            name: self.name,
            handle: self.handle,
            role: self.role,
            portfolio: self.portfolio,
            specialization: self.specialization,
        }
    }
}

/// A persisted order, including a snapshot of its owning customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub specialization: Specialization,
    pub created_at: DateTime<Utc>,
    pub customer: User,
}

/// A completed order draft handed to the dispatch engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub title: String,
    pub description: String,
    pub location: String,
    pub specialization: Specialization,
    pub created_at: DateTime<Utc>,
    pub customer: User,
}

impl NewOrder {
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            title: self.title,
            description: self.description,
            location: self.location,
            specialization: self.specialization,
            created_at: self.created_at,
            customer: self.customer,
        }
    }
}

/// "Provider X is interested in order Y"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: ResponseId,
    pub order_id: OrderId,
    pub provider_id: UserId,
    pub created_at: DateTime<Utc>,
}
