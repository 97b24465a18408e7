//! Domain store port
//!
//! The dispatch core persists users, orders and responses through
//! [`DomainStore`]. Identifiers are assigned by the implementation only.

mod memory;

pub use memory::InMemoryDomainStore;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::value_objects::{
    ChatId, NewOrder, NewUser, Order, OrderId, OrderResponse, Specialization, User, UserId,
};

/// Repository for users, orders and responses
#[async_trait]
pub trait DomainStore: Send + Sync {
    /// Persist a newly registered user
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// `Ok(None)` when the identity never registered
    async fn get_user_by_chat_id(&self, chat_id: &ChatId) -> StoreResult<Option<User>>;

    /// Registered providers offering `specialization`
    async fn get_providers_by_specialization(
        &self,
        specialization: Specialization,
    ) -> StoreResult<Vec<User>>;

    /// Persist an order and return it with the owning customer resolved
    async fn create_order(&self, order: NewOrder) -> StoreResult<Order>;

    /// `Ok(None)` when the order does not exist
    async fn get_order(&self, order_id: OrderId) -> StoreResult<Option<Order>>;

    async fn create_response(
        &self,
        order_id: OrderId,
        provider_id: UserId,
    ) -> StoreResult<OrderResponse>;
}
