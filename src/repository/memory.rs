//! In-memory implementation of the domain store

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::DomainStore;
use crate::error::{StoreError, StoreResult};
use crate::value_objects::{
    ChatId, NewOrder, NewUser, Order, OrderId, OrderResponse, ResponseId, Specialization,
    User, UserId,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    orders: HashMap<OrderId, Order>,
    responses: Vec<OrderResponse>,
    next_user_id: i64,
    next_order_id: i64,
    next_response_id: i64,
}

/// Domain store backed by in-process tables
#[derive(Debug, Clone, Default)]
pub struct InMemoryDomainStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDomainStore {
    /// Create a store with empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored response, oldest first
    pub async fn responses(&self) -> Vec<OrderResponse> {
        self.tables.read().await.responses.clone()
    }

    pub async fn orders(&self) -> Vec<Order> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables.orders.values().cloned().collect();
        orders.sort_by_key(|order| order.id);
        orders
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Drop an order, as an external admin tool would
    pub async fn remove_order(&self, order_id: OrderId) -> Option<Order> {
        self.tables.write().await.orders.remove(&order_id)
    }
}

#[async_trait]
impl DomainStore for InMemoryDomainStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.chat_id == user.chat_id) {
            return Err(StoreError::Conflict(format!("user with chat id {}", user.chat_id)));
        }

        tables.next_user_id += 1;
        let user = user.into_user(UserId(tables.next_user_id));
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_chat_id(&self, chat_id: &ChatId) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| &u.chat_id == chat_id).cloned())
    }

    async fn get_providers_by_specialization(
        &self,
        specialization: Specialization,
    ) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| u.is_provider() && u.specialization == Some(specialization))
            .cloned()
            .collect())
    }

    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;
        // resolve the owner from the users table, as a join would
        let customer = tables
            .users
            .iter()
            .find(|u| u.id == order.customer.id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {}", order.customer.id.0)))?;

        tables.next_order_id += 1;
        let id = OrderId(tables.next_order_id);
        let order = NewOrder { customer, ..order }.into_order(id);
        tables.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&order_id).cloned())
    }

    async fn create_response(
        &self,
        order_id: OrderId,
        provider_id: UserId,
    ) -> StoreResult<OrderResponse> {
        let mut tables = self.tables.write().await;
        tables.next_response_id += 1;
        let response = OrderResponse {
            id: ResponseId(tables.next_response_id),
            order_id,
            provider_id,
            created_at: Utc::now(),
        };
        tables.responses.push(response.clone());
        Ok(response)
    }
}
