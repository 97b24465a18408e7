//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use lenshub_dispatch::{
    ChatId, DialogueEngine, DispatchDomainEvent, DomainStore, InMemoryDomainStore, InboundEvent,
    MemoryNotifier, NewOrder, NewUser, Order, OrderId, OrderResponse, SenderProfile,
    Specialization, StoreError, StoreResult, User, UserId,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Domain store whose writes and lookups can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: InMemoryDomainStore,
    fail_user_writes: AtomicBool,
    fail_order_writes: AtomicBool,
    fail_lookups: AtomicBool,
}

impl FlakyStore {
    pub fn fail_user_writes(&self, on: bool) {
        self.fail_user_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_order_writes(&self, on: bool) {
        self.fail_order_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_lookups(&self, on: bool) {
        self.fail_lookups.store(on, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DomainStore for FlakyStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        Self::check(&self.fail_user_writes)?;
        self.inner.create_user(user).await
    }

    async fn get_user_by_chat_id(&self, chat_id: &ChatId) -> StoreResult<Option<User>> {
        Self::check(&self.fail_lookups)?;
        self.inner.get_user_by_chat_id(chat_id).await
    }

    async fn get_providers_by_specialization(
        &self,
        specialization: Specialization,
    ) -> StoreResult<Vec<User>> {
        self.inner.get_providers_by_specialization(specialization).await
    }

    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        Self::check(&self.fail_order_writes)?;
        self.inner.create_order(order).await
    }

    async fn get_order(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        self.inner.get_order(order_id).await
    }

    async fn create_response(
        &self,
        order_id: OrderId,
        provider_id: UserId,
    ) -> StoreResult<OrderResponse> {
        self.inner.create_response(order_id, provider_id).await
    }
}

pub type Engine = DialogueEngine<FlakyStore, MemoryNotifier>;

pub fn harness() -> (Arc<FlakyStore>, Arc<MemoryNotifier>, Engine) {
    let store = Arc::new(FlakyStore::default());
    let notifier = Arc::new(MemoryNotifier::new());
    let engine = DialogueEngine::new(store.clone(), notifier.clone());
    (store, notifier, engine)
}

pub fn sender(chat: &str) -> SenderProfile {
    SenderProfile::new(format!("User {chat}"), format!("user_{chat}"))
}

pub async fn start(engine: &Engine, chat: &str) -> Vec<DispatchDomainEvent> {
    engine
        .handle(InboundEvent::command(chat, sender(chat), "start"))
        .await
}

pub async fn select(engine: &Engine, chat: &str, tag: &str) -> Vec<DispatchDomainEvent> {
    engine
        .handle(InboundEvent::selection(chat, sender(chat), tag))
        .await
}

pub async fn text(engine: &Engine, chat: &str, content: &str) -> Vec<DispatchDomainEvent> {
    engine
        .handle(InboundEvent::text(chat, sender(chat), content))
        .await
}

pub async fn register_customer(engine: &Engine, chat: &str) {
    start(engine, chat).await;
    select(engine, chat, "role_customer").await;
}

pub async fn register_provider(engine: &Engine, chat: &str, specialization: Specialization) {
    let tag = match specialization {
        Specialization::Videographer => "specialization_videographer",
        Specialization::Photographer => "specialization_photographer",
    };
    start(engine, chat).await;
    select(engine, chat, "role_executor").await;
    text(engine, chat, &format!("https://portfolio.example/{chat}")).await;
    select(engine, chat, tag).await;
}

/// Drive a registered customer through the order dialogue up to the location prompt
pub async fn draft_order(engine: &Engine, chat: &str, specialization: Specialization) {
    let tag = match specialization {
        Specialization::Videographer => "order_spec_videographer",
        Specialization::Photographer => "order_spec_photographer",
    };
    select(engine, chat, "create_order").await;
    select(engine, chat, tag).await;
    text(engine, chat, "Wedding shoot").await;
    text(engine, chat, "Full day, two locations").await;
}

pub fn placed_order(events: &[DispatchDomainEvent]) -> Option<&lenshub_dispatch::OrderPlaced> {
    events.iter().find_map(|event| match event {
        DispatchDomainEvent::OrderPlaced(placed) => Some(placed),
        _ => None,
    })
}
