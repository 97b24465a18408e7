//! Registration and order dialogues driven through the engine

mod common;

use chrono::Utc;
use common::*;
use lenshub_dispatch::{
    ChatId, DialogueStage, DispatchDomainEvent, DomainStore, Role, SelectionTag, Specialization,
};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_first_start_opens_role_choice() {
    let (_store, notifier, engine) = harness();

    let events = start(&engine, "10").await;

    assert!(matches!(events[..], [DispatchDomainEvent::RegistrationStarted(_)]));
    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::ChoosingRole);

    let sent = notifier.sent_to(&ChatId::new("10")).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].callback_tags(),
        vec![SelectionTag::RoleCustomer, SelectionTag::RoleExecutor]
    );
}

#[tokio::test]
async fn test_start_for_registered_user_shows_profile() {
    let (_store, notifier, engine) = harness();
    register_customer(&engine, "10").await;
    let before = engine.states().get(&ChatId::new("10"));
    notifier.clear().await;

    let events = start(&engine, "10").await;

    assert!(matches!(events[..], [DispatchDomainEvent::ProfileShown(_)]));
    assert_eq!(engine.states().get(&ChatId::new("10")), before);
    let sent = notifier.sent_to(&ChatId::new("10")).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].callback_tags(), vec![SelectionTag::CreateOrder]);
}

#[tokio::test]
async fn test_start_for_registered_user_keeps_order_draft() {
    let (_store, _notifier, engine) = harness();
    register_customer(&engine, "10").await;
    select(&engine, "10", "create_order").await;
    select(&engine, "10", "order_spec_videographer").await;

    start(&engine, "10").await;

    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::EnteringOrderTitle);
}

#[tokio::test]
async fn test_start_restarts_unfinished_registration() {
    let (_store, _notifier, engine) = harness();
    start(&engine, "10").await;
    select(&engine, "10", "role_executor").await;
    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::EnteringPortfolio);

    start(&engine, "10").await;

    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::ChoosingRole);
}

#[tokio::test]
async fn test_customer_registration() {
    let (store, notifier, engine) = harness();
    start(&engine, "10").await;

    let events = select(&engine, "10", "role_customer").await;

    let user = match &events[..] {
        [DispatchDomainEvent::UserRegistered(registered)] => registered.user.clone(),
        other => panic!("unexpected events {other:?}"),
    };
    assert_eq!(user.role, Role::Customer);
    assert_eq!(user.name, "User 10");
    assert_eq!(user.handle, "user_10");
    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::Idle);
    assert!(engine.states().get(&ChatId::new("10")).is_pristine());

    let stored = assert_ok!(store.get_user_by_chat_id(&ChatId::new("10")).await);
    assert_eq!(stored, Some(user));

    // welcome, success notice, then the profile card
    let sent = notifier.sent_to(&ChatId::new("10")).await;
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[2].callback_tags(), vec![SelectionTag::CreateOrder]);
}

#[tokio::test]
async fn test_provider_registration_walks_intermediate_stages() {
    let (store, _notifier, engine) = harness();
    let chat = ChatId::new("20");
    start(&engine, "20").await;

    select(&engine, "20", "role_executor").await;
    assert_eq!(engine.stage(&chat), DialogueStage::EnteringPortfolio);

    text(&engine, "20", "https://portfolio.example/20").await;
    assert_eq!(engine.stage(&chat), DialogueStage::ChoosingSpecialization);

    select(&engine, "20", "specialization_videographer").await;
    assert_eq!(engine.stage(&chat), DialogueStage::Idle);

    let user = assert_ok!(store.get_user_by_chat_id(&chat).await).unwrap();
    assert_eq!(user.role, Role::Provider);
    assert_eq!(user.portfolio.as_deref(), Some("https://portfolio.example/20"));
    assert_eq!(user.specialization, Some(Specialization::Videographer));
}

#[tokio::test]
async fn test_out_of_stage_selections_are_ignored() {
    let (store, notifier, engine) = harness();
    let chat = ChatId::new("30");

    // nothing registered yet, so nothing is in progress
    assert!(select(&engine, "30", "role_customer").await.is_empty());
    assert!(select(&engine, "30", "specialization_photographer").await.is_empty());
    assert!(select(&engine, "30", "order_spec_photographer").await.is_empty());
    assert!(text(&engine, "30", "stray text").await.is_empty());
    assert_eq!(store.inner.user_count().await, 0);

    start(&engine, "30").await;
    select(&engine, "30", "role_executor").await;
    let before = engine.states().get(&chat);

    // a specialization before the portfolio would corrupt the draft
    assert!(select(&engine, "30", "specialization_photographer").await.is_empty());
    assert!(select(&engine, "30", "role_customer").await.is_empty());
    assert!(select(&engine, "30", "create_order").await.is_empty());
    assert_eq!(engine.states().get(&chat), before);
    assert_eq!(store.inner.user_count().await, 0);
    assert_eq!(notifier.sent_to(&chat).await.len(), 2);
}

#[tokio::test]
async fn test_malformed_and_unknown_inputs_are_ignored() {
    let (_store, notifier, engine) = harness();
    register_customer(&engine, "10").await;
    notifier.clear().await;

    assert!(select(&engine, "10", "respond_to_order:abc").await.is_empty());
    assert!(select(&engine, "10", "my_orders").await.is_empty());
    assert!(
        engine
            .handle(lenshub_dispatch::InboundEvent::command("10", sender("10"), "help"))
            .await
            .is_empty()
    );
    assert!(notifier.sent().await.is_empty());
}

#[tokio::test]
async fn test_create_order_requires_customer_role() {
    let (_store, _notifier, engine) = harness();
    register_provider(&engine, "20", Specialization::Photographer).await;

    assert!(select(&engine, "20", "create_order").await.is_empty());
    assert_eq!(engine.stage(&ChatId::new("20")), DialogueStage::Idle);

    // unregistered identities cannot open an order either
    assert!(select(&engine, "99", "create_order").await.is_empty());
    assert_eq!(engine.stage(&ChatId::new("99")), DialogueStage::Idle);
}

#[tokio::test]
async fn test_order_dialogue_creates_order_and_notifies_providers() {
    let (store, notifier, engine) = harness();
    register_provider(&engine, "20", Specialization::Photographer).await;
    register_provider(&engine, "21", Specialization::Photographer).await;
    register_provider(&engine, "22", Specialization::Videographer).await;
    register_customer(&engine, "10").await;
    notifier.clear().await;

    let started = Utc::now();
    draft_order(&engine, "10", Specialization::Photographer).await;
    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::EnteringOrderLocation);

    let events = text(&engine, "10", "Central park").await;
    let placed = placed_order(&events).expect("order placed");

    assert_eq!(placed.order.title, "Wedding shoot");
    assert_eq!(placed.order.description, "Full day, two locations");
    assert_eq!(placed.order.location, "Central park");
    assert_eq!(placed.order.specialization, Specialization::Photographer);
    assert!(placed.order.created_at >= started);

    let customer = store.get_user_by_chat_id(&ChatId::new("10")).await.unwrap().unwrap();
    assert_eq!(placed.order.customer, customer);
    assert_eq!(placed.providers_notified, 2);
    assert_eq!(placed.delivery_failures, 0);
    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::Idle);

    let token = SelectionTag::RespondToOrder(placed.order.id);
    for chat in ["20", "21"] {
        let sent = notifier.sent_to(&ChatId::new(chat)).await;
        assert_eq!(sent.len(), 1, "provider {chat}");
        assert_eq!(sent[0].callback_tags(), vec![token]);
    }
    assert!(notifier.sent_to(&ChatId::new("22")).await.is_empty());
    assert_eq!(store.inner.orders().await.len(), 1);
}

#[tokio::test]
async fn test_failed_order_write_keeps_location_stage_for_retry() {
    let (store, notifier, engine) = harness();
    register_provider(&engine, "20", Specialization::Videographer).await;
    register_customer(&engine, "10").await;
    draft_order(&engine, "10", Specialization::Videographer).await;
    notifier.clear().await;

    store.fail_order_writes(true);
    let events = text(&engine, "10", "Old town").await;

    assert!(matches!(events[..], [DispatchDomainEvent::TransitionFailed(_)]));
    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::EnteringOrderLocation);
    assert_eq!(notifier.sent_to(&ChatId::new("10")).await.len(), 1);
    assert!(notifier.sent_to(&ChatId::new("20")).await.is_empty());
    assert!(store.inner.orders().await.is_empty());

    store.fail_order_writes(false);
    let events = text(&engine, "10", "Old town").await;

    let placed = placed_order(&events).expect("order placed on retry");
    assert_eq!(placed.order.location, "Old town");
    assert_eq!(placed.order.title, "Wedding shoot");
    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::Idle);
    assert_eq!(notifier.sent_to(&ChatId::new("20")).await.len(), 1);
}

#[tokio::test]
async fn test_failed_user_write_keeps_stage_for_retry() {
    let (store, notifier, engine) = harness();
    start(&engine, "10").await;
    start(&engine, "20").await;
    select(&engine, "20", "role_executor").await;
    text(&engine, "20", "https://portfolio.example/20").await;
    notifier.clear().await;

    store.fail_user_writes(true);
    let customer = select(&engine, "10", "role_customer").await;
    let provider = select(&engine, "20", "specialization_photographer").await;

    assert!(matches!(customer[..], [DispatchDomainEvent::TransitionFailed(_)]));
    assert!(matches!(provider[..], [DispatchDomainEvent::TransitionFailed(_)]));
    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::ChoosingRole);
    assert_eq!(engine.stage(&ChatId::new("20")), DialogueStage::ChoosingSpecialization);
    assert_eq!(notifier.sent().await.len(), 2);
    assert_eq!(store.inner.user_count().await, 0);

    store.fail_user_writes(false);
    select(&engine, "10", "role_customer").await;
    select(&engine, "20", "specialization_photographer").await;

    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::Idle);
    assert_eq!(engine.stage(&ChatId::new("20")), DialogueStage::Idle);
    assert_eq!(store.inner.user_count().await, 2);
}

#[tokio::test]
async fn test_lookup_failure_on_start_leaves_state_alone() {
    let (store, notifier, engine) = harness();
    store.fail_lookups(true);

    let events = start(&engine, "10").await;

    assert!(matches!(events[..], [DispatchDomainEvent::TransitionFailed(_)]));
    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::Idle);
    assert_eq!(notifier.sent_to(&ChatId::new("10")).await.len(), 1);
    assert_err!(store.get_user_by_chat_id(&ChatId::new("10")).await);
}

#[tokio::test]
async fn test_abandoned_drafts_stay_until_resumed() {
    let (_store, _notifier, engine) = harness();
    register_customer(&engine, "10").await;
    draft_order(&engine, "10", Specialization::Photographer).await;
    start(&engine, "11").await;

    assert_eq!(engine.states().pending_drafts(), 2);
    assert_eq!(engine.stage(&ChatId::new("10")), DialogueStage::EnteringOrderLocation);
}
