//! Dialogue engine - the registration and order-creation state machine
//!
//! [`DialogueEngine::handle`] consumes one inbound event, moves the sender's
//! conversation along, talks to the domain store on terminal steps and hands
//! completed orders and responses to the [`DispatchEngine`]. It never returns
//! an error: failures end in a logged message and, where the user can act on
//! it, a failure notice.

use chrono::Utc;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::dispatch::DispatchEngine;
use super::templates;
use crate::aggregate::{ConversationState, DialogueStage};
use crate::channel::Notifier;
use crate::error::{DispatchError, DispatchResult};
use crate::events::*;
use crate::repository::DomainStore;
use crate::settings::DispatchSettings;
use crate::store::ConversationStateStore;
use crate::value_objects::{
    ChatId, EventPayload, InboundEvent, NewUser, OrderId, OutboundMessage, Role, SelectionTag,
    SenderProfile,
};

const START_COMMAND: &str = "start";

/// Stage left behind and the state now stored
type Step = (DialogueStage, ConversationState);

/// A terminal transition applied to a copy, awaiting persistence
struct Staged<T> {
    snapshot: ConversationState,
    next: ConversationState,
    output: T,
}

pub struct DialogueEngine<S, N>
where
    S: DomainStore,
    N: Notifier,
{
    states: ConversationStateStore,
    store: Arc<S>,
    notifier: Arc<N>,
    dispatch: DispatchEngine<S, N>,
}

impl<S, N> DialogueEngine<S, N>
where
    S: DomainStore,
    N: Notifier,
{
    /// Create an engine with default dispatch settings
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self::with_settings(store, notifier, DispatchSettings::default())
    }

    /// Create an engine with explicit dispatch settings
    pub fn with_settings(store: Arc<S>, notifier: Arc<N>, settings: DispatchSettings) -> Self {
        Self {
            states: ConversationStateStore::new(),
            dispatch: DispatchEngine::new(store.clone(), notifier.clone(), settings),
            store,
            notifier,
        }
    }

    /// In-flight conversation states
    pub fn states(&self) -> &ConversationStateStore {
        &self.states
    }

    /// The dispatch engine that receives completed orders and responses
    pub fn dispatch(&self) -> &DispatchEngine<S, N> {
        &self.dispatch
    }

    /// Current stage for `chat_id`
    pub fn stage(&self, chat_id: &ChatId) -> DialogueStage {
        self.states.get(chat_id).stage()
    }

    /// Handle one inbound event and report what happened
    pub async fn handle(&self, event: InboundEvent) -> Vec<DispatchDomainEvent> {
        let span = info_span!(
            "inbound_event",
            chat_id = %event.chat_id,
            correlation_id = %Uuid::new_v4()
        );
        self.route(event).instrument(span).await
    }

    async fn route(&self, event: InboundEvent) -> Vec<DispatchDomainEvent> {
        let InboundEvent {
            chat_id,
            sender,
            payload,
        } = event;

        match payload {
            EventPayload::Command(name) if name == START_COMMAND => {
                self.on_start(&chat_id, &sender).await
            }
            EventPayload::Command(name) => {
                debug!(command = %name, "ignoring unknown command");
                Vec::new()
            }
            EventPayload::Text(content) => self.on_text(&chat_id, &content).await,
            EventPayload::Selection(raw) => match raw.parse::<SelectionTag>() {
                Ok(tag) => self.on_selection(&chat_id, &sender, tag).await,
                Err(e) => {
                    debug!(error = %e, "ignoring selection");
                    Vec::new()
                }
            },
        }
    }

    async fn on_start(&self, chat_id: &ChatId, sender: &SenderProfile) -> Vec<DispatchDomainEvent> {
        match self.store.get_user_by_chat_id(chat_id).await {
            Ok(Some(user)) => {
                self.send(templates::profile_card(&user)).await;
                vec![DispatchDomainEvent::ProfileShown(ProfileShown {
                    chat_id: chat_id.clone(),
                    user,
                })]
            }
            Ok(None) => {
                let started = self.states.try_update(chat_id, |state| {
                    state.begin_registration(sender);
                    Ok(())
                });
                if let Err(e) = started {
                    error!(error = %e, "could not start registration");
                    return Vec::new();
                }
                info!("registration started");
                self.send(templates::welcome(chat_id.clone())).await;
                vec![DispatchDomainEvent::RegistrationStarted(RegistrationStarted {
                    chat_id: chat_id.clone(),
                    started_at: Utc::now(),
                })]
            }
            Err(e) => {
                error!(error = %e, "user lookup failed");
                self.send(templates::lookup_failed(chat_id.clone())).await;
                vec![self.failed(chat_id, DispatchError::from(e))]
            }
        }
    }

    async fn on_text(&self, chat_id: &ChatId, content: &str) -> Vec<DispatchDomainEvent> {
        match self.states.get(chat_id).stage() {
            DialogueStage::EnteringPortfolio => {
                let step = self.step(chat_id, |state| state.submit_portfolio(content));
                self.advance(chat_id, step, templates::specialization_prompt(chat_id.clone()))
                    .await
            }
            DialogueStage::EnteringOrderTitle => {
                let step = self.step(chat_id, |state| state.submit_title(content));
                self.advance(chat_id, step, templates::description_prompt(chat_id.clone()))
                    .await
            }
            DialogueStage::EnteringOrderDescription => {
                let step = self.step(chat_id, |state| state.submit_description(content));
                self.advance(chat_id, step, templates::location_prompt(chat_id.clone()))
                    .await
            }
            DialogueStage::EnteringOrderLocation => self.complete_order(chat_id, content).await,
            stage => {
                debug!(?stage, "ignoring text");
                Vec::new()
            }
        }
    }

    async fn on_selection(
        &self,
        chat_id: &ChatId,
        sender: &SenderProfile,
        tag: SelectionTag,
    ) -> Vec<DispatchDomainEvent> {
        match tag {
            SelectionTag::RoleCustomer => {
                let staged = self.stage_terminal(chat_id, |state| state.register_customer(sender));
                self.register(chat_id, staged).await
            }
            SelectionTag::RoleExecutor => {
                let step = self.step(chat_id, |state| state.choose_provider());
                self.advance(chat_id, step, templates::portfolio_prompt(chat_id.clone()))
                    .await
            }
            SelectionTag::Specialization(specialization) => {
                let staged = self.stage_terminal(chat_id, |state| {
                    state.register_provider(specialization, sender)
                });
                self.register(chat_id, staged).await
            }
            SelectionTag::CreateOrder => self.open_order(chat_id).await,
            SelectionTag::OrderSpecialization(specialization) => {
                let step = self.step(chat_id, |state| {
                    state.choose_order_specialization(specialization)
                });
                self.advance(chat_id, step, templates::title_prompt(chat_id.clone()))
                    .await
            }
            SelectionTag::RespondToOrder(order_id) => self.respond(chat_id, order_id).await,
        }
    }

    /// Apply a non-terminal transition; yields the stage it left and the new state
    fn step<F>(&self, chat_id: &ChatId, transition: F) -> DispatchResult<Step>
    where
        F: FnOnce(&mut ConversationState) -> DispatchResult<()>,
    {
        self.states.try_update(chat_id, |state| {
            let from = state.stage();
            transition(state).map(|()| from)
        })
    }

    /// Run a terminal transition against a copy of the stored state.
    ///
    /// Nothing is committed; the caller persists `output` and then commits
    /// `next` against `snapshot`.
    fn stage_terminal<T, F>(&self, chat_id: &ChatId, transition: F) -> DispatchResult<Staged<T>>
    where
        F: FnOnce(&mut ConversationState) -> DispatchResult<T>,
    {
        let snapshot = self.states.get(chat_id);
        let mut next = snapshot.clone();
        let output = transition(&mut next)?;
        Ok(Staged {
            snapshot,
            next,
            output,
        })
    }

    async fn advance(
        &self,
        chat_id: &ChatId,
        step: DispatchResult<Step>,
        prompt: OutboundMessage,
    ) -> Vec<DispatchDomainEvent> {
        match step {
            Ok((from, next)) => {
                debug!(?from, to = ?next.stage(), "dialogue advanced");
                self.send(prompt).await;
                vec![DispatchDomainEvent::StageAdvanced(StageAdvanced {
                    chat_id: chat_id.clone(),
                    from,
                    to: next.stage(),
                    advanced_at: next.updated_at(),
                })]
            }
            Err(e) => {
                debug!(error = %e, "ignoring out-of-stage input");
                Vec::new()
            }
        }
    }

    /// Terminal registration step: persist the user, then go idle
    async fn register(
        &self,
        chat_id: &ChatId,
        staged: DispatchResult<Staged<NewUser>>,
    ) -> Vec<DispatchDomainEvent> {
        let Staged {
            snapshot,
            mut next,
            output: new_user,
        } = match staged {
            Ok(staged) => staged,
            Err(e) => {
                debug!(error = %e, "ignoring out-of-stage selection");
                return Vec::new();
            }
        };

        let user = match self.store.create_user(new_user).await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, stage = ?snapshot.stage(), "failed to store user");
                self.send(templates::registration_failed(chat_id.clone())).await;
                return vec![self.failed(chat_id, DispatchError::from(e))];
            }
        };

        next.finish();
        self.commit(next, &snapshot);
        info!(user_id = user.id.0, role = ?user.role, "user registered");

        self.send(templates::registration_success(&user)).await;
        self.send(templates::profile_card(&user)).await;
        vec![DispatchDomainEvent::UserRegistered(UserRegistered {
            user,
            registered_at: Utc::now(),
        })]
    }

    async fn open_order(&self, chat_id: &ChatId) -> Vec<DispatchDomainEvent> {
        if self.stage(chat_id) != DialogueStage::Idle {
            debug!("ignoring create_order outside idle");
            return Vec::new();
        }

        match self.store.get_user_by_chat_id(chat_id).await {
            Ok(Some(user)) if user.role == Role::Customer => {}
            Ok(_) => {
                debug!("ignoring create_order from a non-customer");
                return Vec::new();
            }
            Err(e) => {
                error!(error = %e, "user lookup failed");
                return Vec::new();
            }
        }

        let step = self.step(chat_id, |state| state.open_order());
        self.advance(chat_id, step, templates::order_specialization_prompt(chat_id.clone()))
            .await
    }

    /// Terminal order step: attach the owner, persist, fan out, go idle
    async fn complete_order(&self, chat_id: &ChatId, location: &str) -> Vec<DispatchDomainEvent> {
        let customer = match self.store.get_user_by_chat_id(chat_id).await {
            Ok(Some(customer)) => customer,
            Ok(None) => {
                warn!("order owner is not registered");
                self.send(templates::order_failed(chat_id.clone())).await;
                return vec![self.failed(chat_id, DispatchError::NotRegistered(chat_id.clone()))];
            }
            Err(e) => {
                error!(error = %e, "user lookup failed");
                self.send(templates::order_failed(chat_id.clone())).await;
                return vec![self.failed(chat_id, DispatchError::from(e))];
            }
        };

        let staged = self.stage_terminal(chat_id, |state| {
            state.submit_location(location, customer, Utc::now())
        });
        let Staged {
            snapshot,
            mut next,
            output: draft,
        } = match staged {
            Ok(staged) => staged,
            Err(e) => {
                debug!(error = %e, "ignoring location");
                return Vec::new();
            }
        };

        let placed = match self.dispatch.create_order(draft).await {
            Ok(placed) => placed,
            Err(e) => {
                error!(error = %e, "failed to create order");
                self.send(templates::order_failed(chat_id.clone())).await;
                return vec![self.failed(chat_id, e)];
            }
        };

        next.finish();
        self.commit(next, &snapshot);
        self.send(templates::order_created(&placed.order)).await;
        vec![DispatchDomainEvent::OrderPlaced(placed)]
    }

    async fn respond(&self, chat_id: &ChatId, order_id: OrderId) -> Vec<DispatchDomainEvent> {
        if self.stage(chat_id) != DialogueStage::Idle {
            debug!(%order_id, "ignoring response outside idle");
            return Vec::new();
        }

        match self.dispatch.handle_response(chat_id, order_id).await {
            Ok(recorded) => vec![DispatchDomainEvent::ResponseRecorded(recorded)],
            Err(e @ DispatchError::TransportSendFailure(_)) => {
                error!(%order_id, error = %e, "response stored but provider not acknowledged");
                Vec::new()
            }
            Err(e) => {
                warn!(%order_id, error = %e, "response rejected");
                self.send(templates::response_failed(chat_id.clone())).await;
                vec![self.failed(chat_id, e)]
            }
        }
    }

    fn commit(&self, next: ConversationState, snapshot: &ConversationState) {
        if !self.states.compare_and_swap(next, snapshot.version()) {
            warn!("dialogue changed during a terminal step; keeping the newer state");
        }
    }

    fn failed(&self, chat_id: &ChatId, reason: DispatchError) -> DispatchDomainEvent {
        DispatchDomainEvent::TransitionFailed(TransitionFailed {
            chat_id: chat_id.clone(),
            stage: self.stage(chat_id),
            reason: reason.to_string(),
            failed_at: Utc::now(),
        })
    }

    async fn send(&self, message: OutboundMessage) {
        let recipient = message.chat_id.clone();
        if let Err(e) = self.notifier.send(message).await {
            error!(%recipient, error = %DispatchError::from(e), "failed to deliver message");
        }
    }
}
