//! Conversation state store
//!
//! In-memory map from chat identity to [`ConversationState`]. All
//! read-then-write sequences go through [`ConversationStateStore::try_update`]
//! or [`ConversationStateStore::compare_and_swap`], both of which run under
//! the store's write lock. The lock is never held across an `.await`.
//! State is lost on restart.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::aggregate::{ConversationState, Draft};
use crate::error::DispatchResult;
use crate::value_objects::ChatId;

type StateMap = HashMap<ChatId, ConversationState>;

#[derive(Debug, Clone, Default)]
pub struct ConversationStateStore {
    states: Arc<RwLock<StateMap>>,
}

impl ConversationStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // a panic inside a transition cannot leave a half-written entry, so poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, StateMap> {
        self.states.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateMap> {
        self.states.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the state for `chat_id`; unseen identities are idle
    pub fn get(&self, chat_id: &ChatId) -> ConversationState {
        self.read()
            .get(chat_id)
            .cloned()
            .unwrap_or_else(|| ConversationState::new(chat_id.clone()))
    }

    /// Apply a transition atomically.
    ///
    /// The closure runs against a copy; the copy replaces the stored state
    /// only if the closure succeeds.
    pub fn try_update<T, F>(&self, chat_id: &ChatId, transition: F) -> DispatchResult<(T, ConversationState)>
    where
        F: FnOnce(&mut ConversationState) -> DispatchResult<T>,
    {
        let mut states = self.write();
        let mut next = states
            .get(chat_id)
            .cloned()
            .unwrap_or_else(|| ConversationState::new(chat_id.clone()));
        let output = transition(&mut next)?;
        states.insert(chat_id.clone(), next.clone());
        Ok((output, next))
    }

    /// Store `next` only if the stored version still equals `expected_version`.
    ///
    /// Returns `false` when another transition committed in between.
    pub fn compare_and_swap(&self, next: ConversationState, expected_version: u64) -> bool {
        let mut states = self.write();
        let current = states.get(next.chat_id()).map_or(0, ConversationState::version);
        if current != expected_version {
            return false;
        }
        states.insert(next.chat_id().clone(), next);
        true
    }

    /// Forget everything about `chat_id`
    pub fn reset(&self, chat_id: &ChatId) {
        self.write().remove(chat_id);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of identities holding an unfinished draft
    pub fn pending_drafts(&self) -> usize {
        self.read()
            .values()
            .filter(|state| *state.draft() != Draft::Empty)
            .count()
    }
}
