//! Conversation aggregate - one user's position in the dialogue
//!
//! A `ConversationState` tracks:
//! - The current dialogue stage
//! - The draft being assembled (a user registration or an order)
//! - A version used for optimistic compare-and-swap commits
//!
//! Every transition checks the current stage first and fails with
//! [`DispatchError::InvalidStateTransition`] without touching the draft when
//! the input arrives out of order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, DispatchResult};
use crate::value_objects::{ChatId, NewOrder, NewUser, Role, SenderProfile, Specialization, User};

/// Position within the dialogue state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DialogueStage {
    #[default]
    Idle,
    ChoosingRole,
    EnteringPortfolio,
    ChoosingSpecialization,
    ChoosingOrderSpecialization,
    EnteringOrderTitle,
    EnteringOrderDescription,
    EnteringOrderLocation,
}

/// Registration collected across turns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDraft {
    pub name: String,
    pub handle: String,
    pub role: Option<Role>,
    pub portfolio: Option<String>,
    pub specialization: Option<Specialization>,
}

/// Order collected across turns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub specialization: Option<Specialization>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// The partially built entity, if any
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Draft {
    #[default]
    Empty,
    User(UserDraft),
    Order(OrderDraft),
}

/// Dialogue state of a single chat identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    chat_id: ChatId,
    stage: DialogueStage,
    draft: Draft,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// Fresh idle state for an unseen chat identity
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            stage: DialogueStage::Idle,
            draft: Draft::Empty,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    pub fn stage(&self) -> DialogueStage {
        self.stage
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Idle with nothing collected
    pub fn is_pristine(&self) -> bool {
        self.stage == DialogueStage::Idle && self.draft == Draft::Empty
    }

    fn require_stage(&self, stage: DialogueStage, action: &'static str) -> DispatchResult<()> {
        if self.stage != stage {
            return Err(DispatchError::InvalidStateTransition {
                from: self.stage,
                action,
            });
        }
        Ok(())
    }

    fn advance(&mut self, stage: DialogueStage) {
        self.stage = stage;
        self.version += 1;
        self.updated_at = Utc::now();
    }

    fn user_draft(&mut self, action: &'static str) -> DispatchResult<&mut UserDraft> {
        match &mut self.draft {
            Draft::User(draft) => Ok(draft),
            _ => Err(DispatchError::InvalidStateTransition {
                from: self.stage,
                action,
            }),
        }
    }

    fn order_draft(&mut self, action: &'static str) -> DispatchResult<&mut OrderDraft> {
        match &mut self.draft {
            Draft::Order(draft) => Ok(draft),
            _ => Err(DispatchError::InvalidStateTransition {
                from: self.stage,
                action,
            }),
        }
    }

    /// Start (or restart) registration; allowed from any stage
    pub fn begin_registration(&mut self, sender: &SenderProfile) {
        self.draft = Draft::User(UserDraft {
            name: sender.display_name.clone(),
            handle: sender.handle.clone(),
            ..UserDraft::default()
        });
        self.advance(DialogueStage::ChoosingRole);
    }

    /// Pick the customer role and produce the record to persist.
    ///
    /// The stage is left alone; call [`finish`](Self::finish) once the record is stored.
    pub fn register_customer(&mut self, sender: &SenderProfile) -> DispatchResult<NewUser> {
        const ACTION: &str = "register as customer";
        self.require_stage(DialogueStage::ChoosingRole, ACTION)?;
        let chat_id = self.chat_id.clone();
        let draft = self.user_draft(ACTION)?;
        draft.role = Some(Role::Customer);
        draft.name = sender.display_name.clone();
        draft.handle = sender.handle.clone();

        Ok(NewUser {
            chat_id,
            name: draft.name.clone(),
            handle: draft.handle.clone(),
            role: Role::Customer,
            portfolio: None,
            specialization: None,
        })
    }

    /// Pick the provider role; portfolio and specialization follow
    pub fn choose_provider(&mut self) -> DispatchResult<()> {
        const ACTION: &str = "register as provider";
        self.require_stage(DialogueStage::ChoosingRole, ACTION)?;
        self.user_draft(ACTION)?.role = Some(Role::Provider);
        self.advance(DialogueStage::EnteringPortfolio);
        Ok(())
    }

    /// Store the portfolio link and ask for a specialization
    pub fn submit_portfolio(&mut self, link: &str) -> DispatchResult<()> {
        const ACTION: &str = "submit a portfolio";
        self.require_stage(DialogueStage::EnteringPortfolio, ACTION)?;
        self.user_draft(ACTION)?.portfolio = Some(link.to_string());
        self.advance(DialogueStage::ChoosingSpecialization);
        Ok(())
    }

    /// Pick the provider specialization and produce the record to persist
    pub fn register_provider(
        &mut self,
        specialization: Specialization,
        sender: &SenderProfile,
    ) -> DispatchResult<NewUser> {
        const ACTION: &str = "choose a specialization";
        self.require_stage(DialogueStage::ChoosingSpecialization, ACTION)?;
        let chat_id = self.chat_id.clone();
        let stage = self.stage;
        let draft = self.user_draft(ACTION)?;
        let portfolio = draft
            .portfolio
            .clone()
            .ok_or(DispatchError::InvalidStateTransition { from: stage, action: ACTION })?;
        draft.specialization = Some(specialization);
        draft.name = sender.display_name.clone();
        draft.handle = sender.handle.clone();

        Ok(NewUser {
            chat_id,
            name: draft.name.clone(),
            handle: draft.handle.clone(),
            role: Role::Provider,
            portfolio: Some(portfolio),
            specialization: Some(specialization),
        })
    }

    /// Start an order draft; customers only reach this from idle
    pub fn open_order(&mut self) -> DispatchResult<()> {
        self.require_stage(DialogueStage::Idle, "open an order")?;
        self.draft = Draft::Order(OrderDraft::default());
        self.advance(DialogueStage::ChoosingOrderSpecialization);
        Ok(())
    }

    /// Set the specialization the order needs
    pub fn choose_order_specialization(
        &mut self,
        specialization: Specialization,
    ) -> DispatchResult<()> {
        const ACTION: &str = "choose the order specialization";
        self.require_stage(DialogueStage::ChoosingOrderSpecialization, ACTION)?;
        self.order_draft(ACTION)?.specialization = Some(specialization);
        self.advance(DialogueStage::EnteringOrderTitle);
        Ok(())
    }

    /// Store the order title
    pub fn submit_title(&mut self, title: &str) -> DispatchResult<()> {
        const ACTION: &str = "submit the order title";
        self.require_stage(DialogueStage::EnteringOrderTitle, ACTION)?;
        self.order_draft(ACTION)?.title = Some(title.to_string());
        self.advance(DialogueStage::EnteringOrderDescription);
        Ok(())
    }

    /// Store the order description
    pub fn submit_description(&mut self, description: &str) -> DispatchResult<()> {
        const ACTION: &str = "submit the order description";
        self.require_stage(DialogueStage::EnteringOrderDescription, ACTION)?;
        self.order_draft(ACTION)?.description = Some(description.to_string());
        self.advance(DialogueStage::EnteringOrderLocation);
        Ok(())
    }

    /// Fill in the location and produce the order to persist.
    ///
    /// Like the registration steps, the stage only moves on [`finish`](Self::finish).
    pub fn submit_location(
        &mut self,
        location: &str,
        customer: User,
        created_at: DateTime<Utc>,
    ) -> DispatchResult<NewOrder> {
        const ACTION: &str = "submit the order location";
        self.require_stage(DialogueStage::EnteringOrderLocation, ACTION)?;
        let stage = self.stage;
        let draft = self.order_draft(ACTION)?;
        draft.location = Some(location.to_string());

        let incomplete = DispatchError::InvalidStateTransition { from: stage, action: ACTION };
        match (&draft.specialization, &draft.title, &draft.description) {
            (Some(specialization), Some(title), Some(description)) => Ok(NewOrder {
                title: title.clone(),
                description: description.clone(),
                location: location.to_string(),
                specialization: *specialization,
                created_at,
                customer,
            }),
            _ => Err(incomplete),
        }
    }

    /// Dialogue completed: back to idle, draft dropped
    pub fn finish(&mut self) {
        self.draft = Draft::Empty;
        self.advance(DialogueStage::Idle);
    }
}
