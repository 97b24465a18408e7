//! Inbound events and outbound messages exchanged with the transport gateway

use serde::{Deserialize, Serialize};

use super::{ChatId, SelectionTag};

/// Display metadata of the sender of an inbound event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderProfile {
    pub display_name: String,
    pub handle: String,
}

impl SenderProfile {
    pub fn new(display_name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            handle: handle.into(),
        }
    }
}

/// What the user did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Slash command, name without the slash (`start`)
    Command(String),
    /// Free text
    Text(String),
    /// Raw tag of a pressed selection button
    Selection(String),
}

/// One event delivered by the transport gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub chat_id: ChatId,
    pub sender: SenderProfile,
    pub payload: EventPayload,
}

impl InboundEvent {
    pub fn command(chat_id: impl Into<ChatId>, sender: SenderProfile, name: &str) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender,
            payload: EventPayload::Command(name.to_string()),
        }
    }

    pub fn text(chat_id: impl Into<ChatId>, sender: SenderProfile, content: &str) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender,
            payload: EventPayload::Text(content.to_string()),
        }
    }

    pub fn selection(chat_id: impl Into<ChatId>, sender: SenderProfile, tag: &str) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender,
            payload: EventPayload::Selection(tag.to_string()),
        }
    }

    /// Classify a raw chat message: `/name` and `/name@bot` are commands,
    /// anything else is text.
    pub fn from_message(chat_id: impl Into<ChatId>, sender: SenderProfile, raw: &str) -> Self {
        let payload = match raw.strip_prefix('/') {
            Some(rest) if !rest.is_empty() && !rest.starts_with(char::is_whitespace) => {
                let name = rest.split_whitespace().next().unwrap_or(rest);
                let name = name.split('@').next().unwrap_or(name);
                EventPayload::Command(name.to_string())
            }
            _ => EventPayload::Text(raw.to_string()),
        };
        Self {
            chat_id: chat_id.into(),
            sender,
            payload,
        }
    }
}

/// How the transport should interpret the message text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    #[default]
    Plain,
    Markdown,
}

/// What pressing a button does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonAction {
    /// Sends the tag back as a selection event
    Callback(SelectionTag),
    /// Opens a link
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(label: impl Into<String>, tag: SelectionTag) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(tag),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// A message for the transport gateway to deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub parse_mode: ParseMode,
    /// Rows of buttons
    pub keyboard: Vec<Vec<Button>>,
}

impl OutboundMessage {
    pub fn plain(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: ParseMode::Plain,
            keyboard: Vec::new(),
        }
    }

    pub fn markdown(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            parse_mode: ParseMode::Markdown,
            ..Self::plain(chat_id, text)
        }
    }

    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        self.keyboard.push(row);
        self
    }

    /// Selection tags carried by the keyboard, in row order
    pub fn callback_tags(&self) -> Vec<SelectionTag> {
        self.keyboard
            .iter()
            .flatten()
            .filter_map(|button| match button.action {
                ButtonAction::Callback(tag) => Some(tag),
                ButtonAction::Url(_) => None,
            })
            .collect()
    }
}
