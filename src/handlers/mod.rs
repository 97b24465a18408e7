//! Event handlers for dialogues and order dispatch

pub mod dialogue;
pub mod dispatch;
pub mod templates;

pub use dialogue::DialogueEngine;
pub use dispatch::DispatchEngine;
