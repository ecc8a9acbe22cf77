//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `message_handler`: Handles incoming text and photo messages
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `ui_builder`: Creates keyboards and formats messages

pub mod callback_handler;
pub mod message_handler;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

use crate::gemini::GeminiClient;
use crate::session::{ChatHistoryStore, SessionStore};
use crate::storage::MediaStore;

/// Shared state handed to every handler by the dispatcher.
pub struct AppDeps {
    pub sessions: SessionStore,
    pub histories: ChatHistoryStore,
    pub gemini: GeminiClient,
    pub media: MediaStore,
    /// Bot username for mention gating in group chats, without the `@`.
    pub bot_username: Option<String>,
}
