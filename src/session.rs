//! Per-user session state for the post-creation flow and the free chat.
//!
//! Sessions are explicit objects owned by the stores in this module, created
//! on flow entry and removed on every terminal transition. Each session sits
//! behind its own async mutex which the handlers hold for the whole event,
//! so events for one chat are serialized while different chats proceed
//! concurrently.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use teloxide::types::ChatId;
use tokio::sync::Mutex;

use crate::flow::{step_index, FlowState, NavDirection};

/// A generated variant image materialized on the local filesystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub file_name: String,
    pub file_path: PathBuf,
}

/// One generated marketing caption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub emojis: Vec<String>,
}

/// Conversation state for one chat's `/create_post` flow.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub state: FlowState,
    pub product_image: Option<PathBuf>,
    pub description: Option<String>,
    pub generated_images: Vec<GeneratedImage>,
    pub current_image_index: usize,
    pub selected_image: Option<GeneratedImage>,
    pub captions: Vec<Caption>,
}

impl Session {
    /// The image the navigation controls currently point at.
    pub fn current_image(&self) -> Option<&GeneratedImage> {
        self.generated_images.get(self.current_image_index)
    }

    /// Move the navigation index with wrap-around. Returns the new index.
    pub fn step_image(&mut self, direction: NavDirection) -> usize {
        self.current_image_index = step_index(
            self.current_image_index,
            self.generated_images.len(),
            direction,
        );
        self.current_image_index
    }

    /// Replace the generated image list and reset navigation to the first
    /// image, as regeneration and initial generation both do.
    pub fn replace_generated_images(&mut self, images: Vec<GeneratedImage>) {
        self.generated_images = images;
        self.current_image_index = 0;
    }

    /// Copy the image under the cursor into `selected_image`.
    pub fn select_current_image(&mut self) -> Option<GeneratedImage> {
        let selected = self.current_image().cloned()?;
        self.selected_image = Some(selected.clone());
        Some(selected)
    }

    /// The image the final post ships with: the explicit selection, falling
    /// back to the original upload.
    pub fn post_image(&self) -> Option<&PathBuf> {
        self.selected_image
            .as_ref()
            .map(|image| &image.file_path)
            .or(self.product_image.as_ref())
    }
}

/// Store of active flow sessions, keyed by chat.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<ChatId, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh flow for this chat, discarding any session already in
    /// progress (`/create_post` allows re-entry).
    pub async fn reset(&self, chat_id: ChatId) -> Arc<Mutex<Session>> {
        let session = Arc::new(Mutex::new(Session::default()));
        self.inner.lock().await.insert(chat_id, Arc::clone(&session));
        session
    }

    /// The active session for this chat, if a flow is in progress.
    pub async fn get(&self, chat_id: ChatId) -> Option<Arc<Mutex<Session>>> {
        self.inner.lock().await.get(&chat_id).cloned()
    }

    /// Terminal transition: drop the session. Later events for this chat see
    /// no active flow and are ignored.
    pub async fn clear(&self, chat_id: ChatId) {
        self.inner.lock().await.remove(&chat_id);
    }
}

/// One turn of the free-form assistant chat.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            text: text.into(),
        }
    }
}

/// Per-chat history for the free-form assistant chat. Independent of the
/// flow session lifecycle; reset by `/start` and `/clear`.
#[derive(Default)]
pub struct ChatHistoryStore {
    inner: Mutex<HashMap<ChatId, Vec<ChatTurn>>>,
}

impl ChatHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any stored history and seed a fresh one with the system prompt.
    pub async fn reset(&self, chat_id: ChatId, system_prompt: &str) -> Vec<ChatTurn> {
        let history = vec![ChatTurn::user(system_prompt)];
        self.inner.lock().await.insert(chat_id, history.clone());
        history
    }

    /// Append a user turn, seeding the history first if this chat has none,
    /// and return a snapshot for the generation call.
    pub async fn push_user_turn(
        &self,
        chat_id: ChatId,
        system_prompt: &str,
        text: &str,
    ) -> Vec<ChatTurn> {
        let mut store = self.inner.lock().await;
        let history = store
            .entry(chat_id)
            .or_insert_with(|| vec![ChatTurn::user(system_prompt)]);
        history.push(ChatTurn::user(text));
        history.clone()
    }

    /// Record the model's reply.
    pub async fn push_model_turn(&self, chat_id: ChatId, text: &str) {
        if let Some(history) = self.inner.lock().await.get_mut(&chat_id) {
            history.push(ChatTurn::model(text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> GeneratedImage {
        GeneratedImage {
            file_name: name.to_string(),
            file_path: PathBuf::from(format!("media/generated/{name}")),
        }
    }

    #[test]
    fn test_select_copies_image_under_cursor() {
        let mut session = Session {
            generated_images: vec![image("a.png"), image("b.png"), image("c.png")],
            current_image_index: 1,
            ..Session::default()
        };

        let selected = session.select_current_image().unwrap();
        assert_eq!(selected, image("b.png"));
        assert_eq!(session.selected_image, Some(image("b.png")));
    }

    #[test]
    fn test_select_on_empty_list() {
        let mut session = Session::default();
        assert!(session.select_current_image().is_none());
        assert!(session.selected_image.is_none());
    }

    #[test]
    fn test_replace_resets_index() {
        let mut session = Session {
            generated_images: vec![image("a.png"), image("b.png"), image("c.png")],
            current_image_index: 2,
            ..Session::default()
        };

        session.replace_generated_images(vec![image("d.png"), image("e.png")]);
        assert_eq!(session.current_image_index, 0);
        assert_eq!(session.current_image(), Some(&image("d.png")));
    }

    #[test]
    fn test_post_image_prefers_selection() {
        let mut session = Session {
            product_image: Some(PathBuf::from("media/received/upload.jpg")),
            ..Session::default()
        };
        assert_eq!(
            session.post_image(),
            Some(&PathBuf::from("media/received/upload.jpg"))
        );

        session.selected_image = Some(image("pick.png"));
        assert_eq!(
            session.post_image(),
            Some(&PathBuf::from("media/generated/pick.png"))
        );
    }
}
