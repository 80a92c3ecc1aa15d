#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use chrono::Utc;

use crate::domain::models::Chat;
use crate::domain::models::Message;
use crate::domain::models::Role;
use crate::infrastructure::storage::Storage;

pub const CHATS_KEY: &str = "chats";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no chat found for id {0}")]
    NotFound(String),
}

/// Sidebar projection of a chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatListEntry {
    pub id: String,
    pub title: String,
    pub is_active: bool,
}

/// Owns every chat in the session plus the active-chat pointer, and writes
/// the whole collection back to storage after each mutation. The active
/// pointer is transient and never serialized.
pub struct SessionStore {
    chats: Vec<Chat>,
    active_id: Option<String>,
    storage: Box<dyn Storage>,
}

impl SessionStore {
    /// Rebuilds the store from the `chats` record, or starts empty when the
    /// record is absent or unreadable.
    pub fn hydrate(storage: Box<dyn Storage>) -> SessionStore {
        let mut chats: Vec<Chat> = vec![];
        if let Some(payload) = storage.load(CHATS_KEY) {
            match serde_json::from_str::<Vec<Chat>>(&payload) {
                Ok(loaded) => chats = loaded,
                Err(err) => {
                    tracing::warn!(error = ?err, "Stored chats are unreadable, starting empty");
                }
            }
        }

        return SessionStore {
            chats,
            active_id: None,
            storage,
        };
    }

    pub fn create_chat(&mut self) -> String {
        let id = self.create_id();
        self.chats.push(Chat::new(&id));
        self.active_id = Some(id.to_string());
        self.persist();

        return id;
    }

    /// Activates a chat and returns its transcript in append order.
    pub fn switch_to(&mut self, id: &str) -> Result<Vec<Message>, StoreError> {
        let chat = self
            .chats
            .iter()
            .find(|chat| return chat.id == id)
            .ok_or_else(|| return StoreError::NotFound(id.to_string()))?;

        let messages = chat.messages.to_vec();
        self.active_id = Some(id.to_string());

        return Ok(messages);
    }

    /// Appends a message and returns the chat's new message count.
    pub fn append_message(
        &mut self,
        id: &str,
        role: Role,
        content: &str,
    ) -> Result<usize, StoreError> {
        let chat = self.get_chat_mut(id)?;
        chat.messages.push(Message::new(role, content));
        let count = chat.messages.len();
        self.persist();

        return Ok(count);
    }

    /// Appends a user/assistant pair with a single persist, so the pair
    /// becomes durable atomically. Used by the image flow.
    pub fn append_exchange(
        &mut self,
        id: &str,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<usize, StoreError> {
        let chat = self.get_chat_mut(id)?;
        chat.messages.push(Message::new(Role::User, user_content));
        chat.messages
            .push(Message::new(Role::Assistant, assistant_content));
        let count = chat.messages.len();
        self.persist();

        return Ok(count);
    }

    pub fn rename_chat(&mut self, id: &str, new_title: &str) -> Result<(), StoreError> {
        let title = strip_title(new_title);
        let chat = self.get_chat_mut(id)?;
        chat.title = title;
        self.persist();

        return Ok(());
    }

    pub fn list_chats(&self) -> Vec<ChatListEntry> {
        return self
            .chats
            .iter()
            .map(|chat| {
                return ChatListEntry {
                    id: chat.id.to_string(),
                    title: chat.title.to_string(),
                    is_active: self.active_id.as_deref() == Some(chat.id.as_str()),
                };
            })
            .collect();
    }

    pub fn active_id(&self) -> Option<&str> {
        return self.active_id.as_deref();
    }

    pub fn chat(&self, id: &str) -> Option<&Chat> {
        return self.chats.iter().find(|chat| return chat.id == id);
    }

    /// Serializes every chat and writes it through the storage adapter.
    /// A rejected write costs durability, not correctness, so it is logged
    /// and execution continues.
    pub fn persist(&self) {
        let payload = match serde_json::to_string(&self.chats) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to serialize chats");
                return;
            }
        };

        if let Err(err) = self.storage.save(CHATS_KEY, &payload) {
            tracing::warn!(error = ?err, "Failed to persist chats");
        }
    }

    fn get_chat_mut(&mut self, id: &str) -> Result<&mut Chat, StoreError> {
        return self
            .chats
            .iter_mut()
            .find(|chat| return chat.id == id)
            .ok_or_else(|| return StoreError::NotFound(id.to_string()));
    }

    // Time-derived ids collide under rapid creation, a numeric suffix keeps
    // them unique within the session.
    fn create_id(&self) -> String {
        let millis = Utc::now().timestamp_millis();
        let mut id = format!("chat_{millis}");
        let mut suffix = 1;
        while self.chats.iter().any(|chat| return chat.id == id) {
            id = format!("chat_{millis}_{suffix}");
            suffix += 1;
        }

        return id;
    }
}

// The original titles arrive from the model wrapped in double quotes more
// often than not.
fn strip_title(raw: &str) -> String {
    return raw.replace('"', "").trim().to_string();
}
