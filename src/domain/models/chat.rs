use chrono::Local;
use chrono::SecondsFormat;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Message;

/// Title every chat starts with. Auto-titling only ever replaces this value.
pub const DEFAULT_TITLE: &str = "New Chat";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub messages: Vec<Message>,
}

impl Chat {
    pub fn new(id: &str) -> Chat {
        return Chat {
            id: id.to_string(),
            title: DEFAULT_TITLE.to_string(),
            created_at: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            messages: vec![],
        };
    }
}
