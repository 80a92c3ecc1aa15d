use super::Message;

/// Events pushed from the store and controller back to the UI loop. The UI
/// decides how to render each one, nothing here touches the terminal.
pub enum Event {
    /// A message landed in a chat. Carries the chat id so the UI can skip
    /// rendering messages that resolved against a chat no longer in view.
    MessageAppended { chat_id: String, message: Message },
    /// UI-only feedback, never persisted to any chat.
    Notice(String),
    /// Busy indicator toggle while a generation request is in flight.
    Waiting(bool),
    TitleChanged { chat_id: String, title: String },
}
