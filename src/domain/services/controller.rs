#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use super::store::SessionStore;
use crate::configuration::Settings;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::Role;
use crate::domain::models::SlashCommand;
use crate::domain::models::DEFAULT_TITLE;
use crate::infrastructure::gateway::Gateway;
use crate::infrastructure::gateway::TextRequest;
use crate::infrastructure::gateway::TEXT_FALLBACK;

pub const SEND_APOLOGY: &str = "Sorry, there was an error processing your request.";
pub const IMAGE_APOLOGY: &str = "Sorry, there was an error generating the image.";

/// Orchestrates sends against the generation API: appends the user message,
/// awaits the reply, appends it to whichever chat was active when the send
/// was issued, and kicks off auto-titling after the first exchange. One
/// instance per process, cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct Controller {
    store: Arc<Mutex<SessionStore>>,
    settings: Arc<Settings>,
    gateway: Arc<dyn Gateway>,
    tx: mpsc::UnboundedSender<Event>,
}

impl Controller {
    pub fn new(
        store: Arc<Mutex<SessionStore>>,
        settings: Arc<Settings>,
        gateway: Arc<dyn Gateway>,
        tx: mpsc::UnboundedSender<Event>,
    ) -> Controller {
        return Controller {
            store,
            settings,
            gateway,
            tx,
        };
    }

    pub async fn send(&self, text: &str) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        if let Some(command) = SlashCommand::parse(trimmed) {
            return self.dispatch(command).await;
        }

        // The chat active right now owns this exchange. A response landing
        // after the user switched chats still goes here, in-flight requests
        // are never cancelled or rerouted.
        let chat_id = {
            let mut store = self.store.lock().await;
            let id = match store.active_id() {
                Some(id) => id.to_string(),
                None => store.create_chat(),
            };
            store.append_message(&id, Role::User, trimmed)?;
            id
        };
        self.tx.send(Event::MessageAppended {
            chat_id: chat_id.to_string(),
            message: Message::new(Role::User, trimmed),
        })?;

        let request = TextRequest {
            prompt: trimmed.to_string(),
            model: self.settings.model.to_string(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system_instructions: self.settings.resolved_system_instructions(),
        };

        self.tx.send(Event::Waiting(true))?;
        let res = self.gateway.generate_text(request).await;
        self.tx.send(Event::Waiting(false))?;

        match res {
            Ok(reply) => {
                let (count, title) = {
                    let mut store = self.store.lock().await;
                    let count = store.append_message(&chat_id, Role::Assistant, &reply)?;
                    let title = store
                        .chat(&chat_id)
                        .map(|chat| return chat.title.to_string());
                    (count, title)
                };
                self.tx.send(Event::MessageAppended {
                    chat_id: chat_id.to_string(),
                    message: Message::new(Role::Assistant, &reply),
                })?;

                if count == 2 && title.as_deref() == Some(DEFAULT_TITLE) {
                    self.spawn_title_generation(&chat_id, trimmed, &reply);
                }
            }
            Err(err) => {
                tracing::error!(error = ?err, "Text generation failed");
                self.store
                    .lock()
                    .await
                    .append_message(&chat_id, Role::Assistant, SEND_APOLOGY)?;
                self.tx.send(Event::MessageAppended {
                    chat_id,
                    message: Message::new(Role::Assistant, SEND_APOLOGY),
                })?;
            }
        }

        return Ok(());
    }

    async fn dispatch(&self, command: SlashCommand) -> Result<()> {
        match command {
            SlashCommand::ClearChat => {
                self.store.lock().await.create_chat();
                self.tx.send(Event::Notice("Started a new chat.".to_string()))?;
            }
            SlashCommand::RegenerateTitle => {
                let first_exchange = {
                    let store = self.store.lock().await;
                    store
                        .active_id()
                        .and_then(|id| return store.chat(id))
                        .filter(|chat| return chat.messages.len() >= 2)
                        .map(|chat| {
                            return (
                                chat.id.to_string(),
                                chat.messages[0].content.to_string(),
                                chat.messages[1].content.to_string(),
                            );
                        })
                };

                match first_exchange {
                    Some((chat_id, user_message, reply)) => {
                        self.spawn_title_generation(&chat_id, &user_message, &reply);
                        self.tx.send(Event::Notice(
                            "Chat title has been regenerated.".to_string(),
                        ))?;
                    }
                    None => {
                        self.tx.send(Event::Notice(
                            "Need at least one exchange to generate a title.".to_string(),
                        ))?;
                    }
                }
            }
            SlashCommand::GenerateImage(prompt) => {
                return self.generate_image(&prompt).await;
            }
            SlashCommand::MissingImagePrompt => {
                self.tx.send(Event::Notice(
                    "Please provide a prompt for the image generation.".to_string(),
                ))?;
            }
            SlashCommand::Unknown(original) => {
                self.tx.send(Event::Notice(format!(
                    "Unknown command: {original}. Available commands: /clear, /title, /image <prompt>"
                )))?;
            }
        }

        return Ok(());
    }

    /// The `/image` user message and the resulting image reference persist as
    /// one atomic pair once the request resolves. Until then the user message
    /// only exists on screen, so a failed request leaves the chat untouched.
    pub async fn generate_image(&self, prompt: &str) -> Result<()> {
        let user_content = format!("/image {prompt}");
        let chat_id = {
            let mut store = self.store.lock().await;
            match store.active_id() {
                Some(id) => id.to_string(),
                None => store.create_chat(),
            }
        };
        self.tx.send(Event::MessageAppended {
            chat_id: chat_id.to_string(),
            message: Message::new(Role::User, &user_content),
        })?;

        self.tx.send(Event::Waiting(true))?;
        let res = self.gateway.generate_image(prompt).await;
        self.tx.send(Event::Waiting(false))?;

        match res {
            Ok(url) => {
                let markdown = format!("![{prompt}]({url})");
                self.store
                    .lock()
                    .await
                    .append_exchange(&chat_id, &user_content, &markdown)?;
                self.tx.send(Event::MessageAppended {
                    chat_id,
                    message: Message::new(Role::Assistant, &markdown),
                })?;
            }
            Err(err) => {
                tracing::error!(error = ?err, "Image generation failed");
                self.tx.send(Event::Notice(IMAGE_APOLOGY.to_string()))?;
            }
        }

        return Ok(());
    }

    /// Fire-and-forget relative to the send flow, the primary response never
    /// waits on a title.
    fn spawn_title_generation(&self, chat_id: &str, user_message: &str, reply: &str) {
        let controller = self.clone();
        let chat_id = chat_id.to_string();
        let user_message = user_message.to_string();
        let reply = reply.to_string();

        tokio::spawn(async move {
            controller
                .generate_title(&chat_id, &user_message, &reply)
                .await;
        });
    }

    /// Asks the model for a 4-6 word title built from the first exchange.
    /// Failures are logged and leave the title alone.
    pub async fn generate_title(&self, chat_id: &str, user_message: &str, reply: &str) {
        let preview = reply.chars().take(100).collect::<String>();
        let request = TextRequest {
            prompt: format!(
                "Generate a short title (4-6 words) for a conversation that starts with this exchange. User: \"{user_message}\" AI: \"{preview}...\""
            ),
            model: self.settings.model.to_string(),
            max_tokens: 20,
            temperature: 0.7,
            system_instructions: "".to_string(),
        };

        match self.gateway.generate_text(request).await {
            Ok(title) => {
                // A contentless response resolves to the fallback sentence,
                // which is not a title. Leave the current one in place.
                if title == TEXT_FALLBACK {
                    tracing::warn!(chat_id = chat_id, "Title generation returned no content");
                    return;
                }
                let renamed = {
                    let mut store = self.store.lock().await;
                    let res = store.rename_chat(chat_id, &title);
                    match res {
                        Ok(()) => store
                            .chat(chat_id)
                            .map(|chat| return chat.title.to_string()),
                        Err(err) => {
                            tracing::warn!(error = ?err, "Failed to rename chat after title generation");
                            None
                        }
                    }
                };
                if let Some(title) = renamed {
                    let _ = self.tx.send(Event::TitleChanged {
                        chat_id: chat_id.to_string(),
                        title,
                    });
                }
            }
            Err(err) => {
                tracing::warn!(error = ?err, "Title generation failed");
            }
        }
    }
}
