#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;

use anyhow::Result;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::domain::models::prompts;
use crate::infrastructure::storage::Storage;

pub const SETTINGS_KEY: &str = "settings";

/// Generation settings. One instance process-wide, hydrated from storage or
/// defaults at startup and written back whenever the user changes them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_instructions: String,
}

impl Default for Settings {
    fn default() -> Settings {
        return Settings {
            model: "openai".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            system_instructions: "".to_string(),
        };
    }
}

impl Settings {
    pub fn load(storage: &dyn Storage) -> Settings {
        if let Some(payload) = storage.load(SETTINGS_KEY) {
            match serde_json::from_str::<Settings>(&payload) {
                Ok(settings) => return settings,
                Err(err) => {
                    tracing::warn!(error = ?err, "Stored settings are unreadable, falling back to defaults");
                }
            }
        }

        return Settings::default();
    }

    pub fn save(&self, storage: &dyn Storage) -> Result<()> {
        let payload = serde_json::to_string(self)?;
        storage.save(SETTINGS_KEY, &payload)?;

        return Ok(());
    }

    /// User-configured instructions win, then the model's default prompt,
    /// then nothing.
    pub fn resolved_system_instructions(&self) -> String {
        if !self.system_instructions.trim().is_empty() {
            return self.system_instructions.to_string();
        }
        if let Some(prompt) = prompts::default_system_prompt(&self.model) {
            return prompt.to_string();
        }

        return "".to_string();
    }
}
