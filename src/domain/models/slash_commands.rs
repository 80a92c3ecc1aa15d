#[cfg(test)]
#[path = "slash_commands_test.rs"]
mod tests;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlashCommand {
    ClearChat,
    RegenerateTitle,
    GenerateImage(String),
    MissingImagePrompt,
    Unknown(String),
}

impl SlashCommand {
    /// Parses slash-prefixed input. Returns None when the text is not a
    /// command at all. Keywords match case-insensitively, the `/image`
    /// argument keeps its original case.
    pub fn parse(text: &str) -> Option<SlashCommand> {
        let trimmed = text.trim();
        if !trimmed.starts_with('/') {
            return None;
        }

        let lowered = trimmed.to_lowercase();
        if lowered == "/clear" {
            return Some(SlashCommand::ClearChat);
        }
        if lowered == "/title" {
            return Some(SlashCommand::RegenerateTitle);
        }
        if lowered == "/image" || lowered.starts_with("/image ") {
            let prompt = trimmed["/image".len()..].trim();
            if prompt.is_empty() {
                return Some(SlashCommand::MissingImagePrompt);
            }
            return Some(SlashCommand::GenerateImage(prompt.to_string()));
        }

        return Some(SlashCommand::Unknown(trimmed.to_string()));
    }
}
