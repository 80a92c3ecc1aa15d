#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;

use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;

/// Returned when the text endpoint answers with neither `choices` nor `text`.
/// Mirrors the generation API contract, this is a reply, not an error.
pub const TEXT_FALLBACK: &str = "Sorry, I could not generate a response.";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request to the generation API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("the generation API response is missing the {0} field")]
    MalformedResponse(&'static str),
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_instructions: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChoiceMessageResponse {
    content: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChoiceResponse {
    message: ChoiceMessageResponse,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TextResponse {
    #[serde(default)]
    choices: Vec<ChoiceResponse>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ImageRequest {
    prompt: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    image_url: Option<String>,
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Requests a completion for a single prompt. The full reply is returned
    /// at once, a missing `choices`/`text` pair resolves to [`TEXT_FALLBACK`].
    async fn generate_text(&self, request: TextRequest) -> Result<String, GatewayError>;

    /// Requests an image for a prompt and returns its URL.
    async fn generate_image(&self, prompt: &str) -> Result<String, GatewayError>;
}

pub struct HttpGateway {
    url: String,
}

impl HttpGateway {
    pub fn new(url: &str) -> HttpGateway {
        return HttpGateway {
            url: url.trim_end_matches('/').to_string(),
        };
    }
}

fn convert_decode_err(err: reqwest::Error, field: &'static str) -> GatewayError {
    if err.is_decode() {
        return GatewayError::MalformedResponse(field);
    }
    return GatewayError::Transport(err);
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn generate_text(&self, request: TextRequest) -> Result<String, GatewayError> {
        let res = reqwest::Client::new()
            .post(format!("{url}/api/generate-text", url = self.url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let payload = res
            .json::<TextResponse>()
            .await
            .map_err(|err| return convert_decode_err(err, "choices"))?;
        tracing::debug!(body = ?payload, "text generation response");

        if let Some(choice) = payload.choices.first() {
            return Ok(choice.message.content.to_string());
        }
        if let Some(text) = payload.text {
            if !text.is_empty() {
                return Ok(text);
            }
        }

        return Ok(TEXT_FALLBACK.to_string());
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, GatewayError> {
        let req = ImageRequest {
            prompt: prompt.to_string(),
        };

        let res = reqwest::Client::new()
            .post(format!("{url}/api/generate-image", url = self.url))
            .json(&req)
            .send()
            .await?
            .error_for_status()?;

        let payload = res
            .json::<ImageResponse>()
            .await
            .map_err(|err| return convert_decode_err(err, "image_url"))?;
        tracing::debug!(body = ?payload, "image generation response");

        return payload
            .image_url
            .filter(|url| return !url.is_empty())
            .ok_or(GatewayError::MalformedResponse("image_url"));
    }
}
