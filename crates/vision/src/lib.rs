use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

pub mod parse;

/// Instructions sent as the system message; the parser in [`parse`] depends
/// on the six labelled answer lines this asks for.
pub const ANALYSIS_SYSTEM_PROMPT: &str = "\
You are an expert image analysis AI. Analyze images comprehensively and provide detailed information in a structured format.

For each image, provide:
1. Overall description of the image
2. List of objects/items you can identify (comma-separated)
3. Any text you can read in the image
4. Emotions or mood conveyed (if people are present)
5. Scene type and context
6. Your confidence level in the analysis

Format your response as:
DESCRIPTION: [detailed description]
OBJECTS: [object1, object2, object3, ...]
TEXT: [any text found or \"None detected\"]
EMOTIONS: [emotion1, emotion2, ...]
SCENE: [scene description]
CONFIDENCE: [High/Medium/Low]";

const ANALYSIS_USER_PROMPT: &str =
    "Please analyze this image comprehensively according to the format specified in your system message.";

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

/// Seam to the external vision model. `analyze_image` returns the model's
/// raw reply text; structured parsing is the caller's concern.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    fn is_configured(&self) -> bool {
        true
    }

    async fn analyze_image(&self, filename: &str, image_base64: &str) -> Result<String>;
}

/// Stand-in used when no API key is configured.
pub struct MissingVisionProvider;

#[async_trait]
impl VisionProvider for MissingVisionProvider {
    fn is_configured(&self) -> bool {
        false
    }

    async fn analyze_image(&self, _filename: &str, _image_base64: &str) -> Result<String> {
        Err(anyhow!("vision provider is not configured"))
    }
}

/// OpenAI-compatible chat-completions client carrying the image as a
/// base64 data URL.
pub struct OpenAiVision {
    http: reqwest::Client,
    config: VisionConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: ChatContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ChatContent<'a> {
    Text(&'a str),
    Parts(Vec<ChatPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OpenAiVision {
    pub fn new(config: VisionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

fn data_url(filename: &str, image_base64: &str) -> String {
    let mime = mime_guess::from_path(filename).first_or(mime_guess::mime::IMAGE_PNG);
    format!("data:{mime};base64,{image_base64}")
}

#[async_trait]
impl VisionProvider for OpenAiVision {
    async fn analyze_image(&self, filename: &str, image_base64: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ChatContent::Text(ANALYSIS_SYSTEM_PROMPT),
                },
                ChatMessage {
                    role: "user",
                    content: ChatContent::Parts(vec![
                        ChatPart::Text {
                            text: ANALYSIS_USER_PROMPT,
                        },
                        ChatPart::ImageUrl {
                            image_url: ImageUrl {
                                url: data_url(filename, image_base64),
                            },
                        },
                    ]),
                },
            ],
        };

        let response: ChatResponse = self
            .http
            .post(format!(
                "{}/chat/completions",
                self.config.endpoint.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("vision endpoint returned an unexpected body")?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("vision endpoint returned no choices"))?;

        info!(filename, model = %self.config.model, "vision: analysis reply received");
        Ok(reply)
    }
}
