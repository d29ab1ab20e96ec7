//! Text recognition for photographed index pages.
//!
//! [`Recognizer`] is the seam the batch runs against; [`VisionClient`] talks to an
//! OpenAI-compatible chat completions endpoint with the image inlined as a data URL.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("recognition API rejected the credential")]
    Authentication,
    #[error("image not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("not a recognizable image: {}", .0.display())]
    Unidentified(PathBuf),
    #[error("could not read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("recognition API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("recognition API returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Return the text found in `image`, following `instruction`.
    async fn recognize(&self, image: &Path, instruction: &str) -> Result<String, RecognitionError>;
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Built once per run and shared by reference.
pub struct VisionClient {
    config: VisionConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> Result<Self, RecognitionError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl Recognizer for VisionClient {
    async fn recognize(&self, image: &Path, instruction: &str) -> Result<String, RecognitionError> {
        let data_url = encode_image(image).await?;
        let request = build_request(&self.config.model, self.config.max_tokens, instruction, data_url);

        debug!(stage = "acquire", source = %image.display(), model = %self.config.model, "sending image");
        let resp = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RecognitionError::Authentication);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RecognitionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ChatResponse = resp.json().await?;
        first_choice_text(reply)
    }
}

/// Read an image and wrap it as a base64 `data:` URL.
pub async fn encode_image(path: &Path) -> Result<String, RecognitionError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(RecognitionError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    let mime = match infer::get(&bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => kind.mime_type(),
        _ => return Err(RecognitionError::Unidentified(path.to_path_buf())),
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:{};base64,{}", mime, encoded))
}

fn build_request<'a>(
    model: &'a str,
    max_tokens: u32,
    instruction: &'a str,
    data_url: String,
) -> ChatRequest<'a> {
    ChatRequest {
        model,
        max_tokens,
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(instruction),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![ContentPart::ImageUrl {
                    image_url: ImageUrl { url: data_url },
                }]),
            },
        ],
    }
}

fn first_choice_text(reply: ChatResponse) -> Result<String, RecognitionError> {
    reply
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(RecognitionError::EmptyResponse)
}

// ── Tests ──
