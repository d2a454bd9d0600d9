use crate::photo::EncodedImage;
use anyhow::{Context, Result};
use aws_sdk_bedrockruntime::primitives::Blob;
use serde::{Deserialize, Serialize};

pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// A single-turn multimodal prompt: optional image followed by text.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub image: Option<EncodedImage>,
    pub text: String,
    pub max_tokens: u32,
}

impl Prompt {
    pub fn text(text: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            image: None,
            text: text.into(),
            max_tokens,
        }
    }

    pub fn with_image(image: EncodedImage, text: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            image: Some(image),
            text: text.into(),
            max_tokens,
        }
    }

    pub(crate) fn to_request(&self) -> MessagesRequest<'_> {
        let mut content = Vec::with_capacity(2);
        if let Some(image) = &self.image {
            content.push(ContentBlock::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: image.media_type,
                    data: &image.data,
                },
            });
        }
        content.push(ContentBlock::Text { text: &self.text });

        MessagesRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Pulls the text of the first content block out of a raw response body.
pub(crate) fn response_text(body: &[u8]) -> Result<String> {
    let response: MessagesResponse =
        serde_json::from_slice(body).context("failed to decode model response JSON")?;
    if let Some(usage) = &response.usage {
        tracing::debug!(%usage, "model usage");
    }
    response
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or_else(|| anyhow::anyhow!("Failed to extract text from model response"))
}

#[async_trait::async_trait]
pub trait VisionModel: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct BedrockModel {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
}

impl BedrockModel {
    pub fn new(client: aws_sdk_bedrockruntime::Client, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl VisionModel for BedrockModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let body = serde_json::to_vec(&prompt.to_request())?;

        let response = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .with_context(|| format!("Bedrock invoke_model failed (model={})", self.model_id))?;

        response_text(response.body().as_ref())
    }
}
