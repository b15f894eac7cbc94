use anyhow::Result;
use futures::Stream;
use std::fmt;
use std::pin::Pin;

use crate::utils;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LLMProvider {
    OpenAI,
    /// Any server speaking the OpenAI chat-completions dialect (Ollama, vLLM, ...).
    OpenAICompatible,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LLMMessageType {
    TEXT(String),
    IMAGE { data_b64: String, mime_type: String },
}

impl LLMMessageType {
    pub fn text(text: impl Into<String>) -> Self {
        LLMMessageType::TEXT(text.into())
    }

    pub fn image_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        LLMMessageType::IMAGE {
            data_b64: utils::encode_byte_to_base64(bytes),
            mime_type: mime_type.into(),
        }
    }

    /// `data:<mime>;base64,<payload>` for image parts, `None` for text.
    pub fn data_url(&self) -> Option<String> {
        match self {
            LLMMessageType::TEXT(_) => None,
            LLMMessageType::IMAGE {
                data_b64,
                mime_type,
            } => Some(utils::data_url(mime_type, data_b64)),
        }
    }
}

/// Only user turns are sent: each analysis is a single-message conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LLMUserType {
    Human,
}

impl LLMUserType {
    pub fn as_openai_role(self) -> &'static str {
        match self {
            LLMUserType::Human => "user",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LLMMessage {
    pub role: LLMUserType,
    pub content: Vec<LLMMessageType>,
}

impl LLMMessage {
    pub fn user(content: Vec<LLMMessageType>) -> Self {
        Self {
            role: LLMUserType::Human,
            content,
        }
    }
}

#[derive(Clone)]
pub struct LLMClient {
    pub(crate) provider: LLMProvider,
    pub(crate) api_key: String,
    pub(crate) endpoint: String,
    pub(crate) default_model: String,
}

impl LLMClient {
    pub fn new(
        provider: LLMProvider,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            default_model: default_model.into(),
        }
    }

    pub fn provider(&self) -> LLMProvider {
        self.provider
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }
}

impl fmt::Debug for LLMClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LLMClient")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Incremental text deltas of one streamed completion, in arrival order.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;
