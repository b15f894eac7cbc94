use std::fmt;

use llmapi::{LLMClient, LLMProvider};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_OPENAI_ENDPOINT, DEFAULT_VISION_MODEL};
use crate::error::{AnalysisError, Result};

/// The providers the selector offers. Each variant carries everything a
/// request needs, so an incomplete one cannot be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    /// Self-hosted server speaking the OpenAI chat-completions API.
    Compatible { endpoint: String, model: String },
}

impl Provider {
    pub fn compatible(endpoint: &str, model: &str) -> Result<Self> {
        let endpoint = endpoint.trim();
        let model = model.trim();

        if endpoint.is_empty() {
            return Err(AnalysisError::InvalidProvider {
                reason: "an OpenAI-compatible provider needs an endpoint URL".into(),
            });
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(AnalysisError::InvalidProvider {
                reason: format!("endpoint '{endpoint}' is not an http(s) URL"),
            });
        }
        if model.is_empty() {
            return Err(AnalysisError::InvalidProvider {
                reason: "an OpenAI-compatible provider needs a model name".into(),
            });
        }

        Ok(Provider::Compatible {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Compatible { .. } => "OpenAI-compatible",
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Provider::OpenAi => DEFAULT_OPENAI_ENDPOINT,
            Provider::Compatible { endpoint, .. } => endpoint,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAi => DEFAULT_VISION_MODEL,
            Provider::Compatible { model, .. } => model,
        }
    }

    fn llm_provider(&self) -> LLMProvider {
        match self {
            Provider::OpenAi => LLMProvider::OpenAI,
            Provider::Compatible { .. } => LLMProvider::OpenAICompatible,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    provider: Provider,
    api_key: String,
    endpoint_base: Option<String>,
}

impl ProviderConfig {
    /// An empty key is accepted here; the session refuses to run with it.
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into().trim().to_string(),
            endpoint_base: None,
        }
    }

    pub fn with_endpoint_base(mut self, endpoint_base: &str) -> Result<Self> {
        let endpoint_base = endpoint_base.trim();
        if endpoint_base.is_empty() {
            return Err(AnalysisError::InvalidProvider {
                reason: "endpoint override is empty".into(),
            });
        }
        self.endpoint_base = Some(endpoint_base.to_string());
        Ok(self)
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint_base
            .as_deref()
            .unwrap_or_else(|| self.provider.endpoint())
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn client(&self) -> LLMClient {
        LLMClient::new(
            self.provider.llm_provider(),
            self.api_key.clone(),
            self.endpoint(),
            self.model(),
        )
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = if self.api_key.is_empty() { "<empty>" } else { "<redacted>" };
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &masked)
            .field("endpoint_base", &self.endpoint_base)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderKind {
    OpenAi,
    Compatible,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOption {
    pub kind: ProviderKind,
    pub label: &'static str,
    pub default_endpoint: Option<&'static str>,
    pub default_model: Option<&'static str>,
    pub requires_endpoint: bool,
}

pub fn available_providers() -> Vec<ProviderOption> {
    vec![
        ProviderOption {
            kind: ProviderKind::OpenAi,
            label: Provider::OpenAi.label(),
            default_endpoint: Some(DEFAULT_OPENAI_ENDPOINT),
            default_model: Some(DEFAULT_VISION_MODEL),
            requires_endpoint: false,
        },
        ProviderOption {
            kind: ProviderKind::Compatible,
            label: "OpenAI-compatible",
            default_endpoint: None,
            default_model: None,
            requires_endpoint: true,
        },
    ]
}
