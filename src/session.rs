//! One user-triggered analysis: check the form, encode the image, stream the
//! model's answer onto a render surface, and turn any failure into a single
//! user-visible message.
//!
//! A session owns nothing between runs. Each call receives an immutable
//! [`AnalysisRequest`] snapshot taken when the trigger fired.

use async_trait::async_trait;
use futures::StreamExt;
use llmapi::{ChatStream, LLMClient, LLMMessage, LLMMessageType};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::constants::ANALYSIS_MAX_TOKENS;
use crate::error::AnalysisError;
use crate::image::ImageInput;
use crate::provider::ProviderConfig;
use crate::render::{RenderSurface, StreamingRenderer, StreamingResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Encoding,
    Requesting,
    Streaming,
    Done,
    Failed(String),
}

impl SessionState {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::Encoding | SessionState::Requesting | SessionState::Streaming
        )
    }
}

/// Opens a streamed chat completion. The production transport talks HTTP
/// through `llmapi`; tests script the stream.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open_stream(
        &self,
        client: &LLMClient,
        messages: Vec<LLMMessage>,
        max_tokens: u32,
    ) -> anyhow::Result<ChatStream>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LlmApiTransport;

#[async_trait]
impl ChatTransport for LlmApiTransport {
    async fn open_stream(
        &self,
        client: &LLMClient,
        messages: Vec<LLMMessage>,
        max_tokens: u32,
    ) -> anyhow::Result<ChatStream> {
        llmapi::stream_llm_chat(client, messages, max_tokens).await
    }
}

/// Form contents at the moment the trigger fired.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: Option<ImageInput>,
    pub config: ProviderConfig,
    pub prompt: String,
    pub triggered: bool,
}

#[derive(Debug)]
pub enum SessionOutcome {
    /// Trigger not pressed; `warnings` still lists what the form lacks.
    Idle { warnings: Vec<AnalysisError> },
    /// Trigger pressed but a precondition failed; nothing was sent.
    Rejected { warnings: Vec<AnalysisError> },
    Completed(StreamingResult),
    Failed {
        error: AnalysisError,
        partial: StreamingResult,
    },
}

impl SessionOutcome {
    /// What the form shows before the trigger is pressed.
    pub fn pending(request: &AnalysisRequest) -> Self {
        SessionOutcome::Idle {
            warnings: check_preconditions(request),
        }
    }

    pub fn warnings(&self) -> &[AnalysisError] {
        match self {
            SessionOutcome::Idle { warnings } | SessionOutcome::Rejected { warnings } => warnings,
            _ => &[],
        }
    }
}

/// Both checks run independently so the user sees every missing field at
/// once. The credential warning shows even before the trigger is pressed.
pub fn check_preconditions(request: &AnalysisRequest) -> Vec<AnalysisError> {
    let mut warnings = Vec::new();

    if request.image.is_none() && request.triggered {
        warnings.push(AnalysisError::MissingImage);
    }
    if !request.config.has_credential() {
        warnings.push(AnalysisError::MissingCredential {
            provider: request.config.provider().label().to_string(),
        });
    }

    warnings
}

/// The single user message: prompt text first, then the image as a data URI.
pub fn compose_messages(image: &ImageInput, prompt: &str) -> Vec<LLMMessage> {
    vec![LLMMessage::user(vec![
        LLMMessageType::text(prompt),
        LLMMessageType::image_bytes(image.bytes(), image.mime_type()),
    ])]
}

pub struct AnalysisSession<T> {
    transport: T,
}

impl Default for AnalysisSession<LlmApiTransport> {
    fn default() -> Self {
        Self::new(LlmApiTransport)
    }
}

impl<T: ChatTransport> AnalysisSession<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn run_analysis<S>(
        &self,
        request: AnalysisRequest,
        surface: &mut S,
    ) -> SessionOutcome
    where
        S: RenderSurface + Send + ?Sized,
    {
        if !request.triggered {
            return SessionOutcome::pending(&request);
        }

        let warnings = check_preconditions(&request);
        let image = match request.image {
            Some(image) if warnings.is_empty() => image,
            _ => {
                info!(count = warnings.len(), "analysis refused by preconditions");
                return SessionOutcome::Rejected { warnings };
            }
        };

        transition(surface, SessionState::Encoding);
        let messages = compose_messages(&image, &request.prompt);
        let client = request.config.client();

        info!(
            file = image.file_name(),
            bytes = image.len(),
            mime = image.mime_type(),
            model = client.default_model(),
            "starting image analysis"
        );

        transition(surface, SessionState::Requesting);
        let mut stream = match self
            .transport
            .open_stream(&client, messages, ANALYSIS_MAX_TOKENS)
            .await
        {
            Ok(stream) => stream,
            Err(err) => return fail(surface, err, StreamingResult::default()),
        };

        transition(surface, SessionState::Streaming);
        let mut renderer = StreamingRenderer::new(&mut *surface);
        let mut chunks = 0usize;
        while let Some(delta) = stream.next().await {
            match delta {
                Ok(text) => {
                    chunks += 1;
                    renderer.push(&text);
                }
                Err(err) => {
                    let partial = renderer.abandon();
                    return fail(surface, err, partial);
                }
            }
        }
        let result = renderer.finish();

        info!(
            chunks,
            chars = result.accumulated_text.chars().count(),
            "image analysis complete"
        );
        transition(surface, SessionState::Done);
        SessionOutcome::Completed(result)
    }
}

fn transition<S: RenderSurface + ?Sized>(surface: &mut S, state: SessionState) {
    debug!(?state, "analysis session transition");
    surface.state_changed(&state);
}

fn fail<S: RenderSurface + ?Sized>(
    surface: &mut S,
    err: anyhow::Error,
    partial: StreamingResult,
) -> SessionOutcome {
    let error = AnalysisError::RemoteRequest(err);
    error!(error = %error, rendered = partial.accumulated_text.len(), "image analysis failed");
    transition(surface, SessionState::Failed(error.to_string()));
    SessionOutcome::Failed { error, partial }
}
