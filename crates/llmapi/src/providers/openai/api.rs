use anyhow::{Context, Result, anyhow};
use reqwest::{Client, header};
use tracing::{debug, info};

use crate::types::{ChatStream, LLMClient, LLMMessage, LLMMessageType};
use crate::utils::{chat_completions_url, data_url};

use super::models::{
    ApiErrorEnvelope, ChatCompletionRequest, ChatContentImageUrl, ChatRequestMessage,
    ChatRequestPart,
};
use super::sse::delta_stream;

pub async fn stream_chat(
    client: &LLMClient,
    messages: Vec<LLMMessage>,
    max_tokens: u32,
) -> Result<ChatStream> {
    let url = chat_completions_url(client.endpoint());
    let payload = build_chat_request(client, messages, max_tokens);

    info!(
        model = %payload.model,
        max_tokens,
        messages = payload.messages.len(),
        "opening chat completion stream"
    );

    let http_client = Client::new();
    let response = http_client
        .post(&url)
        .bearer_auth(client.api_key())
        .header(header::ACCEPT, "text/event-stream")
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("Request to {url} failed"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(anyhow!(
            "API returned {status}: {}",
            describe_error_body(&body)
        ));
    }

    debug!(%status, "chat completion stream accepted");
    Ok(Box::pin(delta_stream(response.bytes_stream())))
}

pub fn build_chat_request(
    client: &LLMClient,
    messages: Vec<LLMMessage>,
    max_tokens: u32,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: client.default_model().to_string(),
        messages: messages.into_iter().map(convert_message).collect(),
        max_tokens,
        stream: true,
    }
}

fn convert_message(message: LLMMessage) -> ChatRequestMessage {
    let content = message
        .content
        .into_iter()
        .map(|part| match part {
            LLMMessageType::TEXT(text) => ChatRequestPart::Text { text },
            LLMMessageType::IMAGE {
                data_b64,
                mime_type,
            } => ChatRequestPart::ImageUrl {
                image_url: ChatContentImageUrl {
                    url: data_url(&mime_type, &data_b64),
                },
            },
        })
        .collect();

    ChatRequestMessage {
        role: message.role.as_openai_role(),
        content,
    }
}

fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.describe(),
        Err(_) if body.trim().is_empty() => "<no body>".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
