mod openai;

use anyhow::Result;

use crate::types::{ChatStream, LLMClient, LLMMessage, LLMProvider};

pub use openai::{
    ChatCompletionRequest, build_chat_request, delta_stream, stream_chat as openai_stream_chat,
};

/// Opens a streamed completion on whichever provider the client is bound to.
pub async fn stream_llm_chat(
    client: &LLMClient,
    messages: Vec<LLMMessage>,
    max_tokens: u32,
) -> Result<ChatStream> {
    match client.provider() {
        LLMProvider::OpenAI | LLMProvider::OpenAICompatible => {
            openai_stream_chat(client, messages, max_tokens).await
        }
    }
}
