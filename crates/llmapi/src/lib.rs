pub mod providers;
pub mod types;
pub mod utils;

pub use providers::stream_llm_chat;
pub use types::{ChatStream, LLMClient, LLMMessage, LLMMessageType, LLMProvider, LLMUserType};
