mod api;
mod models;
mod sse;

pub use api::{build_chat_request, stream_chat};
pub use models::ChatCompletionRequest;
pub use sse::delta_stream;
