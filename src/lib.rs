#[cfg(feature = "desktop")]
mod commands;
pub mod constants;
pub mod error;
pub mod gate;
pub mod image;
pub mod models;
pub mod prompt;
pub mod provider;
pub mod render;
pub mod session;

pub use constants::{
    ANALYSIS_MAX_TOKENS, DEFAULT_OPENAI_ENDPOINT, DEFAULT_VISION_MODEL, STREAM_CURSOR,
};
pub use error::AnalysisError;
pub use gate::AnalysisGate;
pub use image::{
    lock_acquirer, ImageAcquirer, ImageFormat, ImageInput, ImagePreview, ImageSource,
    SharedAcquirer,
};
pub use models::{
    AnalysisResponse, AnalyzeImageRequest, FormConfig, ImagePayload, ProviderPayload,
    StatePayload,
};
pub use prompt::{build_prompt, PromptRequest, INSTRUCTION_TEXT};
pub use provider::{available_providers, Provider, ProviderConfig, ProviderOption};
pub use render::{MemorySurface, RenderSurface, StreamingRenderer, StreamingResult};
pub use session::{
    check_preconditions, compose_messages, AnalysisRequest, AnalysisSession, ChatTransport,
    LlmApiTransport, SessionOutcome, SessionState,
};

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_tracing();

    tauri::Builder::default()
        .manage(AnalysisGate::default())
        .manage(SharedAcquirer::default())
        .invoke_handler(tauri::generate_handler![
            commands::analyze::analyze_image,
            commands::form::check_form,
            commands::form::clear_image,
            commands::form::form_config,
            commands::form::list_providers,
            commands::form::preview_image,
            commands::form::select_source
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
