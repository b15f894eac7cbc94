use llmapi::utils::decode_base64_to_bytes;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ACCEPTED_IMAGE_EXTENSIONS, ANALYZE_BUTTON_LABEL, APP_TITLE, BUSY_MESSAGE, RENDER_EVENT,
    STATE_EVENT,
};
use crate::error::{AnalysisError, Result};
use crate::image::{ImageAcquirer, ImageInput, ImageSource};
use crate::prompt::{build_prompt, PromptRequest};
use crate::provider::{Provider, ProviderConfig, ProviderKind};
use crate::session::{AnalysisRequest, SessionOutcome, SessionState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPayload {
    pub kind: ProviderKind,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

/// One upload or camera frame as the webview read it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    #[serde(default)]
    pub source: ImageSource,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub data_base64: String,
}

/// The form fields other than the image, which the acquirer already holds.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    pub provider: ProviderPayload,
    pub api_key: Option<String>,
    pub endpoint_override: Option<String>,
    #[serde(default)]
    pub show_details: bool,
    pub additional_details: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOption {
    pub source: ImageSource,
    pub caption: &'static str,
}

/// Static texts and limits the webview form is drawn with.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfig {
    pub title: &'static str,
    pub analyze_label: &'static str,
    pub busy_message: &'static str,
    pub accepted_extensions: Vec<String>,
    pub sources: Vec<SourceOption>,
    pub render_event: &'static str,
    pub state_event: &'static str,
}

impl FormConfig {
    pub fn current() -> Self {
        Self {
            title: APP_TITLE,
            analyze_label: ANALYZE_BUTTON_LABEL,
            busy_message: BUSY_MESSAGE,
            accepted_extensions: ACCEPTED_IMAGE_EXTENSIONS
                .iter()
                .map(|ext| format!(".{ext}"))
                .collect(),
            sources: [ImageSource::File, ImageSource::Camera]
                .into_iter()
                .map(|source| SourceOption {
                    source,
                    caption: source.caption(),
                })
                .collect(),
            render_event: RENDER_EVENT,
            state_event: STATE_EVENT,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct RenderPayload {
    pub content: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct StatePayload {
    #[serde(flatten)]
    pub state: SessionState,
    pub busy: bool,
}

impl From<&SessionState> for StatePayload {
    fn from(state: &SessionState) -> Self {
        Self {
            state: state.clone(),
            busy: state.is_busy(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AnalysisResponse {
    Idle {
        warnings: Vec<String>,
    },
    Rejected {
        warnings: Vec<String>,
    },
    Completed {
        text: String,
    },
    Failed {
        error: String,
        #[serde(rename = "partialText")]
        partial_text: String,
    },
}

impl ProviderPayload {
    pub fn into_provider(self) -> Result<Provider> {
        match self.kind {
            ProviderKind::OpenAi => Ok(Provider::OpenAi),
            ProviderKind::Compatible => Provider::compatible(
                self.endpoint.as_deref().unwrap_or_default(),
                self.model.as_deref().unwrap_or_default(),
            ),
        }
    }
}

impl ImagePayload {
    /// Decodes the widget bytes and files them under the source they came
    /// from. A rejected image leaves the acquirer unchanged.
    pub fn store_in(self, acquirer: &mut ImageAcquirer) -> Result<&ImageInput> {
        let bytes = decode_base64_to_bytes(&self.data_base64)
            .map_err(|err| AnalysisError::InvalidImageData(format!("{err:#}")))?;

        match self.source {
            ImageSource::File => {
                let file_name = self
                    .file_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        AnalysisError::InvalidImageData("uploaded file has no name".into())
                    })?;
                acquirer.upload(file_name, bytes)
            }
            ImageSource::Camera => acquirer.capture(bytes, self.mime_type.as_deref()),
        }
    }
}

impl AnalyzeImageRequest {
    /// Snapshot of the form together with the acquirer's current image.
    /// Configuration errors surface here, before any request exists.
    pub fn into_request(
        self,
        image: Option<ImageInput>,
        triggered: bool,
    ) -> Result<AnalysisRequest> {
        let provider = self.provider.into_provider()?;
        let mut config = ProviderConfig::new(provider, self.api_key.unwrap_or_default());
        if let Some(endpoint) = self
            .endpoint_override
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            config = config.with_endpoint_base(endpoint)?;
        }

        let (image, prompt) = match image {
            Some(image) => {
                let request = PromptRequest::new(image, self.show_details, self.additional_details);
                let prompt = request.prompt_text();
                (Some(request.image), prompt)
            }
            None => (None, build_prompt(None)),
        };

        Ok(AnalysisRequest {
            image,
            config,
            prompt,
            triggered,
        })
    }

    /// Warnings for the form as it stands, without pressing the trigger.
    pub fn review(self, image: Option<ImageInput>) -> AnalysisResponse {
        match self.into_request(image, false) {
            Ok(request) => SessionOutcome::pending(&request).into(),
            Err(err) => err.into(),
        }
    }
}

fn messages(warnings: &[AnalysisError]) -> Vec<String> {
    warnings.iter().map(ToString::to_string).collect()
}

impl From<SessionOutcome> for AnalysisResponse {
    fn from(outcome: SessionOutcome) -> Self {
        match outcome {
            SessionOutcome::Idle { warnings } => AnalysisResponse::Idle {
                warnings: messages(&warnings),
            },
            SessionOutcome::Rejected { warnings } => AnalysisResponse::Rejected {
                warnings: messages(&warnings),
            },
            SessionOutcome::Completed(result) => AnalysisResponse::Completed {
                text: result.accumulated_text,
            },
            SessionOutcome::Failed { error, partial } => AnalysisResponse::Failed {
                error: error.to_string(),
                partial_text: partial.accumulated_text,
            },
        }
    }
}

/// Errors raised before the session starts: warnings keep the form usable,
/// anything else is reported like a failed run with nothing rendered.
impl From<AnalysisError> for AnalysisResponse {
    fn from(error: AnalysisError) -> Self {
        if error.is_warning() {
            AnalysisResponse::Rejected {
                warnings: vec![error.to_string()],
            }
        } else {
            AnalysisResponse::Failed {
                error: error.to_string(),
                partial_text: String::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::INSTRUCTION_TEXT;
    use crate::render::StreamingResult;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> AnalyzeImageRequest {
        serde_json::from_value(value).expect("payload should deserialize")
    }

    fn image_payload(value: serde_json::Value) -> ImagePayload {
        serde_json::from_value(value).expect("image payload should deserialize")
    }

    fn stored_upload() -> ImageAcquirer {
        let mut acquirer = ImageAcquirer::default();
        image_payload(json!({ "source": "file", "fileName": "leaf.png", "dataBase64": "aGVsbG8=" }))
            .store_in(&mut acquirer)
            .unwrap();
        acquirer
    }

    #[test]
    fn form_payload_becomes_request_snapshot() {
        let acquirer = stored_upload();
        let request = parse(json!({
            "provider": { "kind": "openAi" },
            "apiKey": " sk-test ",
            "showDetails": true,
            "additionalDetails": "Collected at 2,000 m"
        }))
        .into_request(acquirer.get_image().cloned(), true)
        .unwrap();

        assert!(request.triggered);
        assert_eq!(request.config.api_key(), "sk-test");
        let image = request.image.expect("image taken from the acquirer");
        assert_eq!(image.bytes(), b"hello");
        assert_eq!(image.mime_type(), "image/png");
        assert!(request.prompt.starts_with(INSTRUCTION_TEXT));
        assert!(request.prompt.ends_with("\nCollected at 2,000 m"));
    }

    #[test]
    fn details_ignored_when_toggle_is_off() {
        let mut acquirer = ImageAcquirer::default();
        acquirer.select_source(ImageSource::Camera);
        let frame = json!({
            "source": "camera",
            "mimeType": "image/jpeg",
            "dataBase64": "aGVsbG8="
        });
        image_payload(frame).store_in(&mut acquirer).unwrap();

        let request = parse(json!({
            "provider": { "kind": "openAi" },
            "additionalDetails": "hidden"
        }))
        .into_request(acquirer.get_image().cloned(), true)
        .unwrap();

        assert_eq!(request.prompt, INSTRUCTION_TEXT);
        assert_eq!(request.config.api_key(), "");
        assert_eq!(request.image.unwrap().file_name(), "camera-capture.jpg");
    }

    #[test]
    fn stored_image_follows_the_selected_source() {
        let mut acquirer = stored_upload();
        acquirer.select_source(ImageSource::Camera);
        assert!(acquirer.get_image().is_none());

        acquirer.select_source(ImageSource::File);
        assert_eq!(acquirer.get_image().unwrap().file_name(), "leaf.png");
    }

    #[test]
    fn undecodable_or_unnamed_images_are_not_stored() {
        let mut acquirer = stored_upload();

        let bad = image_payload(json!({ "fileName": "a.png", "dataBase64": "%%%" }))
            .store_in(&mut acquirer)
            .unwrap_err();
        assert!(matches!(bad, AnalysisError::InvalidImageData(_)));

        let unnamed = image_payload(json!({ "fileName": "  ", "dataBase64": "aGVsbG8=" }))
            .store_in(&mut acquirer)
            .unwrap_err();
        assert!(matches!(unnamed, AnalysisError::InvalidImageData(_)));

        let gif = image_payload(json!({ "fileName": "anim.gif", "dataBase64": "aGVsbG8=" }))
            .store_in(&mut acquirer)
            .unwrap_err();
        assert!(matches!(gif, AnalysisError::UnsupportedImage { .. }));

        assert_eq!(acquirer.get_image().unwrap().file_name(), "leaf.png");
    }

    #[test]
    fn missing_image_still_builds_a_snapshot() {
        let request = parse(json!({ "provider": { "kind": "openAi" }, "apiKey": "sk" }))
            .into_request(None, true)
            .unwrap();
        assert!(request.image.is_none());
    }

    #[test]
    fn incomplete_compatible_provider_is_rejected() {
        let err = parse(json!({
            "provider": { "kind": "compatible", "endpoint": "http://localhost:11434/v1" },
            "apiKey": "x"
        }))
        .into_request(None, true)
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidProvider { .. }));
    }

    #[test]
    fn endpoint_override_is_applied() {
        let request = parse(json!({
            "provider": { "kind": "openAi" },
            "apiKey": "sk",
            "endpointOverride": "https://gateway.example/v1"
        }))
        .into_request(None, true)
        .unwrap();
        assert_eq!(request.config.endpoint(), "https://gateway.example/v1");
    }

    #[test]
    fn review_warns_about_missing_key_before_trigger() {
        let acquirer = stored_upload();
        let response = parse(json!({ "provider": { "kind": "openAi" }, "apiKey": "" }))
            .review(acquirer.get_image().cloned());

        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({ "status": "idle", "warnings": ["Please enter your OpenAI API key."] })
        );
    }

    #[test]
    fn review_does_not_ask_for_an_image_yet() {
        let response =
            parse(json!({ "provider": { "kind": "openAi" }, "apiKey": "sk" })).review(None);
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({ "status": "idle", "warnings": [] })
        );
    }

    #[test]
    fn review_reports_bad_provider_settings_as_failure() {
        let response = parse(json!({ "provider": { "kind": "compatible" }, "apiKey": "x" }))
            .review(None);
        assert!(matches!(
            response,
            AnalysisResponse::Failed { ref partial_text, .. } if partial_text.is_empty()
        ));
    }

    #[test]
    fn busy_is_answered_as_a_warning() {
        assert_eq!(
            serde_json::to_value(AnalysisResponse::from(AnalysisError::Busy)).unwrap(),
            json!({
                "status": "rejected",
                "warnings": ["An analysis is already running. Please wait for it to finish."]
            })
        );
    }

    #[test]
    fn state_payload_flags_busy_states() {
        assert_eq!(
            serde_json::to_value(StatePayload::from(&SessionState::Streaming)).unwrap(),
            json!({ "state": "streaming", "busy": true })
        );
        assert_eq!(
            serde_json::to_value(StatePayload::from(&SessionState::Failed("boom".into())))
                .unwrap(),
            json!({ "state": "failed", "message": "boom", "busy": false })
        );
        assert_eq!(
            serde_json::to_value(StatePayload::from(&SessionState::Done)).unwrap(),
            json!({ "state": "done", "busy": false })
        );
    }

    #[test]
    fn form_config_lists_sources_and_extensions() {
        let config = serde_json::to_value(FormConfig::current()).unwrap();
        assert_eq!(config["analyzeLabel"], "Analyse the Scientific Image");
        assert_eq!(config["acceptedExtensions"], json!([".png", ".jpg", ".jpeg"]));
        assert_eq!(
            config["sources"],
            json!([
                { "source": "file", "caption": "Upload image from file." },
                { "source": "camera", "caption": "Take picture from camera." }
            ])
        );
    }

    #[test]
    fn outcomes_serialize_with_status_tag() {
        let rejected = AnalysisResponse::from(SessionOutcome::Rejected {
            warnings: vec![AnalysisError::MissingImage],
        });
        assert_eq!(
            serde_json::to_value(rejected).unwrap(),
            json!({ "status": "rejected", "warnings": ["Please upload an image."] })
        );

        let failed = AnalysisResponse::from(SessionOutcome::Failed {
            error: AnalysisError::RemoteRequest(anyhow::anyhow!("timeout")),
            partial: StreamingResult {
                accumulated_text: "Par".into(),
                is_complete: false,
            },
        });
        assert_eq!(
            serde_json::to_value(failed).unwrap(),
            json!({
                "status": "failed",
                "error": "An error occurred: timeout",
                "partialText": "Par"
            })
        );
    }
}
