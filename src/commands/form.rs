use tauri::State;
use tracing::debug;

use crate::image::{lock_acquirer, ImagePreview, ImageSource, SharedAcquirer};
use crate::models::{AnalysisResponse, AnalyzeImageRequest, FormConfig, ImagePayload};
use crate::provider::{available_providers, ProviderOption};

#[tauri::command]
pub fn form_config() -> FormConfig {
    FormConfig::current()
}

#[tauri::command]
pub fn list_providers() -> Vec<ProviderOption> {
    available_providers()
}

/// Switches the File/Camera radio; answers with that source's image, if any.
#[tauri::command]
pub fn select_source(
    images: State<'_, SharedAcquirer>,
    source: ImageSource,
) -> Option<ImagePreview> {
    let mut acquirer = lock_acquirer(&images);
    acquirer.select_source(source);
    acquirer.preview()
}

/// Validates a freshly chosen upload or capture, keeps it, and hands back
/// what the "Image" panel shows for confirmation.
#[tauri::command]
pub fn preview_image(
    images: State<'_, SharedAcquirer>,
    image: ImagePayload,
) -> Result<ImagePreview, String> {
    let mut acquirer = lock_acquirer(&images);
    let image = image.store_in(&mut acquirer).map_err(|err| err.to_string())?;
    debug!(file = image.file_name(), bytes = image.len(), "image accepted");
    Ok(ImagePreview::from(image))
}

#[tauri::command]
pub fn clear_image(images: State<'_, SharedAcquirer>) {
    lock_acquirer(&images).clear();
}

#[tauri::command]
pub fn check_form(
    images: State<'_, SharedAcquirer>,
    payload: AnalyzeImageRequest,
) -> AnalysisResponse {
    let image = lock_acquirer(&images).get_image().cloned();
    payload.review(image)
}
