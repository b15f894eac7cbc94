use tauri::{AppHandle, Emitter, State};
use tracing::warn;

use crate::constants::{RENDER_EVENT, STATE_EVENT};
use crate::error::AnalysisError;
use crate::gate::AnalysisGate;
use crate::image::{lock_acquirer, SharedAcquirer};
use crate::models::{AnalysisResponse, AnalyzeImageRequest, RenderPayload, StatePayload};
use crate::render::RenderSurface;
use crate::session::{AnalysisSession, SessionState};

/// Forwards frames and state changes to the webview as events.
struct WindowSurface {
    app: AppHandle,
}

impl RenderSurface for WindowSurface {
    fn show(&mut self, content: &str) {
        let payload = RenderPayload {
            content: content.to_string(),
        };
        if let Err(err) = self.app.emit(RENDER_EVENT, payload) {
            warn!("Failed to emit render frame: {err}");
        }
    }

    fn state_changed(&mut self, state: &SessionState) {
        if let Err(err) = self.app.emit(STATE_EVENT, StatePayload::from(state)) {
            warn!("Failed to emit session state: {err}");
        }
    }
}

/// Every outcome, including refusals, comes back as an `AnalysisResponse`;
/// the `Result` is only there because async commands borrowing state need one.
#[tauri::command]
pub async fn analyze_image(
    app: AppHandle,
    gate: State<'_, AnalysisGate>,
    images: State<'_, SharedAcquirer>,
    payload: AnalyzeImageRequest,
) -> Result<AnalysisResponse, String> {
    let Some(_guard) = gate.try_acquire() else {
        warn!("analysis trigger ignored while another analysis is running");
        return Ok(AnalysisError::Busy.into());
    };

    let image = lock_acquirer(&images).get_image().cloned();
    let request = match payload.into_request(image, true) {
        Ok(request) => request,
        Err(err) => return Ok(err.into()),
    };

    let mut surface = WindowSurface { app };
    let outcome = AnalysisSession::default()
        .run_analysis(request, &mut surface)
        .await;

    Ok(AnalysisResponse::from(outcome))
}
