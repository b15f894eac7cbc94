use crate::constants::STREAM_CURSOR;
use crate::session::SessionState;

/// Where analysis output is drawn: a webview placeholder, a test recorder.
pub trait RenderSurface {
    /// Replaces the displayed text with `content`.
    fn show(&mut self, content: &str);

    fn state_changed(&mut self, _state: &SessionState) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingResult {
    pub accumulated_text: String,
    pub is_complete: bool,
}

pub struct StreamingRenderer<'a, S: RenderSurface + ?Sized> {
    surface: &'a mut S,
    result: StreamingResult,
}

impl<'a, S: RenderSurface + ?Sized> StreamingRenderer<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        Self {
            surface,
            result: StreamingResult::default(),
        }
    }

    pub fn render(&mut self, partial: &str, is_final: bool) {
        if is_final {
            self.surface.show(partial);
        } else {
            self.surface.show(&format!("{partial}{STREAM_CURSOR}"));
        }
    }

    /// Appends one chunk and redraws; empty chunks draw nothing.
    pub fn push(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.result.accumulated_text.push_str(chunk);
        let partial = std::mem::take(&mut self.result.accumulated_text);
        self.render(&partial, false);
        self.result.accumulated_text = partial;
    }

    pub fn finish(mut self) -> StreamingResult {
        let text = std::mem::take(&mut self.result.accumulated_text);
        self.render(&text, true);
        StreamingResult {
            accumulated_text: text,
            is_complete: true,
        }
    }

    /// Stops without the final redraw; the surface keeps its last frame.
    pub fn abandon(self) -> StreamingResult {
        self.result
    }
}

/// Records every frame and state change.
#[derive(Debug, Default)]
pub struct MemorySurface {
    pub frames: Vec<String>,
    pub states: Vec<SessionState>,
}

impl MemorySurface {
    pub fn last_frame(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }
}

impl RenderSurface for MemorySurface {
    fn show(&mut self, content: &str) {
        self.frames.push(content.to_string());
    }

    fn state_changed(&mut self, state: &SessionState) {
        self.states.push(state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cursor_on_every_intermediate_frame_only() {
        let mut surface = MemorySurface::default();
        let mut renderer = StreamingRenderer::new(&mut surface);
        for chunk in ["Hello", " world", "."] {
            renderer.push(chunk);
        }
        let result = renderer.finish();

        assert_eq!(
            surface.frames,
            vec!["Hello▌", "Hello world▌", "Hello world.▌", "Hello world."]
        );
        assert_eq!(
            result,
            StreamingResult {
                accumulated_text: "Hello world.".into(),
                is_complete: true
            }
        );
    }

    #[test]
    fn empty_chunks_are_not_drawn() {
        let mut surface = MemorySurface::default();
        let mut renderer = StreamingRenderer::new(&mut surface);
        renderer.push("");
        renderer.push("a");
        renderer.push("");
        let result = renderer.finish();

        assert_eq!(result.accumulated_text, "a");
        assert_eq!(surface.frames, vec!["a▌", "a"]);
    }

    #[test]
    fn empty_stream_still_renders_final_frame() {
        let mut surface = MemorySurface::default();
        let result = StreamingRenderer::new(&mut surface).finish();
        assert_eq!(surface.frames, vec![""]);
        assert!(result.is_complete);
    }

    #[test]
    fn abandon_leaves_last_frame_with_cursor() {
        let mut surface = MemorySurface::default();
        let mut renderer = StreamingRenderer::new(&mut surface);
        renderer.push("half");
        let result = renderer.abandon();

        assert!(!result.is_complete);
        assert_eq!(result.accumulated_text, "half");
        assert_eq!(surface.last_frame(), Some("half▌"));
    }
}
