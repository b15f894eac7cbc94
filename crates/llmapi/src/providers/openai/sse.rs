//! Server-sent-event decoding for streamed chat completions.
//!
//! Bytes are buffered until a full line is available so multi-byte characters
//! split across network chunks decode intact.

use anyhow::{Result, anyhow};
use bytes::Bytes;
use futures::stream::unfold;
use futures::{Stream, StreamExt};
use tracing::warn;

use super::models::{ApiErrorEnvelope, ChatCompletionChunk};

#[derive(Debug, PartialEq, Eq)]
pub enum SseFrame {
    /// Text carried by one chunk (never empty).
    Delta(String),
    /// `data: [DONE]`
    Done,
    /// Comments, `event:` lines, blank keep-alives and chunks without text.
    Skip,
}

#[derive(Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn next_line(&mut self) -> Option<Result<String>> {
        let line_end = self.buffer.iter().position(|byte| *byte == b'\n')?;
        let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
        Some(decode_utf8(raw).map(|line| line.trim_end().to_string()))
    }

    /// Whatever is left once the transport has closed.
    pub fn take_remainder(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        match decode_utf8(raw) {
            Ok(line) => {
                let line = line.trim();
                (!line.is_empty()).then(|| Ok(line.to_string()))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

fn decode_utf8(raw: Vec<u8>) -> Result<String> {
    String::from_utf8(raw).map_err(|err| anyhow!("Malformed stream: invalid UTF-8 ({err})"))
}

pub fn parse_line(line: &str) -> Result<SseFrame> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseFrame::Skip);
    };
    let data = data.trim();

    if data.is_empty() {
        return Ok(SseFrame::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseFrame::Done);
    }

    if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(data) {
        return Err(anyhow!("Provider stream error: {}", envelope.error.describe()));
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|err| anyhow!("Malformed stream chunk ({err}): {data}"))?;

    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.and_then(|delta| delta.content))
        .collect();

    if text.is_empty() {
        Ok(SseFrame::Skip)
    } else {
        Ok(SseFrame::Delta(text))
    }
}

struct DeltaState<S> {
    inner: S,
    decoder: SseDecoder,
    finished: bool,
}

/// Turns a raw SSE byte stream into text deltas. The stream ends at
/// `[DONE]`, at transport close, or right after the first error it yields.
pub fn delta_stream<S, E>(bytes_stream: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = DeltaState {
        inner: Box::pin(bytes_stream),
        decoder: SseDecoder::default(),
        finished: false,
    };

    unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            while let Some(line) = state.decoder.next_line() {
                match line.and_then(|line| parse_line(&line)) {
                    Ok(SseFrame::Delta(text)) => return Some((Ok(text), state)),
                    Ok(SseFrame::Done) => {
                        state.finished = true;
                        return None;
                    }
                    Ok(SseFrame::Skip) => continue,
                    Err(err) => {
                        state.finished = true;
                        return Some((Err(err), state));
                    }
                }
            }

            match state.inner.next().await {
                Some(Ok(bytes)) => state.decoder.push(&bytes),
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(anyhow!("Stream error: {err}")), state));
                }
                None => {
                    state.finished = true;
                    let remainder = state.decoder.take_remainder()?;
                    return match remainder.and_then(|line| parse_line(&line)) {
                        Ok(SseFrame::Delta(text)) => Some((Ok(text), state)),
                        Ok(_) => None,
                        Err(err) => {
                            warn!("Stream ended with unparsed data: {err:#}");
                            Some((Err(err), state))
                        }
                    };
                }
            }
        }
    })
}
