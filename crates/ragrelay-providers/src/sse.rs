//! Decoding of the upstream `text/event-stream` body into typed chunks.

use futures::{Stream, StreamExt};
use ragrelay_core::error::{RelayError, Result};
use ragrelay_core::traits::ChunkStream;
use ragrelay_core::types::CompletionChunk;

/// Payload that ends an OpenAI-style stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One `data:` payload from the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Data(String),
    Done,
}

/// Incremental line decoder. Bytes may arrive split anywhere, including
/// inside a UTF-8 sequence, so decoding happens per complete line.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Feed raw bytes, returning every frame completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(bytes);
        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(frame) = parse_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing line that had no terminating newline.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let line = std::mem::take(&mut self.buf);
        parse_line(&line)
    }
}

fn parse_line(raw: &[u8]) -> Option<SseFrame> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\r', '\n']);
    // Comments (":"), "event:"/"id:" fields and blank separators carry no payload.
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    if data == DONE_SENTINEL {
        Some(SseFrame::Done)
    } else {
        Some(SseFrame::Data(data.to_string()))
    }
}

/// Parse one `data:` payload into a chunk.
///
/// An in-band `{"error": ...}` object is reported as a provider error.
pub fn parse_chunk(data: &str) -> Result<CompletionChunk> {
    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| RelayError::MalformedChunk(format!("{e}: {}", truncate(data))))?;

    if let Some(err) = value.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| err.to_string());
        return Err(RelayError::Provider(message));
    }

    serde_json::from_value(value)
        .map_err(|e| RelayError::MalformedChunk(format!("{e}: {}", truncate(data))))
}

fn truncate(data: &str) -> &str {
    match data.char_indices().nth(100) {
        Some((idx, _)) => &data[..idx],
        None => data,
    }
}

/// Turn a byte stream into a chunk stream.
///
/// Ends at `[DONE]` or end of body; the first error is yielded and ends the
/// stream.
pub fn chunk_stream<S, B>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut decoder = SseDecoder::default();
        let mut bytes = Box::pin(bytes);

        while let Some(next) = bytes.next().await {
            let frames = match next {
                Ok(b) => decoder.push(b.as_ref()),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for frame in frames {
                match frame {
                    SseFrame::Done => return,
                    SseFrame::Data(data) => {
                        let parsed = parse_chunk(&data);
                        let failed = parsed.is_err();
                        yield parsed;
                        if failed {
                            return;
                        }
                    }
                }
            }
        }

        if let Some(SseFrame::Data(data)) = decoder.finish() {
            yield parse_chunk(&data);
        }
    })
}
