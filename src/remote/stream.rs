//! SSE parsing for streaming chat completions
//!
//! The API streams `data: {json}` lines terminated by `data: [DONE]`.
//! Bytes are buffered until a full line is available, then parsed into
//! [`StreamChunk`] values.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use reqwest::Response;

use super::error::ApiError;
use super::types::StreamChunk;

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ApiError>> + Send>>;

enum SseEvent {
    Chunk(Result<StreamChunk, ApiError>),
    Done,
}

/// Parse one SSE line. Returns `None` for blank lines, comments, and
/// non-data fields.
fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim();
    let data = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))?;
    let data = data.trim();

    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }

    Some(SseEvent::Chunk(
        serde_json::from_str::<StreamChunk>(data)
            .map_err(|err| ApiError::Protocol(format!("bad stream chunk: {err}"))),
    ))
}

/// Turn a streaming HTTP response into a stream of parsed chunks.
pub fn sse_chunks(response: Response) -> ChunkStream {
    let bytes = response.bytes_stream();

    Box::pin(async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: VecDeque<u8> = VecDeque::with_capacity(8192);

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(data) => {
                    buffer.extend(data);

                    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line_bytes: Vec<u8> = buffer.drain(..=pos).collect();
                        let Ok(line) = std::str::from_utf8(&line_bytes) else {
                            continue;
                        };

                        match parse_sse_line(line) {
                            Some(SseEvent::Done) => return,
                            Some(SseEvent::Chunk(chunk)) => yield chunk,
                            None => {}
                        }
                    }
                }
                Err(err) => {
                    yield Err(ApiError::from_transport(err));
                    return;
                }
            }
        }
    })
}
