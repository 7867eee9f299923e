use std::collections::VecDeque;

use futures_util::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::Message;
use crate::sse::{SseFrame, SseParser};

/// Event received from the chat-stream endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    UserMessage(Message),
    Chunk { text: String },
    AssistantMessage(Message),
    Done,
    Error { error: String },
}

#[derive(Deserialize)]
struct ChunkPayload {
    text: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    error: String,
}

impl StreamEvent {
    /// Maps a parsed frame to a typed event. Unknown event names yield `Ok(None)`.
    pub fn from_frame(frame: &SseFrame) -> Result<Option<Self>, serde_json::Error> {
        let data = &frame.data;
        let event = match frame.event.as_str() {
            "user_message" => StreamEvent::UserMessage(Message::deserialize(data)?),
            "chunk" => StreamEvent::Chunk { text: ChunkPayload::deserialize(data)?.text },
            "assistant_message" => StreamEvent::AssistantMessage(Message::deserialize(data)?),
            "done" => StreamEvent::Done,
            "error" => StreamEvent::Error { error: ErrorPayload::deserialize(data)?.error },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

struct DecodeState<S> {
    body: S,
    parser: SseParser,
    ready: VecDeque<SseFrame>,
    finished: bool,
}

/// Turns a response body into a lazy stream of chat events.
///
/// Malformed frames are logged and skipped. A transport error is yielded
/// once and ends the stream.
pub fn decode_events<S, B, E>(body: S) -> impl Stream<Item = Result<StreamEvent, AppError>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<AppError>,
{
    let state = DecodeState {
        body,
        parser: SseParser::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.ready.pop_front() {
                match StreamEvent::from_frame(&frame) {
                    Ok(Some(event)) => return Some((Ok(event), state)),
                    Ok(None) => debug!(event = %frame.event, "Ignoring unknown stream event"),
                    Err(e) => warn!(event = %frame.event, "Skipping stream event with unexpected payload: {e}"),
                }
                continue;
            }

            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.parser.push(chunk.as_ref());
                    state.ready.extend(frames);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.ready.clear();
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.finished = true;
                    let frames = state.parser.finish();
                    state.ready.extend(frames);
                }
            }
        }
    })
}
