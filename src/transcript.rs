//! Conversation transcript and the per-send state machine that applies
//! chat-stream events to it.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::Message;
use crate::stream::StreamEvent;

/// A transcript entry. `Pending` is the client-side assistant reply that is
/// still streaming; it is replaced by the server's message once confirmed.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Pending(Message),
    Confirmed(Message),
}

impl Entry {
    pub fn message(&self) -> &Message {
        match self {
            Entry::Pending(m) | Entry::Confirmed(m) => m,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Entry::Pending(_))
    }
}

/// Ordered list of messages shown for one conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            entries: messages.into_iter().map(Entry::Confirmed).collect(),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().map(Entry::message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending(&self) -> Option<&Message> {
        self.entries.iter().find_map(|e| match e {
            Entry::Pending(m) => Some(m),
            Entry::Confirmed(_) => None,
        })
    }

    fn pending_mut(&mut self) -> Option<&mut Message> {
        self.entries.iter_mut().find_map(|e| match e {
            Entry::Pending(m) => Some(m),
            Entry::Confirmed(_) => None,
        })
    }

    fn push_confirmed(&mut self, message: Message) {
        self.entries.push(Entry::Confirmed(message));
    }

    fn push_pending(&mut self, message: Message) {
        debug_assert!(self.pending().is_none());
        self.entries.push(Entry::Pending(message));
    }

    /// Swaps the pending entry for `message` in place, or appends it when
    /// nothing was pending.
    fn confirm(&mut self, message: Message) {
        match self.entries.iter().position(Entry::is_pending) {
            Some(index) => self.entries[index] = Entry::Confirmed(message),
            None => self.push_confirmed(message),
        }
    }

    /// Keeps a still-streaming reply as it stands.
    fn settle_pending(&mut self) {
        for entry in &mut self.entries {
            if let Entry::Pending(m) = entry {
                *entry = Entry::Confirmed(m.clone());
            }
        }
    }

    fn discard_pending(&mut self) {
        self.entries.retain(|e| !e.is_pending());
    }
}

/// What the user has typed plus any images waiting to be uploaded with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub attachments: Vec<PathBuf>,
}

impl Draft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    AwaitingFirstEvent,
    Streaming,
    Finalizing,
}

/// State of one conversation view: transcript, input box, and the progress
/// of the send currently in flight.
#[derive(Debug, Clone)]
pub struct ChatState {
    conversation_id: String,
    transcript: Transcript,
    phase: SendPhase,
    status: Option<String>,
    last_error: Option<String>,
    /// Draft as the user left it; restored here when a send fails.
    pub input: Draft,
    in_flight: Option<Draft>,
    accumulated: String,
    user_sequence: i64,
}

impl ChatState {
    pub fn new(conversation_id: impl Into<String>, history: Vec<Message>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            transcript: Transcript::from_messages(history),
            phase: SendPhase::Idle,
            status: None,
            last_error: None,
            input: Draft::default(),
            in_flight: None,
            accumulated: String::new(),
            user_sequence: 0,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> SendPhase {
        self.phase
    }

    /// Whether the send control should be disabled.
    pub fn is_sending(&self) -> bool {
        self.phase != SendPhase::Idle
    }

    /// Advisory "thinking" text for the status line.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Takes the draft out of the input box and starts a send.
    pub fn begin_send(&mut self) -> Result<Draft, AppError> {
        if self.is_sending() {
            return Err(AppError::SendInProgress);
        }
        if self.input.is_empty() {
            return Err(AppError::EmptyField {
                field_name: "message".to_string(),
            });
        }

        let mut draft = std::mem::take(&mut self.input);
        draft.text = draft.text.trim().to_string();

        self.in_flight = Some(draft.clone());
        self.accumulated.clear();
        self.user_sequence = 0;
        self.last_error = None;
        self.phase = SendPhase::AwaitingFirstEvent;
        Ok(draft)
    }

    /// Applies one stream event. An `error` event fails the send and is
    /// returned as [`AppError::Stream`].
    pub fn apply(&mut self, event: StreamEvent) -> Result<(), AppError> {
        match event {
            StreamEvent::UserMessage(message) => {
                self.user_sequence = message.sequence;
                self.transcript.push_confirmed(message);
                self.phase = SendPhase::Streaming;
            }
            StreamEvent::Chunk { text } => {
                self.accumulated.push_str(&text);
                match self.transcript.pending_mut() {
                    Some(pending) => pending.content.clone_from(&self.accumulated),
                    None => {
                        let placeholder = Message::placeholder(
                            &self.conversation_id,
                            self.user_sequence + 1,
                            self.accumulated.clone(),
                        );
                        self.transcript.push_pending(placeholder);
                    }
                }
                self.phase = SendPhase::Streaming;
            }
            StreamEvent::AssistantMessage(message) => {
                self.transcript.confirm(message);
                self.phase = SendPhase::Finalizing;
            }
            StreamEvent::Done => self.complete(),
            StreamEvent::Error { error } => {
                let err = AppError::stream(error);
                self.fail(&err);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Ends the send normally. Also used when the stream closes without `done`.
    /// A reply that never got its final message is kept with the text
    /// streamed so far.
    pub fn complete(&mut self) {
        if self.transcript.pending().is_some() {
            debug!(
                conversation_id = %self.conversation_id,
                "Stream finished without a final assistant message"
            );
            self.transcript.settle_pending();
        }
        self.status = None;
        self.in_flight = None;
        self.accumulated.clear();
        self.phase = SendPhase::Idle;
    }

    /// Aborts the send: drops the streaming reply, puts the draft back in the
    /// input box and records a short message for display. A user message the
    /// server already echoed stays in the transcript.
    pub fn fail(&mut self, err: &AppError) {
        warn!(conversation_id = %self.conversation_id, "Chat send failed: {err}");

        self.transcript.discard_pending();
        if let Some(draft) = self.in_flight.take() {
            self.input = draft;
        }
        self.last_error = Some(failure_message(err));
        self.status = None;
        self.accumulated.clear();
        self.phase = SendPhase::Idle;
    }
}

fn failure_message(err: &AppError) -> String {
    match err {
        AppError::Stream { message } => message.clone(),
        AppError::Timeout(_) => {
            "AI processing timed out, try again later or attach fewer images".to_string()
        }
        AppError::EmptyField { .. }
        | AppError::FileTooLarge { .. }
        | AppError::UnsupportedFileType { .. } => err.to_string(),
        _ => "Failed to send message".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;
    use chrono::Utc;

    fn message(id: &str, role: MessageRole, content: &str, sequence: i64) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "c1".to_string(),
            role,
            content: content.to_string(),
            sequence,
            created_at: Utc::now(),
        }
    }

    fn chunk(text: &str) -> StreamEvent {
        StreamEvent::Chunk { text: text.to_string() }
    }

    fn sending(text: &str) -> ChatState {
        let mut state = ChatState::new("c1", vec![]);
        state.input = Draft::text(text);
        state.begin_send().unwrap();
        state
    }

    #[test]
    fn chunks_accumulate_into_a_single_placeholder() {
        let mut state = sending("Add a login page");
        state
            .apply(StreamEvent::UserMessage(message("m1", MessageRole::User, "Add a login page", 1)))
            .unwrap();
        for text in ["Sure, ", "here's ", "a plan."] {
            state.apply(chunk(text)).unwrap();
        }

        let entries = state.transcript().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.iter().filter(|e| e.is_pending()).count(), 1);
        let pending = state.transcript().pending().unwrap();
        assert_eq!(pending.content, "Sure, here's a plan.");
        assert_eq!(pending.sequence, 2);
        assert_eq!(pending.role, MessageRole::Assistant);
        assert_eq!(state.phase(), SendPhase::Streaming);
    }

    #[test]
    fn assistant_message_replaces_placeholder_in_place() {
        let mut state = sending("Add a login page");
        state
            .apply(StreamEvent::UserMessage(message("m1", MessageRole::User, "Add a login page", 1)))
            .unwrap();
        state.apply(chunk("Sure")).unwrap();
        let final_msg = message("m2", MessageRole::Assistant, "Sure", 2);
        state.apply(StreamEvent::AssistantMessage(final_msg.clone())).unwrap();

        let entries = state.transcript().entries();
        assert!(entries.iter().all(|e| !e.is_pending()));
        assert_eq!(entries[1], Entry::Confirmed(final_msg));
        assert_eq!(state.phase(), SendPhase::Finalizing);

        state.apply(StreamEvent::Done).unwrap();
        assert_eq!(state.phase(), SendPhase::Idle);
        assert!(state.status().is_none());
    }

    #[test]
    fn assistant_message_without_chunks_is_appended() {
        let mut state = sending("hi");
        state
            .apply(StreamEvent::UserMessage(message("m1", MessageRole::User, "hi", 1)))
            .unwrap();
        state
            .apply(StreamEvent::AssistantMessage(message("m2", MessageRole::Assistant, "", 2)))
            .unwrap();
        let ids: Vec<_> = state.transcript().messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
    }

    #[test]
    fn error_event_restores_draft_and_keeps_user_message() {
        let mut state = ChatState::new("c1", vec![message("m0", MessageRole::User, "earlier", 1)]);
        state.input = Draft {
            text: "Add a login page".into(),
            attachments: vec![PathBuf::from("mock.png")],
        };
        state.begin_send().unwrap();
        state.set_status("Generating reply...");
        assert!(state.input.is_empty());

        state
            .apply(StreamEvent::UserMessage(message("m1", MessageRole::User, "Add a login page", 2)))
            .unwrap();
        state.apply(chunk("partial")).unwrap();
        let err = state
            .apply(StreamEvent::Error { error: "model overloaded".into() })
            .unwrap_err();

        assert!(matches!(err, AppError::Stream { .. }));
        assert_eq!(state.input.text, "Add a login page");
        assert_eq!(state.input.attachments, vec![PathBuf::from("mock.png")]);
        assert_eq!(state.last_error(), Some("model overloaded"));
        assert!(state.status().is_none());
        assert_eq!(state.phase(), SendPhase::Idle);
        let ids: Vec<_> = state.transcript().messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m0", "m1"]);
    }

    #[test]
    fn transport_failure_before_any_event_leaves_transcript_untouched() {
        let history = vec![message("m0", MessageRole::User, "earlier", 1)];
        let mut state = ChatState::new("c1", history.clone());
        state.input = Draft::text("retry me");
        state.begin_send().unwrap();

        state.fail(&AppError::Http { status: 502, detail: String::new() });

        assert_eq!(state.transcript(), &Transcript::from_messages(history));
        assert_eq!(state.input, Draft::text("retry me"));
        assert_eq!(state.last_error(), Some("Failed to send message"));
    }

    #[test]
    fn second_send_is_rejected_while_streaming() {
        let mut state = sending("first");
        state.input = Draft::text("second");
        assert!(matches!(state.begin_send(), Err(AppError::SendInProgress)));
        assert_eq!(state.input.text, "second");
    }

    #[test]
    fn empty_draft_is_rejected() {
        let mut state = ChatState::new("c1", vec![]);
        state.input = Draft::text("   ");
        assert!(matches!(state.begin_send(), Err(AppError::EmptyField { .. })));
        assert_eq!(state.phase(), SendPhase::Idle);
    }

    #[test]
    fn image_only_draft_is_accepted() {
        let mut state = ChatState::new("c1", vec![]);
        state.input.attachments.push(PathBuf::from("screen.png"));
        let draft = state.begin_send().unwrap();
        assert!(draft.text.is_empty());
        assert_eq!(draft.attachments.len(), 1);
    }

    #[test]
    fn stream_closing_without_done_completes_the_send() {
        let mut state = sending("hi");
        state.set_status("Generating reply...");
        state.apply(chunk("partial")).unwrap();
        state.complete();
        assert_eq!(state.phase(), SendPhase::Idle);
        assert!(state.status().is_none());
        assert!(!state.is_sending());
        assert!(state.transcript().pending().is_none());
        assert_eq!(state.transcript().entries()[0].message().content, "partial");
    }

    #[test]
    fn reply_cut_short_by_done_does_not_leak_into_the_next_send() {
        let mut state = sending("first");
        state
            .apply(StreamEvent::UserMessage(message("u1", MessageRole::User, "first", 1)))
            .unwrap();
        state.apply(chunk("partial")).unwrap();
        state.apply(StreamEvent::Done).unwrap();
        assert!(state.transcript().entries().iter().all(|e| !e.is_pending()));

        state.input = Draft::text("second");
        state.begin_send().unwrap();
        state
            .apply(StreamEvent::UserMessage(message("u2", MessageRole::User, "second", 3)))
            .unwrap();
        state.apply(chunk("new reply")).unwrap();

        let entries = state.transcript().entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1].message().content, "partial");
        assert!(entries[3].is_pending());
        assert_eq!(entries[3].message().content, "new reply");
        assert_eq!(entries[3].message().sequence, 4);

        state
            .apply(StreamEvent::AssistantMessage(message("a2", MessageRole::Assistant, "new reply", 4)))
            .unwrap();
        state.apply(StreamEvent::Done).unwrap();

        let contents: Vec<_> = state.transcript().messages().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "partial", "second", "new reply"]);
        let last = state.transcript().messages().last().map(|m| m.id.as_str());
        assert_eq!(last, Some("a2"));
    }
}
