use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use prd_studio::api::ApiClient;
use prd_studio::errors::AppError;
use prd_studio::models::{ChatRequest, Message, MessageRole};
use prd_studio::service::chat_service::ChatService;
use prd_studio::transcript::{ChatState, Draft, SendPhase};
use prd_studio::upload::is_image;

use super::conversations::{print_header, print_message};
use crate::cli::ChatArgs;

pub async fn run(client: ApiClient, args: ChatArgs) -> Result<()> {
    let detail = client.get_conversation(&args.conversation_id).await?;
    let project_id = detail.conversation.project_id.clone();
    let service = ChatService::new(client);
    let mut state = ChatState::new(detail.conversation.id.clone(), detail.messages);

    if args.no_stream {
        let request = ChatRequest {
            message: required_text(args.message)?,
            image_file_ids: Vec::new(),
        };
        let response = service.client().chat(state.conversation_id(), &request).await?;
        print_message(&response.assistant_message);
        return Ok(());
    }

    if args.message.is_some() || !args.images.is_empty() {
        state.input = Draft {
            text: args.message.unwrap_or_default(),
            attachments: args.images,
        };
        let mut renderer = Renderer::new(&state);
        service
            .send(&mut state, &project_id, |s| renderer.update(s))
            .await?;
        return Ok(());
    }

    print_header(&detail.conversation);
    println!();
    for message in state.transcript().messages() {
        print_message(message);
    }
    println!("Type a message. /image <path> attaches an image, /draft shows the draft, /clear drops it, /quit exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "/quit" | "/exit" => break,
            "/draft" => {
                print_draft(&state.input);
                continue;
            }
            "/clear" => {
                state.input = Draft::default();
                println!("Draft cleared.");
                continue;
            }
            _ => {}
        }

        if let Some(path) = line.strip_prefix("/image ") {
            let path = PathBuf::from(path.trim());
            if !is_image(&path) {
                eprintln!("{} is not a supported image", path.display());
            } else if !path.exists() {
                eprintln!("{} does not exist", path.display());
            } else {
                state.input.attachments.push(path);
                println!("{} image(s) attached", state.input.attachments.len());
            }
            continue;
        }

        // Empty input resends a restored draft.
        if line.is_empty() && state.input.is_empty() {
            continue;
        }
        if !line.is_empty() {
            state.input.text = line.to_string();
        }

        let mut renderer = Renderer::new(&state);
        if let Err(e) = service
            .send(&mut state, &project_id, |s| renderer.update(s))
            .await
        {
            tracing::debug!("Send failed: {e}");
            let message = state.last_error().unwrap_or("Failed to send message");
            eprintln!("error: {message}");
            if !state.input.is_empty() {
                eprintln!("Your message was kept. Press Enter to resend it or type a new one.");
            }
        }
    }
    Ok(())
}

fn required_text(message: Option<String>) -> Result<String, AppError> {
    let text = message.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::EmptyField { field_name: "message".to_string() });
    }
    Ok(text.to_string())
}

fn prompt() {
    print!("you> ");
    std::io::stdout().flush().ok();
}

fn print_draft(draft: &Draft) {
    if draft.is_empty() {
        println!("Draft is empty.");
        return;
    }
    println!("Draft: \"{}\"", draft.text);
    for path in &draft.attachments {
        println!("  + {}", path.display());
    }
}

/// Prints a send as it progresses: status lines to stderr, the streaming
/// reply as deltas.
struct Renderer {
    start_len: usize,
    streamed_text: String,
    streamed: bool,
    finished: bool,
    last_status: Option<String>,
}

impl Renderer {
    fn new(state: &ChatState) -> Self {
        Self {
            start_len: state.transcript().len(),
            streamed_text: String::new(),
            streamed: false,
            finished: false,
            last_status: None,
        }
    }

    fn update(&mut self, state: &ChatState) {
        if let Some(status) = state.status() {
            if self.last_status.as_deref() != Some(status) {
                eprintln!("… {status}");
                self.last_status = Some(status.to_string());
            }
        }

        if let Some(pending) = state.transcript().pending() {
            if !self.streamed {
                print!("assistant> ");
                self.streamed = true;
            }
            if let Some(delta) = pending.content.get(self.streamed_text.len()..) {
                print!("{delta}");
            }
            self.streamed_text.clone_from(&pending.content);
            std::io::stdout().flush().ok();
            return;
        }

        if self.finished || (state.is_sending() && state.phase() != SendPhase::Finalizing) {
            return;
        }
        self.finished = true;

        if self.streamed {
            println!("\n");
        }
        if let Some(reply) = self.reply_to_print(state) {
            print_message(reply);
        }
    }

    /// The confirmed reply of this send, unless streaming already showed it verbatim.
    fn reply_to_print<'a>(&self, state: &'a ChatState) -> Option<&'a Message> {
        state
            .transcript()
            .messages()
            .skip(self.start_len)
            .filter(|m| m.role == MessageRole::Assistant)
            .last()
            .filter(|m| !self.streamed || m.content != self.streamed_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prd_studio::stream::StreamEvent;

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

    fn render(events: Vec<StreamEvent>) -> (Renderer, ChatState) {
        let mut state = ChatState::new("c1", vec![]);
        state.input = Draft::text("Add a login page");
        let mut renderer = Renderer::new(&state);
        state.begin_send().unwrap();
        for event in events {
            state.apply(event).unwrap();
            renderer.update(&state);
        }
        (renderer, state)
    }

    #[test]
    fn blank_one_shot_message_is_rejected() {
        assert!(matches!(
            required_text(Some("   ".into())),
            Err(AppError::EmptyField { ref field_name }) if field_name == "message"
        ));
        assert!(matches!(required_text(None), Err(AppError::EmptyField { .. })));
        assert_eq!(required_text(Some(" hi ".into())).unwrap(), "hi");
    }

    #[test]
    fn final_message_matching_the_stream_is_not_repeated() {
        let (renderer, state) = render(vec![
            StreamEvent::UserMessage(message("m1", MessageRole::User, "Add a login page", 1)),
            StreamEvent::Chunk { text: "Sure.".into() },
            StreamEvent::AssistantMessage(message("m2", MessageRole::Assistant, "Sure.", 2)),
            StreamEvent::Done,
        ]);
        assert!(renderer.finished);
        assert!(renderer.reply_to_print(&state).is_none());
    }

    #[test]
    fn final_message_differing_from_the_stream_is_printed() {
        let (renderer, state) = render(vec![
            StreamEvent::UserMessage(message("m1", MessageRole::User, "Add a login page", 1)),
            StreamEvent::Chunk { text: "Sure".into() },
            StreamEvent::AssistantMessage(message("m2", MessageRole::Assistant, "Sure, here is a plan.", 2)),
            StreamEvent::Done,
        ]);
        assert_eq!(renderer.streamed_text, "Sure");
        let reply = renderer.reply_to_print(&state).unwrap();
        assert_eq!(reply.id, "m2");
    }

    #[test]
    fn unstreamed_reply_is_printed_whole() {
        let (renderer, state) = render(vec![
            StreamEvent::UserMessage(message("m1", MessageRole::User, "Add a login page", 1)),
            StreamEvent::AssistantMessage(message("m2", MessageRole::Assistant, "Done.", 2)),
            StreamEvent::Done,
        ]);
        assert!(!renderer.streamed);
        assert_eq!(renderer.reply_to_print(&state).map(|m| m.id.as_str()), Some("m2"));
    }
}
