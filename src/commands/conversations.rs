use anyhow::Result;

use prd_studio::api::ApiClient;
use prd_studio::models::{Conversation, Message, MessageRole};

use super::{format_time, preview};
use crate::cli::ConversationCommands;

pub async fn run(client: &ApiClient, command: ConversationCommands) -> Result<()> {
    match command {
        ConversationCommands::List { project_id } => {
            let conversations = client.list_conversations(&project_id).await?;
            if conversations.is_empty() {
                println!("No conversations yet.");
            }
            for conv in &conversations {
                println!(
                    "{}  {:<40} {:<10} {}",
                    conv.id,
                    preview(conv.display_title(), 40),
                    conv.status.as_str(),
                    format_time(&conv.updated_at)
                );
            }
        }
        ConversationCommands::New { project_id, title } => {
            let conv = client
                .create_conversation(&project_id, title.as_deref())
                .await?;
            println!("Started conversation {}", conv.id);
        }
        ConversationCommands::Show { id } => {
            let detail = client.get_conversation(&id).await?;
            print_header(&detail.conversation);
            println!();
            for message in &detail.messages {
                print_message(message);
            }
        }
        ConversationCommands::Status { id, status, summarize } => {
            let conv = client
                .update_conversation_status(&id, status, summarize)
                .await?;
            println!("{} is now {}", conv.display_title(), conv.status.as_str());
            if let Some(summary) = &conv.requirement_summary {
                println!("\n{}\n{}", summary.title, summary.description);
                for point in &summary.key_points {
                    println!("  - {point}");
                }
            }
        }
        ConversationCommands::Rename { id, title } => {
            let conv = client.update_conversation_title(&id, &title).await?;
            println!("Renamed to \"{}\"", conv.display_title());
        }
        ConversationCommands::Delete { id } => {
            client.delete_conversation(&id).await?;
            println!("Deleted conversation {id}");
        }
    }
    Ok(())
}

pub(crate) fn print_header(conv: &Conversation) {
    println!("{} [{}]", conv.display_title(), conv.status.as_str());
    println!(
        "  started {}, {} messages",
        format_time(&conv.created_at),
        conv.message_count.unwrap_or_default()
    );
}

pub(crate) fn print_message(message: &Message) {
    let label = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
    };
    println!("{label}> {}\n", message.content);
}
