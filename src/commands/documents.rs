use anyhow::{Context, Result};
use tracing::info;

use prd_studio::api::ApiClient;
use prd_studio::models::{PrdDraft, SectionStatus};

use crate::cli::{ExportArgs, PrdCommands, WireframeArgs};

pub async fn export(client: &ApiClient, args: ExportArgs) -> Result<()> {
    let include_kb = !args.without_knowledge_base;

    let Some(output) = args.output else {
        let preview = client.export_prd(&args.conversation_id, include_kb).await?;
        println!("{}", preview.content);
        eprintln!("(suggested file name: {})", preview.filename);
        return Ok(());
    };

    let bytes = client
        .download_prd(&args.conversation_id, args.format, include_kb)
        .await?;
    let output = if output.extension().is_none() {
        output.with_extension(args.format.extension())
    } else {
        output
    };
    tokio::fs::write(&output, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(path = %output.display(), size = bytes.len(), "PRD exported");
    println!("Wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

pub async fn prd(client: &ApiClient, command: PrdCommands) -> Result<()> {
    let draft = match command {
        PrdCommands::Outline { conversation_id } => client.generate_prd_outline(&conversation_id).await?,
        PrdCommands::Show { conversation_id } => client.get_prd_draft(&conversation_id).await?,
        PrdCommands::Edit { conversation_id, section, content } => {
            client
                .update_prd_section(&conversation_id, &section, &content)
                .await?
        }
        PrdCommands::Regenerate { conversation_id, section } => {
            client
                .regenerate_prd_section(&conversation_id, &section)
                .await?
        }
    };
    print_draft(&draft);
    Ok(())
}

pub async fn wireframe(client: &ApiClient, args: WireframeArgs) -> Result<()> {
    let wireframe = client
        .generate_wireframe(&args.conversation_id, args.device, &args.reference_file_ids)
        .await?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, wireframe.html_content.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} wireframe to {}", wireframe.device_type, path.display());
        }
        None => println!("{}", wireframe.html_content),
    }
    Ok(())
}

fn print_draft(draft: &PrdDraft) {
    println!("PRD draft v{}", draft.version);
    for (key, section) in &draft.sections {
        let marker = match section.status {
            SectionStatus::Completed => "✓",
            SectionStatus::Draft => "~",
            SectionStatus::Outline => "·",
            SectionStatus::Empty | SectionStatus::Unknown => " ",
        };
        println!("\n[{marker}] {} ({key})", section.title);
        if !section.content.is_empty() {
            println!("{}", section.content);
        }
    }
}
