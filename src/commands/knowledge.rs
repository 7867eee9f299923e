use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use prd_studio::api::ApiClient;
use prd_studio::knowledge::KnowledgeBaseData;
use prd_studio::models::{FileStatus, KnowledgeBase, SearchFilters};
use prd_studio::progress::{estimate_knowledge_build_time, format_duration, KnowledgeBuildProgress};

use super::{format_time, preview};
use crate::cli::KnowledgeCommands;

pub async fn run(client: &ApiClient, command: KnowledgeCommands) -> Result<()> {
    match command {
        KnowledgeCommands::Build { project_id, file_ids } => build(client, &project_id, file_ids).await,
        KnowledgeCommands::Show { project_id, raw } => {
            let kb = client.get_knowledge(&project_id).await?;
            if raw {
                println!("{}", serde_json::to_string_pretty(&kb.structured_data)?);
            } else {
                print_knowledge(&kb);
            }
            Ok(())
        }
        KnowledgeCommands::Update { project_id, json_file, notes } => {
            let content = tokio::fs::read_to_string(&json_file)
                .await
                .with_context(|| format!("Failed to read {}", json_file.display()))?;
            let data: KnowledgeBaseData = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a knowledge base document", json_file.display()))?;
            let kb = client
                .update_knowledge(&project_id, &data, notes.as_deref())
                .await?;
            println!("Knowledge base updated to version {}", kb.version);
            Ok(())
        }
        KnowledgeCommands::Confirm { project_id, by } => {
            let kb = client.confirm_knowledge(&project_id, &by).await?;
            println!("Knowledge base v{} confirmed by {by}", kb.version);
            Ok(())
        }
        KnowledgeCommands::Search { project_id, query, module, kind } => {
            let filters = SearchFilters { module, kind };
            let response = client.search_knowledge(&project_id, &query, &filters).await?;
            println!("{} results for \"{}\"", response.total, response.query);
            for result in &response.results {
                println!(
                    "  [{:?}] {} ({:.2})",
                    result.kind, result.title, result.relevance_score
                );
                if !result.description.is_empty() {
                    println!("      {}", preview(&result.description, 100));
                }
            }
            Ok(())
        }
    }
}

async fn build(client: &ApiClient, project_id: &str, file_ids: Vec<String>) -> Result<()> {
    let file_ids = if file_ids.is_empty() {
        client
            .list_files(project_id)
            .await?
            .into_iter()
            .filter(|f| f.status == FileStatus::Completed)
            .map(|f| f.id)
            .collect()
    } else {
        file_ids
    };
    if file_ids.is_empty() {
        anyhow::bail!("No analyzed files to build from; upload and analyze files first");
    }

    let estimate = estimate_knowledge_build_time(file_ids.len());
    info!(project_id, files = file_ids.len(), estimate, "Building knowledge base");
    eprintln!(
        "Building from {} files, about {}",
        file_ids.len(),
        format_duration(estimate)
    );

    let progress = KnowledgeBuildProgress::new(estimate);
    let request = client.build_knowledge(project_id, &file_ids);
    tokio::pin!(request);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    let kb = loop {
        tokio::select! {
            result = &mut request => break result?,
            _ = ticker.tick() => {
                eprint!(
                    "\r{:>3}%  {:<30} {} left   ",
                    progress.percent(),
                    progress.stage().label(),
                    format_duration(progress.remaining_secs())
                );
                std::io::stderr().flush().ok();
            }
        }
    };
    eprintln!("\r100%  done{:<40}", "");

    print_knowledge(&kb);
    Ok(())
}

fn print_knowledge(kb: &KnowledgeBase) {
    let data = &kb.structured_data;
    println!(
        "Knowledge base v{} ({:?}), updated {}",
        kb.version,
        kb.status,
        format_time(&kb.updated_at)
    );
    if let (Some(by), Some(at)) = (&kb.confirmed_by, &kb.confirmed_at) {
        println!("Confirmed by {by} on {}", format_time(at));
    }

    if let Some(description) = data.description() {
        println!("\n{description}");
    }

    let modules = data.module_names();
    if !modules.is_empty() {
        println!("\nModules: {}", modules.join(", "));
    }
    for module in &data.feature_modules {
        println!("  {} ({} features)", module.module_name, module.features.len());
        for feature in &module.features {
            println!("    - {} [{}]", feature.name, feature.status);
        }
    }

    if let Some(ui) = data.ui() {
        if let Some(library) = &ui.component_library {
            println!("\nUI library: {library}");
        }
        if !ui.primary_colors.is_empty() {
            println!("Colors: {}", ui.primary_colors.join(", "));
        }
    }

    if !data.completed_requirements.is_empty() {
        println!("\nCompleted requirements:");
        for req in &data.completed_requirements {
            println!("  - {}", req.title);
        }
    }

    if !data.pending_questions.is_empty() {
        println!("\nOpen questions:");
        for q in &data.pending_questions {
            println!("  ? {}", q.question);
        }
    }
}
