use anyhow::Result;

use prd_studio::api::ApiClient;
use prd_studio::models::{Project, ProjectCreate, ProjectUpdate};

use super::format_time;
use crate::cli::ProjectCommands;

pub async fn run(client: &ApiClient, command: ProjectCommands) -> Result<()> {
    match command {
        ProjectCommands::List => {
            let projects = client.list_projects().await?;
            if projects.is_empty() {
                println!("No projects yet. Create one with `projects create <name>`.");
            }
            for project in &projects {
                println!(
                    "{}  {}  (updated {})",
                    project.id,
                    project.name,
                    format_time(&project.updated_at)
                );
            }
        }
        ProjectCommands::Create { name, description } => {
            let project = client
                .create_project(&ProjectCreate { name, description })
                .await?;
            println!("Created project {}", project.id);
        }
        ProjectCommands::Show { id } => print_project(&client.get_project(&id).await?),
        ProjectCommands::Update { id, name, description } => {
            if name.is_none() && description.is_none() {
                anyhow::bail!("Nothing to update: pass --name and/or --description");
            }
            let project = client
                .update_project(&id, &ProjectUpdate { name, description })
                .await?;
            print_project(&project);
        }
        ProjectCommands::Delete { id } => {
            client.delete_project(&id).await?;
            println!("Deleted project {id}");
        }
    }
    Ok(())
}

fn print_project(project: &Project) {
    println!("{}", project.name);
    println!("  id:       {}", project.id);
    if let Some(description) = project.description.as_deref().filter(|d| !d.is_empty()) {
        println!("  about:    {description}");
    }
    println!("  created:  {}", format_time(&project.created_at));
    println!("  updated:  {}", format_time(&project.updated_at));
    if let Some(at) = &project.last_conversation_at {
        println!("  last chat: {}", format_time(at));
    }
}
