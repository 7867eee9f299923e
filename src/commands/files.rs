use anyhow::Result;
use tracing::warn;

use prd_studio::api::ApiClient;
use prd_studio::models::FileStatus;
use prd_studio::progress::{format_duration, ProgressCalculator};

use super::format_time;
use crate::cli::FileCommands;

pub async fn run(client: &ApiClient, command: FileCommands) -> Result<()> {
    match command {
        FileCommands::Upload { project_id, paths, analyze } => {
            let total = paths.len();
            let mut failed = 0;
            let mut progress = ProgressCalculator::new(total, None);
            for (index, path) in paths.iter().enumerate() {
                let result = client.upload_file(&project_id, path).await;
                progress.increment();
                let uploaded = match result {
                    Ok(file) => file,
                    Err(e) => {
                        failed += 1;
                        warn!(path = %path.display(), "Upload failed: {e}");
                        eprintln!("[{}/{total}] {}: {}", index + 1, path.display(), e.info().message);
                        continue;
                    }
                };
                println!("[{}/{total}] {} -> {}", index + 1, uploaded.filename, uploaded.id);
                if !progress.is_completed() {
                    eprintln!(
                        "        {}% done, about {} left",
                        progress.percent(),
                        format_duration(progress.estimated_remaining())
                    );
                }

                if analyze {
                    let result = client.analyze_file(&uploaded.id).await?;
                    println!("        analysis: {}", result.status);
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} of {total} uploads failed");
            }
        }
        FileCommands::List { project_id } => {
            let files = client.list_files(&project_id).await?;
            if files.is_empty() {
                println!("No files uploaded.");
            }
            for file in &files {
                println!(
                    "{}  {:<32} {:>10}  {:<10} {}",
                    file.id,
                    file.filename,
                    human_size(file.file_size),
                    status_label(file.status),
                    format_time(&file.created_at)
                );
            }
        }
        FileCommands::Analyze { file_id } => {
            let result = client.analyze_file(&file_id).await?;
            println!("{}: {}", result.status, result.message);
            if let Some(analysis) = result.analysis {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            }
        }
        FileCommands::Delete { file_id } => {
            client.delete_file(&file_id).await?;
            println!("Deleted file {file_id}");
        }
    }
    Ok(())
}

fn status_label(status: FileStatus) -> &'static str {
    match status {
        FileStatus::Pending => "pending",
        FileStatus::Analyzing => "analyzing",
        FileStatus::Completed => "analyzed",
        FileStatus::Failed => "failed",
        FileStatus::Unknown => "unknown",
    }
}

fn human_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let bytes = bytes as f64;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < KB * KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{:.1} MB", bytes / (KB * KB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }
}
