use anyhow::Result;

use prd_studio::progress::{
    estimate_analysis_time, estimate_knowledge_build_time, estimate_upload_time, format_duration,
};
use prd_studio::upload::mime_for_path;

use crate::cli::EstimateCommands;

pub async fn run(command: EstimateCommands) -> Result<()> {
    match command {
        EstimateCommands::Upload { paths } => {
            let mut total_upload = 0;
            let mut total_analysis = 0;
            for path in &paths {
                let size_mb = tokio::fs::metadata(path).await?.len() as f64 / (1024.0 * 1024.0);
                let file_type = mime_for_path(path).unwrap_or("unknown");
                let upload = estimate_upload_time(size_mb);
                let analysis = estimate_analysis_time(file_type, size_mb);
                total_upload += upload;
                total_analysis += analysis;
                println!(
                    "{:<40} {:>8.1} MB  upload {:<10} analysis {}",
                    path.display(),
                    size_mb,
                    format_duration(upload),
                    format_duration(analysis)
                );
            }
            println!(
                "Total: upload {}, analysis {}",
                format_duration(total_upload),
                format_duration(total_analysis)
            );
        }
        EstimateCommands::Build { file_count } => {
            println!(
                "Knowledge base build for {file_count} files: about {}",
                format_duration(estimate_knowledge_build_time(file_count))
            );
        }
    }
    Ok(())
}
