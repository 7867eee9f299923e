use anyhow::Result;

use prd_studio::api::ApiClient;
use prd_studio::keys::{FileKeyStore, KeyStore};

use crate::cli::AiCommands;

pub async fn run(client: &ApiClient, store: &FileKeyStore, command: AiCommands) -> Result<()> {
    match command {
        AiCommands::Providers => {
            let list = client.list_providers().await?;
            for provider in &list.providers {
                let marker = if provider.name == list.current_provider { "*" } else { " " };
                let availability = if provider.available { "available" } else { "unavailable" };
                println!("{marker} {:<10} {:<28} {availability}", provider.name, provider.model);
            }
        }
        AiCommands::Current => {
            let current = client.current_provider().await?;
            println!("{} ({})", current.provider_name, current.model_name);
        }
        AiCommands::Select { provider } => {
            client.select_provider(provider).await?;
            println!("Service now uses {provider}");
        }
        AiCommands::Test { provider, key } => {
            let key = match key {
                Some(key) => key,
                None => store
                    .load()?
                    .key_for(provider)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("No stored key for {provider}; pass one or run `keys set`"))?,
            };
            let result = client.test_api_key(provider, &key).await?;
            if result.success {
                let model = result.model_name.unwrap_or_default();
                println!("Key works for {provider} {model}");
            } else {
                let reason = result.error.unwrap_or(result.message);
                anyhow::bail!("Key rejected by {provider}: {reason}");
            }
        }
    }
    Ok(())
}
