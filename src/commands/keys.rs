use anyhow::Result;

use prd_studio::keys::{mask_api_key, AiProvider, FileKeyStore, KeyStore};

use crate::cli::KeyCommands;

pub fn run(store: &FileKeyStore, command: KeyCommands) -> Result<()> {
    match command {
        KeyCommands::Show => {
            let keys = store.load()?;
            println!("Key file: {}", store.path().display());
            for provider in AiProvider::ALL {
                let marker = if provider == keys.default_provider() { "*" } else { " " };
                let shown = keys
                    .key_for(provider)
                    .map(mask_api_key)
                    .unwrap_or_else(|| "(not set)".to_string());
                println!("{marker} {provider:<9} {shown}");
            }
            if !keys.has_any_key() {
                println!("\nRequests use the service's own provider configuration.");
            }
        }
        KeyCommands::Set { provider, key } => {
            let mut keys = store.load()?;
            keys.set_key(provider, Some(key.trim().to_string()));
            if keys.default_provider.is_none() {
                keys.default_provider = Some(provider);
            }
            store.save(&keys)?;
            println!("Stored {provider} key");
        }
        KeyCommands::Remove { provider } => {
            let mut keys = store.load()?;
            keys.set_key(provider, None);
            store.save(&keys)?;
            println!("Removed {provider} key");
        }
        KeyCommands::Default { provider } => {
            let mut keys = store.load()?;
            keys.default_provider = Some(provider);
            store.save(&keys)?;
            if !keys.has_key(provider) {
                eprintln!("Note: no key stored for {provider} yet");
            }
            println!("Default provider set to {provider}");
        }
        KeyCommands::Clear => {
            store.clear()?;
            println!("All keys removed");
        }
    }
    Ok(())
}
