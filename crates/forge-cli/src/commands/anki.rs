use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use forge_application::SyncGateway;

use super::AppContext;

pub async fn ping(context: &AppContext) -> Result<()> {
    let client = context.anki_client()?;
    println!("Probing {}", client.endpoints().join(", ").bright_black());
    let gateway = SyncGateway::new(Arc::new(client));

    match gateway.ping().await {
        Ok(version) => {
            println!("{}", format!("AnkiConnect is reachable (API version {version})").green());
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", err.user_message().red());
            Err(err.into())
        }
    }
}

pub async fn decks(context: &AppContext) -> Result<()> {
    let decks = context.sync_gateway()?.deck_names().await?;
    let configured = &context.config().anki.deck;

    for deck in decks {
        if &deck == configured {
            println!("{} {}", deck.bold(), "(default)".bright_black());
        } else {
            println!("{deck}");
        }
    }
    Ok(())
}
