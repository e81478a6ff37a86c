use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use forge_core::Topic;
use forge_core::prompt_store::PromptStore;

use super::AppContext;

pub async fn show(context: &AppContext, topic: Topic) -> Result<()> {
    let store = context.prompt_store();
    let label = match store.get_override(topic).await? {
        Some(_) => "custom",
        None => "built-in",
    };
    println!("{}", format!("== {topic} ({label}) ==").bright_magenta().bold());
    println!("{}", store.instruction_for(topic).await?);
    Ok(())
}

pub async fn set(context: &AppContext, topic: Topic, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if content.trim().is_empty() {
        anyhow::bail!("{} is empty", file.display());
    }
    context.config().limits.check_instruction(&content)?;

    context.prompt_store().save_override(topic, &content).await?;
    println!("{}", format!("Saved custom instruction for {topic}").green());
    Ok(())
}

pub async fn clear(context: &AppContext, topic: Topic) -> Result<()> {
    context.prompt_store().clear_override(topic).await?;
    println!("{}", format!("{topic} uses the built-in instruction again").green());
    Ok(())
}

pub async fn backups(context: &AppContext, topic: Topic) -> Result<()> {
    let backups = context.prompt_store().list_backups(topic).await?;
    if backups.is_empty() {
        println!("{}", format!("No backups for {topic}").bright_black());
        return Ok(());
    }

    for (index, backup) in backups.iter().enumerate() {
        let first_line = backup.content.lines().next().unwrap_or_default();
        println!(
            "{:>2}. {}  {}",
            index + 1,
            backup.timestamp.bright_black(),
            first_line
        );
    }
    Ok(())
}

/// Restores backup `number`, counted from 1 like the `backups` listing.
pub async fn restore(context: &AppContext, topic: Topic, number: usize) -> Result<()> {
    let Some(index) = number.checked_sub(1) else {
        anyhow::bail!("Backup numbers start at 1");
    };
    let backup = context.prompt_store().restore_backup(topic, index).await?;
    println!(
        "{}",
        format!("Restored the {topic} instruction from {}", backup.timestamp).green()
    );
    Ok(())
}
