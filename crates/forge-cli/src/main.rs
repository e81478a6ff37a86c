use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use forge_core::Topic;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "card-forge")]
#[command(about = "Card Forge - turn notes into reviewed Anki flashcards", long_about = None)]
struct Cli {
    /// Directory holding config.toml, secret.json and prompt overrides
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate flashcards from notes and review them
    Generate(commands::generate::GenerateArgs),
    /// Check that AnkiConnect is reachable
    Ping,
    /// List the decks known to Anki
    Decks,
    /// Manage topic instruction overrides
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },
}

#[derive(Subcommand)]
enum PromptsAction {
    /// Print the instruction currently used for a topic
    Show { topic: Topic },
    /// Replace a topic's instruction with the contents of a file
    Set { topic: Topic, file: PathBuf },
    /// Go back to the built-in instruction
    Clear { topic: Topic },
    /// List saved backups, most recent first
    Backups { topic: Topic },
    /// Make a backup (numbered as in `backups`, 1 is the most recent) the
    /// current instruction
    Restore { topic: Topic, number: usize },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,forge_application=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let context = commands::AppContext::load(cli.config_dir.as_deref())?;

    match cli.command {
        Commands::Generate(args) => commands::generate::run(&context, args).await?,
        Commands::Ping => commands::anki::ping(&context).await?,
        Commands::Decks => commands::anki::decks(&context).await?,
        Commands::Prompts { action } => match action {
            PromptsAction::Show { topic } => commands::prompts::show(&context, topic).await?,
            PromptsAction::Set { topic, file } => {
                commands::prompts::set(&context, topic, &file).await?
            }
            PromptsAction::Clear { topic } => commands::prompts::clear(&context, topic).await?,
            PromptsAction::Backups { topic } => {
                commands::prompts::backups(&context, topic).await?
            }
            PromptsAction::Restore { topic, number } => {
                commands::prompts::restore(&context, topic, number).await?
            }
        },
    }

    Ok(())
}
