use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use clap::Args;
use colored::Colorize;
use forge_application::{ForgeSession, GenerationParams};
use forge_core::limits::ImagePayload;
use forge_core::{ForgeError, Topic, WorkflowStep};

use super::AppContext;
use super::review::{self, ReviewEditor, ReviewOutcome};

#[derive(Args)]
pub struct GenerateArgs {
    /// Notes or instructions to turn into cards
    #[arg(long, conflicts_with = "file")]
    notes: Option<String>,

    /// Read notes from a file (stdin is read when neither is given)
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Image to send alongside the notes
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,

    #[arg(long, default_value = "general")]
    topic: Topic,

    /// Use the capable model with a large reasoning budget
    #[arg(long)]
    deep: bool,

    /// Model for plain-text generation (defaults to config)
    #[arg(long)]
    model: Option<String>,

    /// Target deck (defaults to config)
    #[arg(long)]
    deck: Option<String>,

    /// Accept every card without the interactive review
    #[arg(long)]
    accept_all: bool,

    /// Send the accepted cards to Anki without asking
    #[arg(long)]
    sync: bool,
}

pub async fn run(context: &AppContext, args: GenerateArgs) -> Result<()> {
    let notes = read_notes(&args)?;
    let image = args.image.as_deref().map(load_image).transpose()?;

    let deck = args
        .deck
        .clone()
        .unwrap_or_else(|| context.config().anki.deck.clone());
    let mut session = ForgeSession::new(
        context.flashcard_gateway()?,
        context.sync_gateway()?,
        deck,
    );

    println!("{}", "Generating flashcards...".bright_black());
    let params = GenerationParams {
        notes,
        topic: args.topic,
        image,
        deep_reasoning: args.deep,
        model: args.model.clone(),
    };
    let step = match session.generate(params).await {
        Ok(step) => step,
        Err(err) => anyhow::bail!(err.user_message()),
    };
    if step != WorkflowStep::Reviewing {
        let message = session
            .workflow()
            .message()
            .unwrap_or("Generation failed")
            .to_string();
        anyhow::bail!(message);
    }
    println!(
        "{}",
        format!("{} cards generated", session.workflow().cards().len()).green()
    );

    let mut editor = review::editor()?;
    if args.accept_all {
        while session.workflow().step() == WorkflowStep::Reviewing {
            session.workflow_mut().accept()?;
        }
    } else if review::run(&mut session, &mut editor).await? != ReviewOutcome::Finalized {
        println!("{}", "Review ended without syncing.".bright_black());
        return Ok(());
    }

    finalize(&mut session, &mut editor, args.sync).await
}

async fn finalize(session: &mut ForgeSession, editor: &mut ReviewEditor, sync: bool) -> Result<()> {
    let workflow = session.workflow();
    println!(
        "{}",
        format!(
            "{} cards kept, {} rejected",
            workflow.live_count(),
            workflow.rejected_count()
        )
        .bright_magenta()
        .bold()
    );
    for card in workflow.live_cards() {
        println!("  {} {}", "-".bright_black(), card.front);
    }
    if workflow.live_count() == 0 {
        println!("{}", "Nothing to send.".bright_black());
        return Ok(());
    }

    if !sync {
        let question = format!(
            "Send {} cards to deck '{}'? [y/N] ",
            workflow.live_count(),
            session.deck()
        );
        let answer = editor.readline(&question)?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("{}", "Cards were not sent.".bright_black());
            return Ok(());
        }
    }

    loop {
        match session.sync().await {
            Ok(WorkflowStep::Done) => {
                println!(
                    "{}",
                    format!("Added {} notes to '{}'", session.workflow().live_count(), session.deck())
                        .green()
                );
                return Ok(());
            }
            Ok(_) | Err(ForgeError::NotConnected) => {
                let message = session.workflow().message().unwrap_or("Sync failed");
                eprintln!("{}", message.red());
            }
            Err(err) => return Err(err.into()),
        }

        let answer = editor.readline("Retry? [y/N] ")?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            anyhow::bail!("Cards were not sent to Anki");
        }
        session.workflow_mut().dismiss_message();
    }
}

fn read_notes(args: &GenerateArgs) -> Result<String> {
    if let Some(notes) = &args.notes {
        return Ok(notes.clone());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }

    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut notes = String::new();
    stdin
        .lock()
        .read_to_string(&mut notes)
        .context("Failed to read notes from stdin")?;
    Ok(notes)
}

/// Reads an image file into a base64 payload with a guessed MIME type.
fn load_image(path: &Path) -> Result<ImagePayload> {
    let mime = mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_().as_str() == "image")
        .with_context(|| format!("{} does not look like an image", path.display()))?;

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ImagePayload::new(
        mime.essence_str(),
        BASE64_STANDARD.encode(bytes),
    ))
}
