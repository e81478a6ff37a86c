//! Interactive review loop over the generated cards.

use std::borrow::Cow::{self, Owned};

use anyhow::Result;
use colored::Colorize;
use forge_application::ForgeSession;
use forge_core::{CardField, CardType, Flashcard, WorkflowStep};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

pub type ReviewEditor = Editor<ReviewHelper, DefaultHistory>;

pub fn editor() -> Result<ReviewEditor> {
    let mut editor = ReviewEditor::new()?;
    editor.set_helper(Some(ReviewHelper));
    Ok(editor)
}

/// Shows argument hints for the review commands.
pub struct ReviewHelper;

impl Helper for ReviewHelper {}

impl Completer for ReviewHelper {
    type Candidate = String;
}

impl Highlighter for ReviewHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }
}

impl Hinter for ReviewHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let hint = match &line[..pos] {
            "e" => " [front|back|type <text>]",
            "m" => " <instruction for the AI>",
            "g" => " <card number>",
            _ => return None,
        };
        Some(hint.to_string())
    }
}

impl Validator for ReviewHelper {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Every card was accepted or rejected.
    Finalized,
    /// The reviewer went back home.
    Home,
    Quit,
}

#[derive(Debug, PartialEq)]
enum ReviewCommand {
    Accept,
    Reject,
    Edit(CardField, String),
    EditInteractive,
    Amend(String),
    Goto(usize),
    List,
    Home,
    Quit,
    Help,
}

fn parse_command(line: &str) -> Result<ReviewCommand, String> {
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "a" => Ok(ReviewCommand::Accept),
        "r" => Ok(ReviewCommand::Reject),
        "l" => Ok(ReviewCommand::List),
        "h" => Ok(ReviewCommand::Home),
        "q" => Ok(ReviewCommand::Quit),
        "?" | "help" => Ok(ReviewCommand::Help),
        "e" if rest.is_empty() => Ok(ReviewCommand::EditInteractive),
        "e" => {
            let (field, value) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: e front|back|type <text>")?;
            Ok(ReviewCommand::Edit(field.parse()?, value.trim().to_string()))
        }
        "m" if !rest.is_empty() => Ok(ReviewCommand::Amend(rest.to_string())),
        "m" => Err("usage: m <instruction for the AI>".to_string()),
        "g" => match rest.parse::<usize>() {
            Ok(number) if number > 0 => Ok(ReviewCommand::Goto(number - 1)),
            _ => Err("usage: g <card number>, starting at 1".to_string()),
        },
        other => Err(format!("unknown command '{other}' (type ? for help)")),
    }
}

/// Runs the loop until the review reaches Finalizing or the user leaves.
pub async fn run(session: &mut ForgeSession, editor: &mut ReviewEditor) -> Result<ReviewOutcome> {
    print_help();
    print_current(session);

    while session.workflow().step() == WorkflowStep::Reviewing {
        let prompt = format!(
            "[{}/{}] > ",
            session.workflow().cursor() + 1,
            session.workflow().cards().len()
        );
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'q' to quit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => return Ok(ReviewOutcome::Quit),
            Err(err) => return Err(err.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(trimmed);

        let command = match parse_command(trimmed) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message.red());
                continue;
            }
        };

        match command {
            ReviewCommand::Accept => {
                session.workflow_mut().accept()?;
            }
            ReviewCommand::Reject => {
                session.workflow_mut().reject()?;
                println!("{}", "Rejected.".red());
            }
            ReviewCommand::Edit(field, value) => {
                let workflow = session.workflow_mut();
                match workflow.edit_current(field, &value) {
                    Ok(()) => {
                        workflow.finish_edit();
                        print_current(session);
                    }
                    Err(err) => eprintln!("{}", err.user_message().red()),
                }
                continue;
            }
            ReviewCommand::EditInteractive => {
                edit_interactively(session, editor)?;
                print_current(session);
                continue;
            }
            ReviewCommand::Amend(instruction) => {
                println!("{}", "Asking the AI to amend this card...".bright_black());
                if session.amend_current(&instruction).await.is_err() {
                    let message = session.workflow().message().unwrap_or("Amendment failed");
                    eprintln!("{}", message.red());
                    session.workflow_mut().dismiss_message();
                }
                print_current(session);
                continue;
            }
            ReviewCommand::Goto(index) => {
                if let Err(err) = session.workflow_mut().navigate(index) {
                    eprintln!("{}", err.to_string().red());
                    continue;
                }
            }
            ReviewCommand::List => {
                print_list(session);
                continue;
            }
            ReviewCommand::Home => {
                session.workflow_mut().go_home();
                return Ok(ReviewOutcome::Home);
            }
            ReviewCommand::Quit => return Ok(ReviewOutcome::Quit),
            ReviewCommand::Help => {
                print_help();
                continue;
            }
        }

        print_current(session);
    }

    Ok(ReviewOutcome::Finalized)
}

/// Prompts for front and back with the current text pre-filled.
///
/// An unchanged or empty answer keeps the field; Ctrl-C or Ctrl-D stops
/// editing the remaining fields.
fn edit_interactively(session: &mut ForgeSession, editor: &mut ReviewEditor) -> Result<()> {
    session.workflow_mut().start_edit()?;
    let Some(card) = session.workflow().current_card().cloned() else {
        session.workflow_mut().finish_edit();
        return Ok(());
    };

    let fields = [
        (CardField::Front, "Front: ", card.front.as_str()),
        (CardField::Back, "Back: ", card.back.as_str()),
    ];
    for (field, label, current) in fields {
        let line = match editor.readline_with_initial(label, (current, "")) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => {
                session.workflow_mut().finish_edit();
                return Err(err.into());
            }
        };
        if line.trim().is_empty() || line == current {
            continue;
        }
        if let Err(err) = session.workflow_mut().edit_current(field, &line) {
            eprintln!("{}", err.user_message().red());
        }
    }

    session.workflow_mut().finish_edit();
    Ok(())
}

fn print_help() {
    println!("{}", "=== Review ===".bright_magenta().bold());
    println!(
        "{}",
        "a accept | r reject | e [<field> <text>] edit | m <instruction> amend | g <n> go to | l list | h home | q quit"
            .bright_black()
    );
}

fn print_current(session: &ForgeSession) {
    let workflow = session.workflow();
    let Some(card) = workflow.current_card() else {
        return;
    };
    println!();
    println!(
        "{} {}",
        format!("Card {}/{}", workflow.cursor() + 1, workflow.cards().len())
            .bright_magenta()
            .bold(),
        type_label(card).bright_black()
    );
    println!("{} {}", "Q:".bright_cyan(), card.front);
    println!("{} {}", "A:".bright_green(), card.back);
}

fn print_list(session: &ForgeSession) {
    let workflow = session.workflow();
    for (index, card) in workflow.cards().iter().enumerate() {
        let marker = if index == workflow.cursor() { ">" } else { " " };
        let line = format!("{marker} {:>2}. {}", index + 1, card.front);
        if card.is_deleted {
            println!("{}", line.red().strikethrough());
        } else {
            println!("{line}");
        }
    }
}

fn type_label(card: &Flashcard) -> String {
    match card.card_type {
        CardType::Basic => "[Basic]".to_string(),
        CardType::BasicTyping => "[Type in the answer]".to_string(),
    }
}
