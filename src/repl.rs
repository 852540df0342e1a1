//! Interactive line-based chat loop.

use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use crate::commands::{self, ReplAction};
use crate::driver::{RunDriver, TurnOutcome};
use crate::logging;
use crate::palette;
use crate::session::Session;
use crate::ui_text::ReplyLocale;

const PROMPT: &str = "› ";

// === Line Editor ===

/// Tab-completes slash command names.
struct ReplHelper;

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        if !head.starts_with('/') || head.contains(' ') {
            return Ok((pos, Vec::new()));
        }
        let candidates = commands::commands_matching(head)
            .into_iter()
            .map(|cmd| Pair {
                display: cmd.usage.to_string(),
                replacement: if cmd.requires_argument() {
                    format!("/{} ", cmd.name)
                } else {
                    format!("/{}", cmd.name)
                },
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Highlighter for ReplHelper {}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}

// === Loop ===

/// Run the chat loop until `/exit`, Ctrl-D or Ctrl-C.
pub async fn run(driver: &RunDriver, session: &mut Session) -> Result<()> {
    let mut editor: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
    editor.set_helper(Some(ReplHelper));

    print_banner(driver).await;

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        if input.starts_with('/') {
            let result = commands::execute(input, session, driver).await;
            if let Some(message) = &result.message {
                if result.is_error {
                    println!("{}", palette::warning(message));
                } else {
                    println!("{message}");
                }
            }
            if result.action == Some(ReplAction::Quit) {
                break;
            }
            continue;
        }

        let outcome = submit_with_spinner(driver, session, input).await;
        print_outcome(&outcome, driver.locale());
    }

    logging::info("Chat session ended");
    Ok(())
}

/// Submit one turn while a spinner runs on stderr.
pub async fn submit_with_spinner(
    driver: &RunDriver,
    session: &mut Session,
    prompt: &str,
) -> TurnOutcome {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(driver.locale().thinking());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = driver.submit_turn(session, prompt).await;

    spinner.finish_and_clear();
    outcome
}

/// Print replies to stdout and notices in the same channel, colored by severity.
pub fn print_outcome(outcome: &TurnOutcome, locale: ReplyLocale) {
    if let TurnOutcome::Replied(replies) = outcome {
        for reply in replies {
            println!("{}", palette::assistant_label(locale.assistant_label()));
            println!("{reply}");
            println!();
        }
        return;
    }

    let Some(notice) = outcome.notice(locale) else {
        return;
    };
    match outcome.error_envelope() {
        Some(envelope) => {
            println!("{}", palette::by_severity(&notice, envelope.severity));
            if logging::is_verbose() {
                println!("{}", palette::muted(&envelope.summary()));
            }
        }
        None => println!("{}", palette::warning(&notice)),
    }
}

async fn print_banner(driver: &RunDriver) {
    println!("{}", palette::title("lexcite"));
    match driver.gateway().get_assistant(driver.assistant_id()).await {
        Ok(assistant) => {
            println!(
                "{}",
                palette::muted(&format!(
                    "{} ({})",
                    assistant.display_name(),
                    assistant.model.as_deref().unwrap_or("unknown model")
                ))
            );
            if !assistant.has_file_search() {
                logging::warn(format!(
                    "Assistant {} does not have the file_search tool enabled",
                    assistant.id
                ));
                println!(
                    "{} {}",
                    palette::warn_mark(),
                    palette::warning("file_search is not enabled; citations may be missing.")
                );
            }
        }
        Err(err) => {
            logging::warn(format!("Could not load assistant details: {err}"));
        }
    }
    println!(
        "{}",
        palette::muted("Type /help for commands, /exit to quit.")
    );
    println!();
}
