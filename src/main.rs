//! CLI entry point for `lexcite`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use dotenvy::dotenv;

mod citations;
mod client;
mod commands;
mod config;
mod documents;
mod driver;
mod error_taxonomy;
mod gateway;
mod logging;
mod models;
mod palette;
mod prompts;
mod repl;
mod session;
#[cfg(test)]
mod test_support;
mod ui_text;

use crate::client::AssistantsClient;
use crate::config::Config;
use crate::documents::UploadOutcome;
use crate::driver::{RunDriver, TurnOutcome};
use crate::error_taxonomy::{ErrorCategory, ErrorEnvelope};
use crate::gateway::AssistantGateway;
use crate::session::Session;

#[derive(Parser, Debug)]
#[command(
    name = "lexcite",
    author,
    version,
    about = "Chat with a document-search assistant, with footnoted citations",
    long_about = "Terminal client for a hosted assistant (Assistants API v2).\n\nUpload documents, ask questions, and read answers whose citations are rewritten as numbered footnotes.\n\nJust run 'lexcite' to start chatting."
)]
struct Cli {
    /// Subcommand to run (defaults to `chat`)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Config profile name
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// Send a single prompt and print the reply
    Ask {
        /// Prompt to send to the assistant
        prompt: String,
        /// Upload a document before asking (repeatable)
        #[arg(short, long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,
    },
    /// Check configuration and the configured assistant
    Doctor,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command.clone().unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let config = load_config_from_cli(&cli)?;
            let driver = build_driver(&config)?;
            let mut session = Session::new();
            repl::run(&driver, &mut session).await
        }
        Commands::Ask { prompt, files } => {
            let config = load_config_from_cli(&cli)?;
            run_one_shot(&config, &prompt, &files).await
        }
        Commands::Doctor => {
            run_doctor(&cli).await;
            Ok(())
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
}

fn load_config_from_cli(cli: &Cli) -> Result<Config> {
    Config::load(cli.config.clone(), cli.profile.as_deref())
}

/// Missing credentials stop the program here, before any request is made.
fn build_driver(config: &Config) -> Result<RunDriver> {
    let client = AssistantsClient::new(config)?;
    RunDriver::from_config(Arc::new(client), config)
}

/// Generate shell completions for the given shell
fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

async fn run_one_shot(config: &Config, prompt: &str, files: &[PathBuf]) -> Result<()> {
    let driver = build_driver(config)?;
    let locale = driver.locale();
    let mut session = Session::new();

    for path in files {
        let outcome = documents::upload_path(&mut session, driver.gateway(), path)
            .await
            .with_context(|| format!("Failed to upload {}", path.display()))?;
        match outcome {
            UploadOutcome::Uploaded(doc) => eprintln!(
                "{} {}",
                palette::ok_mark(),
                locale.uploaded_notice(&doc.display_name, &doc.document_id)
            ),
            UploadOutcome::Duplicate { display_name } => eprintln!(
                "{} {}",
                palette::warn_mark(),
                locale.duplicate_upload_notice(&display_name)
            ),
        }
    }

    let outcome = repl::submit_with_spinner(&driver, &mut session, prompt).await;
    repl::print_outcome(&outcome, locale);
    match outcome {
        TurnOutcome::RunFailed(_) | TurnOutcome::TimedOut(_) | TurnOutcome::GatewayFailure(_) => {
            bail!("The request did not complete")
        }
        _ => Ok(()),
    }
}

/// Run configuration and connectivity diagnostics
async fn run_doctor(cli: &Cli) {
    use colored::Colorize;

    println!("{}", palette::title("lexcite doctor"));
    println!("{}", palette::muted("=============="));
    println!();

    println!("{}", "Version Information:".bold());
    println!("  lexcite: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("{}", "Configuration:".bold());
    let config_path = cli.config.clone().or_else(config::default_config_path);
    match &config_path {
        Some(path) if path.exists() => {
            println!("  {} config file found at {}", palette::ok_mark(), path.display());
        }
        Some(path) => println!(
            "  {} {} not found (using environment and defaults)",
            palette::warn_mark(),
            path.display()
        ),
        None => println!(
            "  {} no config path available (using environment and defaults)",
            palette::warn_mark()
        ),
    }

    let config = match load_config_from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            println!("  {} config could not be loaded: {err:#}", palette::fail_mark());
            return;
        }
    };
    println!("  {} locale: {}", "·".dimmed(), config.locale().code());
    let policy = config.polling_policy();
    println!(
        "  {} polling every {:.1}s, timeout {:.1}s",
        "·".dimmed(),
        policy.poll_interval.as_secs_f64(),
        policy.run_timeout.as_secs_f64()
    );

    println!();
    println!("{}", "Credentials:".bold());
    let api_key_ok = report_setting("API key", config.api_key());
    let assistant_ok = report_setting("assistant id", config.assistant_id());

    println!();
    println!("{}", "Assistant:".bold());
    if !(api_key_ok && assistant_ok) {
        println!("  {} Skipped (credentials incomplete)", "·".dimmed());
        return;
    }
    let driver = match build_driver(&config) {
        Ok(driver) => driver,
        Err(err) => {
            println!("  {} {err:#}", palette::fail_mark());
            return;
        }
    };
    check_assistant(driver.gateway(), driver.assistant_id()).await;
}

fn report_setting(label: &str, value: Result<String>) -> bool {
    match value {
        Ok(_) => {
            println!("  {} {label} is set", palette::ok_mark());
            true
        }
        Err(err) => {
            println!("  {} {err}", palette::fail_mark());
            false
        }
    }
}

async fn check_assistant(gateway: &dyn AssistantGateway, assistant_id: &str) {
    match gateway.get_assistant(assistant_id).await {
        Ok(assistant) => {
            println!(
                "  {} {} ({})",
                palette::ok_mark(),
                assistant.display_name(),
                assistant.model.as_deref().unwrap_or("unknown model")
            );
            if assistant.has_file_search() {
                println!("  {} file_search tool enabled", palette::ok_mark());
            } else {
                println!(
                    "  {} file_search tool is not enabled; uploaded documents will not be searched",
                    palette::warn_mark()
                );
            }
        }
        Err(err) => {
            let envelope = ErrorEnvelope::from(&err);
            println!(
                "  {} {}",
                palette::fail_mark(),
                palette::by_severity(&envelope.summary(), envelope.severity)
            );
            match envelope.category {
                ErrorCategory::Authentication => {
                    println!("    Invalid API key. Check OPENAI_API_KEY or config.toml");
                }
                ErrorCategory::InvalidInput if err.status() == Some(404) => {
                    println!("    Assistant not found. Check ASSISTANT_ID or config.toml");
                }
                ErrorCategory::Network | ErrorCategory::Timeout => {
                    println!("    Connection failed. Check your network or OPENAI_BASE_URL");
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubGateway;

    #[test]
    fn cli_parses_ask_with_files() {
        let cli = Cli::try_parse_from([
            "lexcite",
            "--profile",
            "work",
            "ask",
            "¿Qué dice el artículo 5?",
            "--file",
            "Ley.pdf",
            "-f",
            "Codigo.pdf",
        ])
        .unwrap();
        assert_eq!(cli.profile.as_deref(), Some("work"));
        match cli.command {
            Some(Commands::Ask { prompt, files }) => {
                assert_eq!(prompt, "¿Qué dice el artículo 5?");
                assert_eq!(files, vec![PathBuf::from("Ley.pdf"), PathBuf::from("Codigo.pdf")]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_defaults_to_chat() {
        let cli = Cli::try_parse_from(["lexcite", "-v"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.verbose);
        Cli::command().debug_assert();
    }

    #[tokio::test]
    async fn assistant_check_handles_missing_tool_and_errors() {
        let gateway = StubGateway::new().with_assistant_tools(&["code_interpreter"]);
        check_assistant(&gateway, "asst_legal").await;
        assert_eq!(gateway.calls_to("get_assistant"), 1);

        let failing = StubGateway::new().failing_on("get_assistant");
        check_assistant(&failing, "asst_legal").await;
        assert_eq!(failing.calls_to("get_assistant"), 1);
    }
}
