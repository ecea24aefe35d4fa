//! Parley CLI: a terminal chat with a bounded, self-summarizing context.

mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::Command;
use parley_api::AnthropicProvider;
use parley_config::{CliOverrides, ParleyConfig};
use parley_core::{Conversation, ConversationConfig};
use parley_session::HistoryStore;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "parley",
    version,
    about = "Chat with Claude without ever outgrowing the context window"
)]
struct Cli {
    /// Send a single prompt and print the response (non-interactive, nothing saved)
    #[arg(short, long)]
    print: Option<String>,

    /// Model to use
    #[arg(long)]
    model: Option<String>,

    /// Maximum tokens in each reply
    #[arg(long)]
    max_tokens: Option<u32>,

    /// API key (overrides ANTHROPIC_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// File the conversation is saved to between runs
    #[arg(long)]
    history_file: Option<PathBuf>,

    /// Keep the conversation in memory only
    #[arg(long, conflicts_with = "history_file")]
    no_history: bool,

    /// Turns kept verbatim when older ones are summarized
    #[arg(long)]
    keep_last: Option<usize>,

    /// Summarize once the conversation holds more than this many turns
    #[arg(long)]
    compress_at: Option<usize>,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let one_shot = cli.print.is_some();
    let config = ParleyConfig::load(CliOverrides {
        api_key: cli.api_key,
        model: cli.model,
        max_tokens: cli.max_tokens,
        keep_last: cli.keep_last,
        compress_at: cli.compress_at,
        history_file: cli.history_file,
        no_history: cli.no_history || one_shot,
    })
    .context("Failed to load configuration")?;

    let provider = AnthropicProvider::new(&config.api_key, &config.api_base_url, &config.model)
        .context("Failed to create API client")?
        .with_retry_config(config.retry_config());

    let mut conversation = create_conversation(provider, &config).await;

    if let Some(prompt) = cli.print {
        // Print mode: single prompt, no history persistence
        let reply = conversation.submit(&prompt).await?;
        println!("{}", reply.text);
        eprintln!("{}", commands::format_stats(conversation.usage()));
        return Ok(());
    }

    repl(&mut conversation, &config).await
}

async fn create_conversation(provider: AnthropicProvider, config: &ParleyConfig) -> Conversation {
    let conversation = Conversation::new(
        Arc::new(provider),
        ConversationConfig {
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            summary_max_tokens: config.summary_max_tokens,
            keep_last: config.keep_last,
            compress_at: config.compress_at,
        },
        config.model_pricing(),
    );
    match &config.history_file {
        Some(path) => conversation.with_store(HistoryStore::new(path)).await,
        None => conversation,
    }
}

async fn repl(conversation: &mut Conversation, config: &ParleyConfig) -> Result<()> {
    let stdin = io::stdin();

    eprintln!(
        "parley v{} (model: {}, keep {} of {} turns)",
        env!("CARGO_PKG_VERSION"),
        config.model,
        config.keep_last,
        config.compress_at
    );
    if conversation.turn_count() > 0 {
        let with_summary = if conversation.summary().is_empty() {
            ""
        } else {
            " and a summary"
        };
        eprintln!(
            "Restored {} turns{with_summary} from the previous session. Type /reset to start a new topic.",
            conversation.turn_count()
        );
    }
    eprintln!("Type your message. /help lists commands, Ctrl+D exits.\n");

    loop {
        eprint!("> ");
        io::stderr().flush()?;

        let mut input = String::new();
        let bytes_read = stdin.lock().read_line(&mut input)?;
        if bytes_read == 0 {
            eprintln!();
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match commands::parse(input) {
            Command::Exit => break,
            Command::Reset => {
                conversation.reset().await;
                eprintln!("Conversation cleared. Starting a new topic.");
            }
            Command::Stats => eprintln!("{}", commands::format_stats(conversation.usage())),
            Command::Summary => {
                if conversation.summary().is_empty() {
                    eprintln!("No summary yet: nothing has been compressed.");
                } else {
                    eprintln!("Summary of earlier turns:\n{}", conversation.summary());
                }
            }
            Command::Help => eprintln!("{}", commands::help_text()),
            Command::Unknown(cmd) => {
                eprintln!("Unknown command: {cmd}. Type /help for available commands.");
            }
            Command::Message(text) => match conversation.submit(text).await {
                Ok(reply) => {
                    println!("{}\n", reply.text);
                    eprintln!(
                        "{}",
                        commands::format_turn_status(conversation.turn_count(), reply.compressed)
                    );
                }
                Err(e) => {
                    eprintln!("\nError: {e}");
                    tracing::debug!("submit failed: {e:?}");
                }
            },
        }
    }

    eprintln!("{}", commands::format_stats(conversation.usage()));
    Ok(())
}
